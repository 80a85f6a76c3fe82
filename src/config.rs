//! Engine configuration loaded from environment-style settings.

use chrono::Months;
use std::time::Duration;
use thiserror::Error;

/// Setting holding the retention sweep interval.
pub const ENV_SWEEP_INTERVAL: &str = "SWEEP_INTERVAL";
/// Setting holding the activity index resync interval.
pub const ENV_INDEX_RESYNC_INTERVAL: &str = "INDEX_RESYNC_INTERVAL";
/// Setting holding the default retention in months.
pub const ENV_RETENTION_MONTHS: &str = "RETENTION_MONTHS";
/// Setting holding the per-transaction statement and lock timeout.
pub const ENV_TRANSACTION_TIMEOUT: &str = "TRANSACTION_TIMEOUT";

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_RETENTION_MONTHS: u32 = 3;
const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced while parsing configuration values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// The value is not a duration such as `90s`, `10m` or `1h30m`.
    #[error("{key} must be a duration such as 90s, 10m or 1h30m, got '{value}'")]
    InvalidDuration {
        /// Setting name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parser failure.
        #[source]
        source: humantime::DurationError,
    },
    /// The value must be strictly positive.
    #[error("{key} must be positive, got '{value}'")]
    NotPositive {
        /// Setting name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// The value is not a whole number.
    #[error("{key} must be a whole number, got '{value}'")]
    NotANumber {
        /// Setting name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Runtime settings for the task engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    sweep_interval: Duration,
    resync_interval: Duration,
    retention: Months,
    transaction_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            resync_interval: DEFAULT_RESYNC_INTERVAL,
            retention: Months::new(DEFAULT_RETENTION_MONTHS),
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`.
    ///
    /// Missing settings take their default. Invalid settings are logged at
    /// `warn` and also take their default.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            sweep_interval: setting(&lookup, ENV_SWEEP_INTERVAL, defaults.sweep_interval, |raw| {
                parse_duration(ENV_SWEEP_INTERVAL, raw)
            }),
            resync_interval: setting(
                &lookup,
                ENV_INDEX_RESYNC_INTERVAL,
                defaults.resync_interval,
                |raw| parse_duration(ENV_INDEX_RESYNC_INTERVAL, raw),
            ),
            retention: setting(&lookup, ENV_RETENTION_MONTHS, defaults.retention, |raw| {
                positive_months(ENV_RETENTION_MONTHS, raw)
            }),
            transaction_timeout: setting(
                &lookup,
                ENV_TRANSACTION_TIMEOUT,
                defaults.transaction_timeout,
                |raw| parse_duration(ENV_TRANSACTION_TIMEOUT, raw),
            ),
        }
    }

    /// Sets the retention sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the activity index resync interval.
    #[must_use]
    pub const fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }

    /// Sets the default task retention.
    #[must_use]
    pub const fn with_retention(mut self, retention: Months) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the per-transaction timeout.
    #[must_use]
    pub const fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Returns the retention sweep interval.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Returns the activity index resync interval.
    #[must_use]
    pub const fn resync_interval(&self) -> Duration {
        self.resync_interval
    }

    /// Returns the default task retention.
    #[must_use]
    pub const fn retention(&self) -> Months {
        self.retention
    }

    /// Returns the per-transaction timeout.
    #[must_use]
    pub const fn transaction_timeout(&self) -> Duration {
        self.transaction_timeout
    }
}

fn setting<T, F, P>(lookup: &F, key: &'static str, default: T, parse: P) -> T
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Result<T, ConfigError>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    parse(&raw).unwrap_or_else(|err| {
        tracing::warn!(key, value = %raw, error = %err, "invalid setting, using default");
        default
    })
}

fn positive_months(key: &'static str, raw: &str) -> Result<Months, ConfigError> {
    let months = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::NotANumber {
            key,
            value: raw.to_owned(),
        })?;
    if months == 0 {
        return Err(ConfigError::NotPositive {
            key,
            value: raw.to_owned(),
        });
    }
    Ok(Months::new(months))
}

/// Parses the positive duration held by setting `key`, such as `500ms`,
/// `90s`, `10m`, `1h30m` or `2d`.
///
/// A bare number is read as seconds.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDuration`] for malformed input,
/// [`ConfigError::NotANumber`] for a bare number that overflows and
/// [`ConfigError::NotPositive`] for a zero duration.
pub fn parse_duration(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let input = raw.trim();
    let duration = if !input.is_empty() && input.bytes().all(|byte| byte.is_ascii_digit()) {
        input
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::NotANumber {
                key,
                value: raw.to_owned(),
            })?
    } else {
        humantime::parse_duration(input).map_err(|source| ConfigError::InvalidDuration {
            key,
            value: raw.to_owned(),
            source,
        })?
    };
    if duration.is_zero() {
        return Err(ConfigError::NotPositive {
            key,
            value: raw.to_owned(),
        });
    }
    Ok(duration)
}
