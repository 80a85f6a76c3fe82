//! Reporting periods and per-creator task statistics.

use super::TaskDomainError;
use chrono::{DateTime, Days, Duration, Months, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reporting window for [`TaskStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatsPeriod {
    /// Since midnight UTC today.
    Today,
    /// The previous UTC calendar day.
    Yesterday,
    /// The last seven days.
    Week,
    /// The last calendar month.
    Month,
    /// The last calendar year.
    Year,
    /// No lower bound.
    AllTime,
}

/// Half-open creation-time window `[from, before)`; `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub before: Option<DateTime<Utc>>,
}

impl StatsPeriod {
    /// Returns the canonical name accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::AllTime => "all-time",
        }
    }

    /// Computes the creation-time window for this period relative to `now`.
    #[must_use]
    pub fn window(self, now: DateTime<Utc>) -> StatsWindow {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        match self {
            Self::Today => StatsWindow {
                from: Some(midnight),
                before: None,
            },
            Self::Yesterday => StatsWindow {
                from: midnight.checked_sub_days(Days::new(1)),
                before: Some(midnight),
            },
            Self::Week => StatsWindow {
                from: now.checked_sub_signed(Duration::days(7)),
                before: None,
            },
            Self::Month => StatsWindow {
                from: now.checked_sub_months(Months::new(1)),
                before: None,
            },
            Self::Year => StatsWindow {
                from: now.checked_sub_months(Months::new(12)),
                before: None,
            },
            Self::AllTime => StatsWindow {
                from: None,
                before: None,
            },
        }
    }
}

impl FromStr for StatsPeriod {
    type Err = TaskDomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "yesterday" => Ok(Self::Yesterday),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "all-time" => Ok(Self::AllTime),
            _ => Err(TaskDomainError::InvalidStatsPeriod(value.to_owned())),
        }
    }
}

impl fmt::Display for StatsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters describing the tasks created by one actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    /// Tasks currently `submitted`.
    pub pending: u64,
    /// Tasks currently `working`.
    pub in_progress: u64,
    /// Tasks created within the period.
    pub new_tasks: u64,
    /// Tasks created within the period that are now `failed`.
    pub failed_tasks: u64,
}
