//! Opaque per-service credentials carried by a task.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Variables for one service, keyed by environment variable name.
pub type ServiceCredentials = BTreeMap<String, String>;

/// Credentials attached to a task, keyed by service name.
///
/// The engine validates the shape (`{"service": {"VAR": "value"}}`) but never
/// interprets the contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(BTreeMap<String, ServiceCredentials>);

impl Credentials {
    /// Returns an empty credential set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Parses and validates a JSON credentials payload.
    ///
    /// `null` and `{}` both produce an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidCredentials`] when the payload is not
    /// an object of objects of strings, or when a service, variable name or
    /// value is empty.
    pub fn from_json(value: Value) -> Result<Self, TaskDomainError> {
        if value.is_null() {
            return Ok(Self::empty());
        }
        let services: BTreeMap<String, Option<ServiceCredentials>> =
            serde_json::from_value(value)
                .map_err(|err| TaskDomainError::InvalidCredentials(err.to_string()))?;

        let mut validated = BTreeMap::new();
        for (service, variables) in services {
            if service.is_empty() {
                return Err(invalid("service name cannot be empty"));
            }
            let vars = variables.unwrap_or_default();
            if vars.is_empty() {
                return Err(invalid("service credentials cannot be empty"));
            }
            for (name, secret) in &vars {
                if name.is_empty() {
                    return Err(invalid("environment variable name cannot be empty"));
                }
                if secret.is_empty() {
                    return Err(invalid("environment variable value cannot be empty"));
                }
            }
            validated.insert(service, vars);
        }
        Ok(Self(validated))
    }

    /// Returns the JSON representation used for persistence.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(service, vars)| {
                    let entries = vars
                        .iter()
                        .map(|(name, secret)| (name.clone(), Value::String(secret.clone())))
                        .collect();
                    (service.clone(), Value::Object(entries))
                })
                .collect(),
        )
    }

    /// Returns the variables for a service, if present.
    #[must_use]
    pub fn service(&self, name: &str) -> Option<&ServiceCredentials> {
        self.0.get(name)
    }

    /// Returns `true` when no service is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn invalid(reason: &str) -> TaskDomainError {
    TaskDomainError::InvalidCredentials(reason.to_owned())
}
