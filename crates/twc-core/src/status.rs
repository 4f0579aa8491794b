//! Unit status reported back to Juju

use serde::{Deserialize, Serialize};
use std::fmt;

/// Workload status of the unit, each carrying a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "message", rename_all = "lowercase")]
pub enum UnitStatus {
    Waiting(String),
    Blocked(String),
    Maintenance(String),
    Active(String),
}

impl UnitStatus {
    pub fn waiting(message: impl Into<String>) -> Self {
        Self::Waiting(message.into())
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self::Blocked(message.into())
    }

    pub fn maintenance(message: impl Into<String>) -> Self {
        Self::Maintenance(message.into())
    }

    pub fn active(message: impl Into<String>) -> Self {
        Self::Active(message.into())
    }

    /// Status name as understood by `status-set`
    pub fn name(&self) -> &'static str {
        match self {
            UnitStatus::Waiting(_) => "waiting",
            UnitStatus::Blocked(_) => "blocked",
            UnitStatus::Maintenance(_) => "maintenance",
            UnitStatus::Active(_) => "active",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            UnitStatus::Waiting(m)
            | UnitStatus::Blocked(m)
            | UnitStatus::Maintenance(m)
            | UnitStatus::Active(m) => m,
        }
    }
}

impl Default for UnitStatus {
    fn default() -> Self {
        UnitStatus::Waiting("configuring".to_string())
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message().is_empty() {
            write!(f, "{}", self.name())
        } else {
            write!(f, "{}: {}", self.name(), self.message())
        }
    }
}
