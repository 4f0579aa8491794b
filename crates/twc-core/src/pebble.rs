//! Pebble layer and plan types
//!
//! A [`Layer`] is what the charm submits; a [`Plan`] is what Pebble holds
//! after combining every submitted layer.

use crate::literals::{
    WORKER_CHECK_COMMAND, WORKER_CHECK_NAME, WORKER_COMMAND, WORKLOAD_NAME,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Override {
    #[default]
    Replace,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Startup {
    #[default]
    Enabled,
    Disabled,
}

/// Service entry of a layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub summary: String,
    pub command: String,
    pub startup: Startup,
    #[serde(rename = "override")]
    pub override_: Override,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecCheck {
    pub command: String,
}

/// Health check entry of a layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    #[serde(rename = "override")]
    pub override_: Override,
    pub level: String,
    pub period: String,
    pub exec: ExecCheck,
}

/// Layer submitted to Pebble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Layer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, Check>,
}

impl Layer {
    /// Worker layer running the start script with the given environment
    pub fn worker(environment: BTreeMap<String, String>) -> Self {
        let service = Service {
            summary: "temporal worker".to_string(),
            command: WORKER_COMMAND.to_string(),
            startup: Startup::Enabled,
            override_: Override::Replace,
            environment,
        };

        Self {
            summary: Some("temporal worker layer".to_string()),
            services: BTreeMap::from([(WORKLOAD_NAME.to_string(), service)]),
            checks: BTreeMap::new(),
        }
    }

    /// Attach the status-file liveness check
    pub fn with_health_check(mut self) -> Self {
        self.checks.insert(
            WORKER_CHECK_NAME.to_string(),
            Check {
                override_: Override::Replace,
                level: "alive".to_string(),
                period: "10s".to_string(),
                exec: ExecCheck {
                    command: WORKER_CHECK_COMMAND.to_string(),
                },
            },
        );
        self
    }
}

/// Combined plan as reported by Pebble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub checks: BTreeMap<String, Check>,
}

impl Plan {
    /// Combine a layer into this plan.
    ///
    /// Entries with `override: replace` replace the existing entry; `merge`
    /// entries keep the existing environment and overlay the new one.
    pub fn combine(&mut self, layer: &Layer) {
        for (name, service) in &layer.services {
            match (service.override_, self.services.get_mut(name)) {
                (Override::Merge, Some(existing)) => {
                    existing.summary = service.summary.clone();
                    existing.command = service.command.clone();
                    existing.startup = service.startup;
                    existing
                        .environment
                        .extend(service.environment.clone());
                }
                _ => {
                    self.services.insert(name.clone(), service.clone());
                }
            }
        }
        for (name, check) in &layer.checks {
            self.checks.insert(name.clone(), check.clone());
        }
    }

    /// True when every entry of `layer` is already present, unchanged
    pub fn contains(&self, layer: &Layer) -> bool {
        layer
            .services
            .iter()
            .all(|(name, service)| self.services.get(name) == Some(service))
            && layer
                .checks
                .iter()
                .all(|(name, check)| self.checks.get(name) == Some(check))
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.checks.is_empty()
    }
}
