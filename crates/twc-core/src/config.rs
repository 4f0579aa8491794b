//! Charm configuration loading
//!
//! Juju hands the charm a flat map of typed option values. [`CharmConfig`]
//! layers that map over the defaults declared in [`OPTIONS`], rejects values
//! of the wrong type, and knows how to turn the forwarded options into the
//! worker's environment.

use crate::error::{Error, Result};
use crate::literals::{ENV_PREFIXES, UNFORWARDED_CONFIG};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Type of a charm option, mirroring the types Juju supports in `config.yaml`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Int,
    Float,
    Boolean,
}

impl OptionKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            OptionKind::String => value.is_string(),
            OptionKind::Int => value.is_i64() || value.is_u64(),
            OptionKind::Float => value.is_number(),
            OptionKind::Boolean => value.is_boolean(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            OptionKind::String => "a string",
            OptionKind::Int => "an integer",
            OptionKind::Float => "a number",
            OptionKind::Boolean => "a boolean",
        }
    }
}

/// Declared charm option with its default
#[derive(Debug, Clone, Copy)]
pub struct ConfigOption {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: OptionDefault,
}

#[derive(Debug, Clone, Copy)]
pub enum OptionDefault {
    Str(&'static str),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl OptionDefault {
    fn to_value(self) -> Value {
        match self {
            OptionDefault::Str(s) => Value::String(s.to_string()),
            OptionDefault::Int(i) => Value::from(i),
            OptionDefault::Float(f) => Value::from(f),
            OptionDefault::Bool(b) => Value::Bool(b),
        }
    }
}

const fn opt(name: &'static str, kind: OptionKind, default: OptionDefault) -> ConfigOption {
    ConfigOption {
        name,
        kind,
        default,
    }
}

const fn text(name: &'static str) -> ConfigOption {
    opt(name, OptionKind::String, OptionDefault::Str(""))
}

/// Every option the charm declares
pub const OPTIONS: &[ConfigOption] = &[
    opt("log-level", OptionKind::String, OptionDefault::Str("info")),
    text("host"),
    text("namespace"),
    text("queue"),
    text("sentry-dsn"),
    text("sentry-release"),
    text("sentry-environment"),
    opt("sentry-redact-params", OptionKind::Boolean, OptionDefault::Bool(false)),
    opt("sentry-sample-rate", OptionKind::Float, OptionDefault::Float(1.0)),
    text("encryption-key"),
    text("auth-provider"),
    text("auth-secret-id"),
    text("tls-root-cas"),
    text("candid-url"),
    text("candid-username"),
    text("candid-public-key"),
    text("candid-private-key"),
    text("oidc-auth-type"),
    text("oidc-project-id"),
    text("oidc-private-key-id"),
    text("oidc-private-key"),
    text("oidc-client-email"),
    text("oidc-client-id"),
    text("oidc-auth-uri"),
    text("oidc-token-uri"),
    text("oidc-auth-cert-url"),
    text("oidc-client-cert-url"),
    text("db-name"),
    opt("workload-prometheus-port", OptionKind::Int, OptionDefault::Int(9000)),
    text("environment"),
    text("secrets"),
    opt("health-check", OptionKind::Boolean, OptionDefault::Bool(false)),
];

/// Options whose environment name is not derived mechanically
const ENV_ALIASES: &[(&str, &str)] = &[("workload-prometheus-port", "PROMETHEUS_PORT")];

fn find_option(name: &str) -> Option<&'static ConfigOption> {
    OPTIONS.iter().find(|o| o.name == name)
}

/// Charm configuration with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct CharmConfig {
    values: BTreeMap<String, Value>,
}

impl Default for CharmConfig {
    fn default() -> Self {
        let values = OPTIONS
            .iter()
            .map(|o| (o.name.to_string(), o.default.to_value()))
            .collect();
        Self { values }
    }
}

impl CharmConfig {
    /// Build from the raw option map Juju provides
    pub fn from_map(raw: BTreeMap<String, Value>) -> Result<Self> {
        let mut config = Self::default();
        for (name, value) in raw {
            config.set(&name, value)?;
        }
        Ok(config)
    }

    /// Parse a YAML (or JSON) option map
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: BTreeMap<String, Value> = serde_yaml_ng::from_str(content)?;
        Self::from_map(raw)
    }

    /// Set a single option, type-checked against its declaration.
    ///
    /// A `null` value resets the option to its default. Options the charm
    /// does not declare are ignored.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let Some(option) = find_option(name) else {
            debug!("Ignoring undeclared config option: {}", name);
            return Ok(());
        };

        if value.is_null() {
            self.values
                .insert(name.to_string(), option.default.to_value());
            return Ok(());
        }

        if !option.kind.accepts(&value) {
            return Err(Error::option_type(name, option.kind.describe()));
        }

        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// String option value, empty when unset or not a string
    pub fn get_str(&self, name: &str) -> &str {
        self.values.get(name).and_then(Value::as_str).unwrap_or("")
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Lower-cased log level
    pub fn log_level(&self) -> String {
        self.get_str("log-level").to_lowercase()
    }

    /// True when a string option is unset or only whitespace
    pub fn is_blank(&self, name: &str) -> bool {
        self.get_str(name).trim().is_empty()
    }

    /// Forwarded options rendered as worker environment variables
    pub fn forwarded_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        for (name, value) in &self.values {
            if UNFORWARDED_CONFIG.contains(&name.as_str()) {
                continue;
            }
            env.extend(dual_prefixed(&env_suffix(name), &value_to_env(value)));
        }
        env
    }
}

/// Environment variable suffix for an option or secret key name
pub fn env_suffix(name: &str) -> String {
    ENV_ALIASES
        .iter()
        .find(|(option, _)| *option == name)
        .map(|(_, alias)| alias.to_string())
        .unwrap_or_else(|| name.to_uppercase().replace('-', "_"))
}

/// Publish a value under every worker prefix
pub fn dual_prefixed(suffix: &str, value: &str) -> Vec<(String, String)> {
    ENV_PREFIXES
        .iter()
        .map(|prefix| (format!("{}{}", prefix, suffix), value.to_string()))
        .collect()
}

/// Render a value as an environment variable string.
///
/// Scalars use their plain text form, `null` is empty, and lists or maps
/// are written as compact JSON.
pub fn value_to_env(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
