//! Parser for the `environment` config option
//!
//! ```yaml
//! env:
//!   - name: GREETING
//!     value: hello
//! juju:
//!   - secret-id: cs0kv9vmp25c77ukq3dg
//!     name: DB_PASSWORD
//!     key: password
//! vault:
//!   - path: app
//!     name: API_TOKEN
//!     key: token
//! ```
//!
//! Each section is validated as a whole before anything is resolved. The
//! legacy `secrets` option is accepted by [`parse_legacy_secrets`] and
//! translated into the same [`EnvironmentSpec`].

use crate::error::SecretError;
use serde_yaml_ng::{Mapping, Value};
use std::fmt;
use tracing::warn;

const ENV_SHAPE: &str =
    "Invalid environment structure: 'env' should be a list of dictionaries with 'name' and 'value'";
const JUJU_SHAPE: &str = "Invalid environment structure: 'juju' should be a list of dictionaries with 'secret-id', 'name', and 'key'";
const VAULT_SHAPE: &str = "Invalid environment structure: 'vault' should be a list of dictionaries with 'path', 'name', and 'key'";

const LEGACY_ENV_SHAPE: &str =
    "Invalid secrets structure: 'env' should be a list of single-key dictionaries";
const LEGACY_JUJU_SHAPE: &str = "Invalid secrets structure: 'juju' should be a list of dictionaries with 'key' and one of 'secret-id' or 'secret-name'";
const LEGACY_VAULT_SHAPE: &str =
    "Invalid secrets structure: 'vault' should be a list of dictionaries with 'path' and 'key'";

/// Reference to a Juju secret
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecretRef {
    Id(String),
    Label(String),
}

impl SecretRef {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }
}

impl fmt::Display for SecretRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretRef::Id(id) => write!(f, "{}", id),
            SecretRef::Label(label) => write!(f, "{}", label),
        }
    }
}

/// One entry of the environment DSL
#[derive(Debug, Clone, PartialEq)]
pub enum SecretSource {
    /// Static value, stored as JSON so structured values survive
    Env {
        name: String,
        value: serde_json::Value,
    },
    Juju {
        secret: SecretRef,
        name: String,
        key: String,
    },
    Vault {
        path: String,
        name: String,
        key: String,
    },
}

impl SecretSource {
    /// Environment variable this entry populates
    pub fn name(&self) -> &str {
        match self {
            SecretSource::Env { name, .. }
            | SecretSource::Juju { name, .. }
            | SecretSource::Vault { name, .. } => name,
        }
    }
}

/// Parsed environment document, entries in section then document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvironmentSpec {
    pub sources: Vec<SecretSource>,
}

impl EnvironmentSpec {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn has_juju(&self) -> bool {
        self.sources
            .iter()
            .any(|s| matches!(s, SecretSource::Juju { .. }))
    }

    pub fn has_vault(&self) -> bool {
        self.sources
            .iter()
            .any(|s| matches!(s, SecretSource::Vault { .. }))
    }
}

/// Parse the `environment` option
pub fn parse_environment(content: &str) -> Result<EnvironmentSpec, SecretError> {
    let Some(root) = load_root(content, "environment")? else {
        return Ok(EnvironmentSpec::default());
    };

    let env = section(&root, "env", ENV_SHAPE, |item| has_exact_keys(item, &["name", "value"]))?;
    let juju = section(&root, "juju", JUJU_SHAPE, |item| {
        has_exact_keys(item, &["secret-id", "name", "key"])
    })?;
    let vault = section(&root, "vault", VAULT_SHAPE, |item| {
        has_exact_keys(item, &["path", "name", "key"])
    })?;

    let mut sources = Vec::with_capacity(env.len() + juju.len() + vault.len());

    for item in env {
        sources.push(SecretSource::Env {
            name: text_field(item, "name", ENV_SHAPE)?,
            value: to_json(field(item, "value"))?,
        });
    }
    for item in juju {
        sources.push(SecretSource::Juju {
            secret: SecretRef::Id(text_field(item, "secret-id", JUJU_SHAPE)?),
            name: text_field(item, "name", JUJU_SHAPE)?,
            key: text_field(item, "key", JUJU_SHAPE)?,
        });
    }
    for item in vault {
        sources.push(SecretSource::Vault {
            path: text_field(item, "path", VAULT_SHAPE)?,
            name: text_field(item, "name", VAULT_SHAPE)?,
            key: text_field(item, "key", VAULT_SHAPE)?,
        });
    }

    Ok(EnvironmentSpec { sources })
}

/// Parse the deprecated `secrets` option into the canonical form.
///
/// Legacy juju and vault entries have no `name`; the secret key doubles as
/// the variable name.
pub fn parse_legacy_secrets(content: &str) -> Result<EnvironmentSpec, SecretError> {
    let Some(document) = load_root(content, "secrets")? else {
        return Ok(EnvironmentSpec::default());
    };
    warn!("The `secrets` config option is deprecated, use `environment` instead");

    let root = match document.get("secrets") {
        Some(Value::Mapping(m)) => m.clone(),
        Some(_) => {
            return Err(SecretError::invalid_structure(
                "Invalid secrets structure: 'secrets' should be a dictionary",
            ))
        }
        None => {
            return Err(SecretError::invalid_structure(
                "Invalid secrets structure: 'secrets' key not found",
            ))
        }
    };

    let env = section(&root, "env", LEGACY_ENV_SHAPE, |item| item.len() == 1)?;
    let juju = section(&root, "juju", LEGACY_JUJU_SHAPE, |item| {
        has_exact_keys(item, &["secret-id", "key"]) || has_exact_keys(item, &["secret-name", "key"])
    })?;
    let vault = section(&root, "vault", LEGACY_VAULT_SHAPE, |item| {
        has_exact_keys(item, &["path", "key"])
    })?;

    let mut sources = Vec::with_capacity(env.len() + juju.len() + vault.len());

    for item in env {
        // Shape check guarantees exactly one pair
        for (name, value) in item {
            sources.push(SecretSource::Env {
                name: scalar_text(name)
                    .ok_or_else(|| SecretError::invalid_structure(LEGACY_ENV_SHAPE))?,
                value: to_json(Some(value))?,
            });
        }
    }
    for item in juju {
        let secret = match field(item, "secret-id") {
            Some(_) => SecretRef::Id(text_field(item, "secret-id", LEGACY_JUJU_SHAPE)?),
            None => SecretRef::Label(text_field(item, "secret-name", LEGACY_JUJU_SHAPE)?),
        };
        let key = text_field(item, "key", LEGACY_JUJU_SHAPE)?;
        sources.push(SecretSource::Juju {
            secret,
            name: key.clone(),
            key,
        });
    }
    for item in vault {
        let key = text_field(item, "key", LEGACY_VAULT_SHAPE)?;
        sources.push(SecretSource::Vault {
            path: text_field(item, "path", LEGACY_VAULT_SHAPE)?,
            name: key.clone(),
            key,
        });
    }

    Ok(EnvironmentSpec { sources })
}

/// Load the top-level mapping; `None` for an empty document
fn load_root(content: &str, option: &str) -> Result<Option<Mapping>, SecretError> {
    let document: Value = serde_yaml_ng::from_str(content).map_err(|e| {
        SecretError::invalid_structure(format!("Invalid {} structure: {}", option, e))
    })?;

    match document {
        Value::Null => Ok(None),
        Value::Mapping(m) => Ok(Some(m)),
        _ => Err(SecretError::invalid_structure(format!(
            "Invalid {} structure: expected a dictionary at the top level",
            option
        ))),
    }
}

/// Fetch a list section, checking every item against `shape_ok`
fn section<'a>(
    root: &'a Mapping,
    key: &str,
    message: &str,
    shape_ok: impl Fn(&Mapping) -> bool,
) -> Result<Vec<&'a Mapping>, SecretError> {
    let items = match root.get(key) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Sequence(items)) => items,
        Some(_) => return Err(SecretError::invalid_structure(message)),
    };

    items
        .iter()
        .map(|item| match item {
            Value::Mapping(m) if shape_ok(m) => Ok(m),
            _ => Err(SecretError::invalid_structure(message)),
        })
        .collect()
}

fn has_exact_keys(item: &Mapping, keys: &[&str]) -> bool {
    item.len() == keys.len() && keys.iter().all(|k| item.contains_key(*k))
}

fn field<'a>(item: &'a Mapping, key: &str) -> Option<&'a Value> {
    item.get(key)
}

fn text_field(item: &Mapping, key: &str, message: &str) -> Result<String, SecretError> {
    field(item, key)
        .and_then(scalar_text)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SecretError::invalid_structure(message))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn to_json(value: Option<&Value>) -> Result<serde_json::Value, SecretError> {
    match value {
        None => Ok(serde_json::Value::Null),
        Some(v) => serde_json::to_value(v).map_err(|e| {
            SecretError::invalid_structure(format!(
                "Invalid environment structure: value cannot be represented as JSON: {}",
                e
            ))
        }),
    }
}
