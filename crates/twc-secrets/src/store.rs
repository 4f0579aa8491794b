//! Juju secret store access
//!
//! [`SecretStore`] is the seam between the operator and Juju's secret
//! backend. [`HookToolSecretStore`] shells out to the `secret-get` and
//! `secret-add` hook tools; [`MemorySecretStore`] serves snapshots and tests.

use crate::environment::SecretRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Secret content, key to value
pub type SecretContent = BTreeMap<String, String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("secret not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("secret backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Whether the controller supports user secrets (Juju 3.3+)
    fn supports_user_secrets(&self) -> bool;

    /// Latest revision of a secret's content
    async fn get_content(&self, secret: &SecretRef) -> Result<SecretContent, StoreError>;

    /// Create a unit-owned secret, returning its id
    async fn add_unit_secret(&self, label: &str, content: SecretContent) -> Result<String, StoreError>;
}

/// Strip the `secret:` scheme and model prefix from a secret URI
pub fn normalize_secret_id(id: &str) -> &str {
    id.rsplit(['/', ':']).next().unwrap_or(id)
}

/// Secret held by [`MemorySecretStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub content: SecretContent,
    #[serde(default = "granted_by_default")]
    pub granted: bool,
}

fn granted_by_default() -> bool {
    true
}

/// In-memory secret store
#[derive(Debug)]
pub struct MemorySecretStore {
    secrets: RwLock<BTreeMap<String, SecretEntry>>,
    user_secrets: bool,
}

impl Default for MemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self {
            secrets: RwLock::new(BTreeMap::new()),
            user_secrets: true,
        }
    }

    /// Report user secrets as unsupported, like a pre-3.3 controller
    pub fn without_user_secrets(mut self) -> Self {
        self.user_secrets = false;
        self
    }

    /// Add a secret the charm has been granted
    pub fn with_secret(self, id: &str, content: SecretContent) -> Self {
        self.insert(id, None, content, true)
    }

    /// Add a secret the charm has NOT been granted
    pub fn with_ungranted_secret(self, id: &str, content: SecretContent) -> Self {
        self.insert(id, None, content, false)
    }

    /// Add a labelled secret owned by the application
    pub fn with_labelled_secret(self, id: &str, label: &str, content: SecretContent) -> Self {
        self.insert(id, Some(label.to_string()), content, true)
    }

    /// Load previously exported entries
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = SecretEntry>) -> Self {
        let secrets = self.secrets.get_mut();
        for mut entry in entries {
            entry.id = normalize_secret_id(&entry.id).to_string();
            secrets.insert(entry.id.clone(), entry);
        }
        self
    }

    fn insert(self, id: &str, label: Option<String>, content: SecretContent, granted: bool) -> Self {
        self.with_entries([SecretEntry {
            id: id.to_string(),
            label,
            content,
            granted,
        }])
    }

    /// Every secret currently held, ordered by id
    pub async fn entries(&self) -> Vec<SecretEntry> {
        self.secrets.read().await.values().cloned().collect()
    }

    /// Labelled secrets currently held, label to id
    pub async fn labels(&self) -> BTreeMap<String, String> {
        self.secrets
            .read()
            .await
            .iter()
            .filter_map(|(id, s)| s.label.clone().map(|label| (label, id.clone())))
            .collect()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn supports_user_secrets(&self) -> bool {
        self.user_secrets
    }

    async fn get_content(&self, secret: &SecretRef) -> Result<SecretContent, StoreError> {
        let secrets = self.secrets.read().await;
        let stored = match secret {
            SecretRef::Id(id) => secrets.get(normalize_secret_id(id)),
            SecretRef::Label(label) => secrets
                .values()
                .find(|s| s.label.as_deref() == Some(label.as_str())),
        }
        .ok_or(StoreError::NotFound)?;

        if !stored.granted {
            return Err(StoreError::PermissionDenied);
        }
        Ok(stored.content.clone())
    }

    async fn add_unit_secret(&self, label: &str, content: SecretContent) -> Result<String, StoreError> {
        let mut secrets = self.secrets.write().await;
        let id = Uuid::new_v4().simple().to_string();
        secrets.insert(
            id.clone(),
            SecretEntry {
                id: id.clone(),
                label: Some(label.to_string()),
                content,
                granted: true,
            },
        );
        Ok(id)
    }
}

/// Secret store backed by the Juju hook tools
#[derive(Debug, Clone)]
pub struct HookToolSecretStore {
    juju_version: Option<String>,
}

impl HookToolSecretStore {
    pub fn new(juju_version: Option<String>) -> Self {
        Self { juju_version }
    }

    /// Read the controller version from `JUJU_VERSION`
    pub fn from_env() -> Self {
        Self::new(std::env::var("JUJU_VERSION").ok())
    }

    async fn run(tool: &str, args: &[String]) -> Result<String, StoreError> {
        debug!("Running hook tool: {} {}", tool, loggable_args(args));

        let output = Command::new(tool)
            .args(args)
            .output()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to run {}: {}", tool, e)))?;

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if stderr.contains("not found") {
            Err(StoreError::NotFound)
        } else if stderr.contains("permission denied") || stderr.contains("not authorized") {
            Err(StoreError::PermissionDenied)
        } else {
            Err(StoreError::Backend(format!("{} exited with {}", tool, output.status)))
        }
    }
}

/// Hook tool flags for logging; `key=value` secret content is left out
fn loggable_args(args: &[String]) -> String {
    args.iter()
        .filter(|arg| !arg.contains('='))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Juju user secrets landed in 3.3
pub fn version_supports_user_secrets(version: &str) -> bool {
    let mut parts = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    (major, minor) >= (3, 3)
}

#[async_trait]
impl SecretStore for HookToolSecretStore {
    fn supports_user_secrets(&self) -> bool {
        self.juju_version
            .as_deref()
            .map(version_supports_user_secrets)
            .unwrap_or(false)
    }

    async fn get_content(&self, secret: &SecretRef) -> Result<SecretContent, StoreError> {
        let mut args = match secret {
            SecretRef::Id(id) => vec![id.clone()],
            SecretRef::Label(label) => vec!["--label".to_string(), label.clone()],
        };
        args.extend(["--refresh".to_string(), "--format".to_string(), "json".to_string()]);

        let stdout = Self::run("secret-get", &args).await?;
        serde_json::from_str(&stdout)
            .map_err(|e| StoreError::Backend(format!("unexpected secret-get output: {}", e)))
    }

    async fn add_unit_secret(&self, label: &str, content: SecretContent) -> Result<String, StoreError> {
        let mut args = vec![
            "--owner".to_string(),
            "unit".to_string(),
            "--label".to_string(),
            label.to_string(),
        ];
        args.extend(content.iter().map(|(k, v)| format!("{}={}", k, v)));

        Self::run("secret-add", &args).await
    }
}
