//! Hook snapshots and the model the reconciler works on
//!
//! A [`Snapshot`] is the YAML document the CLI reads before a hook and
//! writes back after it: config, relation data, peer state, secrets and
//! the container's plan. [`Model`] is the part the reconciler reads.

use crate::charm::EventOutcome;
use crate::container::ContainerState;
use crate::relations::database::DatabaseRelationData;
use crate::relations::vault::VaultRelationData;
use crate::relations::RelationWrite;
use crate::state::PeerState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use twc_core::literals::PROXY_ENV_VARS;
use twc_core::{CharmConfig, Result, UnitStatus};
use twc_secrets::store::version_supports_user_secrets;
use twc_secrets::{MemorySecretStore, SecretEntry};

/// Everything the reconciler knows about the unit and its relations
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub app_name: String,
    pub unit_name: String,
    pub config: CharmConfig,
    pub peer: PeerState,
    pub vault: Option<VaultRelationData>,
    pub database: Option<DatabaseRelationData>,
    /// Subnet of the vault binding
    pub egress_subnet: String,
    /// Contents of the attached env-file resource
    pub env_file: Option<String>,
    /// Path of the attached workflows-file resource
    pub workflows_file: Option<PathBuf>,
    /// Process environment visible to the charm
    pub process_env: BTreeMap<String, String>,
}

impl Model {
    pub fn is_leader(&self) -> bool {
        self.peer.is_leader()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Snapshot {
    pub app_name: String,
    pub unit_name: String,
    pub leader: bool,
    pub juju_version: Option<String>,
    pub config: BTreeMap<String, serde_json::Value>,
    pub peer: Option<BTreeMap<String, String>>,
    pub vault: Option<VaultRelationData>,
    pub database: Option<DatabaseRelationData>,
    pub egress_subnet: String,
    pub env_file: Option<String>,
    pub workflows_file: Option<PathBuf>,
    pub process_env: BTreeMap<String, String>,
    pub secrets: Vec<SecretEntry>,
    pub container: ContainerState,
    pub status: UnitStatus,
    pub relation_writes: Vec<RelationWrite>,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_yaml_ng::to_string(self)?)?;
        debug!("Snapshot written to {}", path.display());
        Ok(())
    }

    /// Fill proxy variables the snapshot does not pin from the real environment
    pub fn inherit_proxy_env(&mut self) {
        for (name, _) in PROXY_ENV_VARS {
            if self.process_env.contains_key(*name) {
                continue;
            }
            if let Ok(value) = std::env::var(name) {
                self.process_env.insert(name.to_string(), value);
            }
        }
    }

    pub fn model(&self) -> Result<Model> {
        Ok(Model {
            app_name: self.app_name.clone(),
            unit_name: self.unit_name.clone(),
            config: CharmConfig::from_map(self.config.clone())?,
            peer: PeerState::new(self.peer.clone(), self.leader),
            vault: self.vault.clone(),
            database: self.database.clone(),
            egress_subnet: self.egress_subnet.clone(),
            env_file: self.env_file.clone(),
            workflows_file: self.workflows_file.clone(),
            process_env: self.process_env.clone(),
        })
    }

    /// In-memory secret store holding the snapshot's secrets
    pub fn secret_store(&self) -> MemorySecretStore {
        let store = MemorySecretStore::new().with_entries(self.secrets.clone());
        match self.juju_version.as_deref() {
            Some(version) if !version_supports_user_secrets(version) => store.without_user_secrets(),
            _ => store,
        }
    }

    /// Fold the results of a hook back in
    pub fn record(
        &mut self,
        model: &Model,
        container: ContainerState,
        secrets: Vec<SecretEntry>,
        outcome: &EventOutcome,
    ) {
        if model.peer.is_dirty() {
            self.peer = model.peer.data().cloned();
        }
        self.container = container;
        self.secrets = secrets;
        self.status = outcome.status.clone();
        self.relation_writes
            .extend(outcome.relation_writes.iter().cloned());
    }
}
