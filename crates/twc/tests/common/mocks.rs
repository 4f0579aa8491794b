//! In-memory collaborators

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use twc::{Charm, ContainerState, Model, SnapshotContainer};
use twc_secrets::{MemorySecretStore, VaultConfig, VaultConnector, VaultError, VaultKv};

use super::fixtures::{content, CREDENTIALS_SECRET, NONCE};

type VaultData = Arc<Mutex<BTreeMap<String, BTreeMap<String, String>>>>;

/// KV store shared by every client the connector hands out
#[derive(Clone, Default)]
pub struct MockVault {
    data: VaultData,
    connections: Arc<Mutex<Vec<String>>>,
    refuse: bool,
}

impl MockVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose logins always fail
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn with_secret(self, path: &str, key: &str, value: &str) -> Self {
        self.data
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, path: &str, key: &str) -> Option<String> {
        self.data
            .lock()
            .unwrap()
            .get(path)
            .and_then(|entries| entries.get(key).cloned())
    }

    /// Role ids used to log in so far
    pub fn connections(&self) -> Vec<String> {
        self.connections.lock().unwrap().clone()
    }
}

struct MockVaultClient {
    data: VaultData,
}

#[async_trait]
impl VaultKv for MockVaultClient {
    async fn read_secret(&self, path: &str, key: &str) -> Result<String, VaultError> {
        self.data
            .lock()
            .unwrap()
            .get(path)
            .and_then(|entries| entries.get(key).cloned())
            .ok_or_else(|| VaultError::Read(format!("key '{}' not found in path '{}'", key, path)))
    }

    async fn write_secret(&self, path: &str, key: &str, value: &str) -> Result<(), VaultError> {
        self.data
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl VaultConnector for MockVault {
    async fn connect(&self, config: &VaultConfig) -> Result<Box<dyn VaultKv>, VaultError> {
        if self.refuse {
            return Err(VaultError::Auth("permission denied".to_string()));
        }
        self.connections.lock().unwrap().push(config.role_id.clone());
        Ok(Box::new(MockVaultClient {
            data: self.data.clone(),
        }))
    }
}

/// Collaborators for one unit, kept across hooks
pub struct Harness {
    pub store: MemorySecretStore,
    pub container: SnapshotContainer,
    pub vault: MockVault,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemorySecretStore::new())
    }

    pub fn with_store(store: MemorySecretStore) -> Self {
        Self {
            store,
            container: SnapshotContainer::default(),
            vault: MockVault::new(),
        }
    }

    /// Store already holding the unit nonce and the AppRole credentials vault issued for it
    pub fn vault_store() -> MemorySecretStore {
        MemorySecretStore::new()
            .with_labelled_secret("nonce-secret", "nonce", content(&[("nonce", NONCE)]))
            .with_secret(
                CREDENTIALS_SECRET,
                content(&[("role-id", "role-111"), ("role-secret-id", "secret-222")]),
            )
    }

    pub fn with_container(mut self, state: ContainerState) -> Self {
        self.container = SnapshotContainer::new(state);
        self
    }

    pub fn with_vault(mut self, vault: MockVault) -> Self {
        self.vault = vault;
        self
    }

    pub fn charm(&self, model: Model) -> Charm<'_> {
        Charm::new(model, &self.store, &self.container, &self.vault)
    }

    /// Environment of the worker service in the current plan
    pub async fn worker_env(&self) -> BTreeMap<String, String> {
        self.container
            .state()
            .await
            .plan
            .services
            .get("temporal-worker")
            .map(|service| service.environment.clone())
            .unwrap_or_default()
    }

    pub async fn replans(&self) -> u32 {
        self.container.state().await.replans
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
