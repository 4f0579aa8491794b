//! Shared helpers for secret resolution tests

#![allow(dead_code)]

pub mod mock_vault;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use twc_secrets::{SecretContent, VaultConfig, VaultConnector, VaultError, VaultKv};

pub fn content(pairs: &[(&str, &str)]) -> SecretContent {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn vault_config() -> VaultConfig {
    VaultConfig::new(
        "https://vault:8200",
        "",
        "role",
        "role-secret",
        "charm-temporal-worker-k8s",
        "nonce",
    )
}

/// In-memory KV mount counting how often a client was built
#[derive(Clone, Default)]
pub struct FakeVault {
    data: Arc<Mutex<BTreeMap<(String, String), String>>>,
    logins: Arc<Mutex<u32>>,
    refuse: bool,
}

impl FakeVault {
    pub fn with(entries: &[(&str, &str, &str)]) -> Self {
        let vault = Self::default();
        {
            let mut data = vault.data.lock().unwrap();
            for (path, key, value) in entries {
                data.insert((path.to_string(), key.to_string()), value.to_string());
            }
        }
        vault
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn logins(&self) -> u32 {
        *self.logins.lock().unwrap()
    }
}

struct FakeClient {
    data: Arc<Mutex<BTreeMap<(String, String), String>>>,
}

#[async_trait]
impl VaultKv for FakeClient {
    async fn read_secret(&self, path: &str, key: &str) -> Result<String, VaultError> {
        self.data
            .lock()
            .unwrap()
            .get(&(path.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| VaultError::Read(format!("key '{}' not found in path '{}'", key, path)))
    }

    async fn write_secret(&self, path: &str, key: &str, value: &str) -> Result<(), VaultError> {
        self.data
            .lock()
            .unwrap()
            .insert((path.to_string(), key.to_string()), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl VaultConnector for FakeVault {
    async fn connect(&self, _config: &VaultConfig) -> Result<Box<dyn VaultKv>, VaultError> {
        if self.refuse {
            return Err(VaultError::Auth("invalid role or secret ID".to_string()));
        }
        *self.logins.lock().unwrap() += 1;
        Ok(Box::new(FakeClient {
            data: self.data.clone(),
        }))
    }
}
