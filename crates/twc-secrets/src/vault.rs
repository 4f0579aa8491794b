//! HashiCorp Vault KV v2 client authenticated with AppRole

use crate::security::SecureString;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use twc_core::config::dual_prefixed;
use twc_core::literals::{VAULT_APPROLE_MOUNT, VAULT_CERT_PATH};
use vaultrs::client::{Client, VaultClient as RawClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::{auth::approle, kv2};

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("vault relation: failed to get unit_credentials")]
    MissingCredentials,

    #[error("vault relation: {0}")]
    Relation(String),

    #[error("Failed to write vault CA certificate to {path}: {source}")]
    CaCertificate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vault client configuration failed: {0}")]
    Settings(String),

    #[error("Vault authentication failed: {0}")]
    Auth(String),

    #[error("Could not fetch from Vault: {0}")]
    Read(String),

    #[error("Vault write operation failed: {0}")]
    Write(String),
}

/// Connection parameters resolved from the vault relation
#[derive(Debug, Clone, PartialEq)]
pub struct VaultConfig {
    pub address: String,
    pub ca_certificate: String,
    pub role_id: String,
    pub role_secret_id: SecureString,
    pub mount: String,
    pub nonce: String,
    pub cert_path: PathBuf,
}

impl VaultConfig {
    pub fn new(
        address: impl Into<String>,
        ca_certificate: impl Into<String>,
        role_id: impl Into<String>,
        role_secret_id: impl Into<SecureString>,
        mount: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            ca_certificate: ca_certificate.into(),
            role_id: role_id.into(),
            role_secret_id: role_secret_id.into(),
            mount: mount.into(),
            nonce: nonce.into(),
            cert_path: PathBuf::from(VAULT_CERT_PATH),
        }
    }

    pub fn with_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert_path = path.into();
        self
    }

    /// Variables handed to the worker so it can talk to vault itself
    pub fn env(&self) -> BTreeMap<String, String> {
        let cert_path = self.cert_path.display().to_string();
        [
            ("VAULT_ADDRESS", self.address.as_str()),
            ("VAULT_CA_CERTIFICATE_BYTES", self.ca_certificate.as_str()),
            ("VAULT_MOUNT", self.mount.as_str()),
            ("VAULT_ROLE_ID", self.role_id.as_str()),
            ("VAULT_ROLE_SECRET_ID", self.role_secret_id.as_str()),
            ("VAULT_CERT_PATH", cert_path.as_str()),
        ]
        .into_iter()
        .flat_map(|(suffix, value)| dual_prefixed(suffix, value))
        .collect()
    }
}

/// Single-key access to a KV v2 mount
#[async_trait]
pub trait VaultKv: Send + Sync {
    async fn read_secret(&self, path: &str, key: &str) -> Result<String, VaultError>;

    /// Set `key` at `path`, keeping any sibling keys already stored there
    async fn write_secret(&self, path: &str, key: &str, value: &str) -> Result<(), VaultError>;
}

/// Builds authenticated clients from relation data
#[async_trait]
pub trait VaultConnector: Send + Sync {
    async fn connect(&self, config: &VaultConfig) -> Result<Box<dyn VaultKv>, VaultError>;
}

/// Connector producing real [`VaultClient`]s
#[derive(Debug, Clone, Default)]
pub struct AppRoleConnector {
    pub timeout: Option<Duration>,
}

#[async_trait]
impl VaultConnector for AppRoleConnector {
    async fn connect(&self, config: &VaultConfig) -> Result<Box<dyn VaultKv>, VaultError> {
        let client = VaultClient::connect(config, self.timeout).await?;
        Ok(Box::new(client))
    }
}

pub struct VaultClient {
    client: RawClient,
    mount: String,
}

impl VaultClient {
    /// Write the CA certificate, build the client, and log in with AppRole
    pub async fn connect(config: &VaultConfig, timeout: Option<Duration>) -> Result<Self, VaultError> {
        let address = parse_address(&config.address)?;

        let mut settings = VaultClientSettingsBuilder::default();
        settings.address(address.as_str());
        settings.timeout(timeout.or(Some(Duration::from_secs(30))));

        if !config.ca_certificate.is_empty() {
            write_ca_certificate(&config.cert_path, &config.ca_certificate).await?;
            settings.ca_certs(vec![config.cert_path.display().to_string()]);
        }

        let settings = settings
            .build()
            .map_err(|e| VaultError::Settings(e.to_string()))?;
        let mut client = RawClient::new(settings).map_err(|e| VaultError::Settings(e.to_string()))?;

        let auth = approle::login(
            &client,
            VAULT_APPROLE_MOUNT,
            &config.role_id,
            config.role_secret_id.as_str(),
        )
        .await
        .map_err(|e| VaultError::Auth(e.to_string()))?;
        client.set_token(&auth.client_token);

        info!("Authenticated to vault at {}", config.address);

        Ok(Self {
            client,
            mount: config.mount.clone(),
        })
    }

    async fn read_data(&self, path: &str) -> Result<Option<BTreeMap<String, serde_json::Value>>, ClientError> {
        match kv2::read::<BTreeMap<String, serde_json::Value>>(&self.client, &self.mount, path).await {
            Ok(data) => Ok(Some(data)),
            Err(ClientError::APIError { code: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// The settings builder panics on addresses it cannot parse, so check first
fn parse_address(address: &str) -> Result<Url, VaultError> {
    let invalid = |reason: String| {
        VaultError::Settings(format!("invalid vault address '{}': {}", address, reason))
    };
    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

async fn write_ca_certificate(path: &Path, certificate: &str) -> Result<(), VaultError> {
    let wrap = |source| VaultError::CaCertificate {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(wrap)?;
    }
    tokio::fs::write(path, certificate).await.map_err(wrap)
}

#[async_trait]
impl VaultKv for VaultClient {
    async fn read_secret(&self, path: &str, key: &str) -> Result<String, VaultError> {
        let data = self
            .read_data(path)
            .await
            .map_err(|e| VaultError::Read(e.to_string()))?
            .ok_or_else(|| VaultError::Read(format!("no secret at path '{}'", path)))?;

        let value = data
            .get(key)
            .ok_or_else(|| VaultError::Read(format!("key '{}' not found in path '{}'", key, path)))?;

        debug!("Read vault secret {}/{}", self.mount, path);
        Ok(twc_core::value_to_env(value))
    }

    async fn write_secret(&self, path: &str, key: &str, value: &str) -> Result<(), VaultError> {
        let mut data = match self.read_data(path).await {
            Ok(Some(existing)) => existing,
            Ok(None) => {
                info!("Secret {} does not yet exist on path {}", key, path);
                BTreeMap::new()
            }
            Err(e) => return Err(VaultError::Write(e.to_string())),
        };
        data.insert(key.to_string(), serde_json::Value::String(value.to_string()));

        kv2::set(&self.client, &self.mount, path, &data)
            .await
            .map_err(|e| VaultError::Write(e.to_string()))?;

        debug!("Wrote vault secret {}/{}", self.mount, path);
        Ok(())
    }
}
