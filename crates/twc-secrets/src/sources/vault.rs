//! Vault secrets from the `vault` section

use crate::error::SecretError;
use crate::security::SecureString;
use crate::vault::{VaultConfig, VaultConnector, VaultError, VaultKv};
use tracing::{debug, error};

/// Lazily connected vault reader.
///
/// The client is only built when the first vault entry is resolved, so a
/// document without vault entries never touches the relation.
pub struct VaultSource<'a> {
    config: Option<&'a VaultConfig>,
    connector: &'a dyn VaultConnector,
    client: Option<Box<dyn VaultKv>>,
}

impl<'a> VaultSource<'a> {
    /// `config` is `None` while the relation exists but has no credentials yet
    pub fn new(config: Option<&'a VaultConfig>, connector: &'a dyn VaultConnector) -> Self {
        Self {
            config,
            connector,
            client: None,
        }
    }

    async fn client(&mut self) -> Result<&dyn VaultKv, SecretError> {
        if self.client.is_none() {
            let config = self
                .config
                .ok_or(SecretError::VaultInit(VaultError::MissingCredentials))?;
            let client = self.connector.connect(config).await.map_err(|e| {
                error!("Unable to initialize vault client: {}", e);
                SecretError::VaultInit(e)
            })?;
            self.client = Some(client);
        }
        // Populated above
        self.client
            .as_deref()
            .ok_or(SecretError::VaultInit(VaultError::MissingCredentials))
    }

    pub async fn resolve(&mut self, path: &str, key: &str) -> Result<SecureString, SecretError> {
        let client = self.client().await?;
        let value = client
            .read_secret(path, key)
            .await
            .map_err(|source| SecretError::VaultRead {
                key: key.to_string(),
                path: path.to_string(),
                source,
            })?;

        debug!("Resolved key '{}' from vault path {}", key, path);
        Ok(SecureString::new(value))
    }
}
