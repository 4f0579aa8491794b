//! Juju user secrets from the `juju` section

use crate::environment::SecretRef;
use crate::error::SecretError;
use crate::security::SecureString;
use crate::store::{SecretContent, SecretStore, StoreError};
use tracing::debug;

pub struct JujuSource<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> JujuSource<'a> {
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Fail early when the controller cannot serve user secrets
    pub fn check_supported(&self) -> Result<(), SecretError> {
        if self.store.supports_user_secrets() {
            Ok(())
        } else {
            Err(SecretError::UserSecretsUnsupported)
        }
    }

    /// Fetch the full content of a secret, requiring it to be non-empty
    pub async fn content(&self, secret: &SecretRef) -> Result<SecretContent, SecretError> {
        let id = secret.to_string();
        let content = self.store.get_content(secret).await.map_err(|e| match e {
            StoreError::NotFound => SecretError::SecretNotFound { id: id.clone() },
            StoreError::PermissionDenied => SecretError::PermissionDenied { id: id.clone() },
            StoreError::Backend(message) => SecretError::SecretBackend {
                id: id.clone(),
                message,
            },
        })?;

        if content.is_empty() {
            return Err(SecretError::EmptySecret { id });
        }
        Ok(content)
    }

    /// Read one key of a secret
    pub async fn resolve(&self, secret: &SecretRef, key: &str) -> Result<SecureString, SecretError> {
        let mut content = self.content(secret).await?;
        let value = content.remove(key).ok_or_else(|| SecretError::MissingKey {
            id: secret.to_string(),
            key: key.to_string(),
        })?;

        debug!("Resolved key '{}' from Juju secret {}", key, secret);
        Ok(SecureString::new(value))
    }
}
