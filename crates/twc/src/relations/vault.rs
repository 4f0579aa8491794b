//! Vault KV requirer side of the `vault` relation
//!
//! The unit publishes a nonce and its egress subnet; vault answers with its
//! address, CA certificate, a KV mount and a `credentials` map from nonce to
//! the Juju secret holding the unit's AppRole pair.

use crate::relations::RelationWrite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};
use twc_core::literals::{VAULT_MOUNT_SUFFIX, VAULT_NONCE_SECRET_LABEL, VAULT_RELATION};
use twc_secrets::{SecretContent, SecretRef, SecretStore, StoreError, VaultConfig, VaultError};

/// Application data vault publishes on the relation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultRelationData {
    pub vault_url: Option<String>,
    pub ca_certificate: Option<String>,
    pub mount: Option<String>,
    /// JSON object mapping unit nonces to credential secret ids
    pub credentials: Option<String>,
}

impl VaultRelationData {
    /// Credential secret id issued for `nonce`
    pub fn unit_credentials(&self, nonce: &str) -> Option<String> {
        let raw = self.credentials.as_deref()?;
        let credentials: BTreeMap<String, String> = match serde_json::from_str(raw) {
            Ok(credentials) => credentials,
            Err(e) => {
                debug!("Ignoring malformed vault credentials: {}", e);
                return None;
            }
        };
        credentials.get(nonce).cloned()
    }
}

/// The unit's nonce, creating and storing one if none exists
pub async fn ensure_nonce(store: &dyn SecretStore) -> Result<String, StoreError> {
    match store.get_content(&SecretRef::label(VAULT_NONCE_SECRET_LABEL)).await {
        Ok(content) => {
            if let Some(nonce) = content.get("nonce") {
                return Ok(nonce.clone());
            }
        }
        Err(StoreError::NotFound) => {}
        Err(e) => return Err(e),
    }

    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let content = SecretContent::from([("nonce".to_string(), nonce.clone())]);
    store
        .add_unit_secret(VAULT_NONCE_SECRET_LABEL, content)
        .await?;
    info!("Generated vault nonce");
    Ok(nonce)
}

/// Stored nonce, without creating one.
///
/// A nonce not created yet means the relation is still being set up.
pub async fn vault_nonce(store: &dyn SecretStore) -> Result<String, VaultError> {
    let content = store
        .get_content(&SecretRef::label(VAULT_NONCE_SECRET_LABEL))
        .await
        .map_err(|e| match e {
            StoreError::NotFound => VaultError::MissingCredentials,
            e => VaultError::Relation(format!("nonce secret unavailable: {}", e)),
        })?;
    content
        .get("nonce")
        .cloned()
        .ok_or_else(|| VaultError::Relation("nonce secret has no nonce".to_string()))
}

/// Requirer data published when the relation is joined.
///
/// Only the leader may write the application-scoped mount suffix.
pub fn connected_writes(nonce: &str, egress_subnet: &str, leader: bool) -> Vec<RelationWrite> {
    let mut writes = vec![
        RelationWrite::unit(VAULT_RELATION, "egress_subnet", egress_subnet),
        RelationWrite::unit(VAULT_RELATION, "nonce", nonce),
    ];
    if leader {
        writes.push(RelationWrite::app(
            VAULT_RELATION,
            "mount_suffix",
            VAULT_MOUNT_SUFFIX,
        ));
    }
    writes
}

/// Build the client configuration from relation data.
///
/// `Ok(None)` means there is no vault relation at all.
pub async fn get_vault_config(
    relation: Option<&VaultRelationData>,
    store: &dyn SecretStore,
) -> Result<Option<VaultConfig>, VaultError> {
    let Some(relation) = relation else {
        debug!("No vault relation found");
        return Ok(None);
    };

    let nonce = vault_nonce(store).await?;
    let credentials_id = relation
        .unit_credentials(&nonce)
        .ok_or(VaultError::MissingCredentials)?;

    let content = store
        .get_content(&SecretRef::id(credentials_id.as_str()))
        .await
        .map_err(|e| VaultError::Relation(format!("unable to read unit credentials: {}", e)))?;
    let field = |key: &str| {
        content
            .get(key)
            .cloned()
            .ok_or_else(|| VaultError::Relation(format!("unit credentials missing '{}'", key)))
    };
    let role_id = field("role-id")?;
    let role_secret_id = field("role-secret-id")?;

    let required = |value: &Option<String>, name: &str| {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| VaultError::Relation(format!("{} not provided", name)))
    };

    Ok(Some(VaultConfig::new(
        required(&relation.vault_url, "vault_url")?,
        relation.ca_certificate.clone().unwrap_or_default(),
        role_id,
        role_secret_id,
        required(&relation.mount, "mount")?,
        nonce,
    )))
}
