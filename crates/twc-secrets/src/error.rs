//! Error types for secret resolution
//!
//! Every message here is shown verbatim as the unit's Blocked status, so
//! none of them may carry secret content.

use crate::vault::VaultError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SecretError {
    /// The DSL document does not have the expected shape
    #[error("{0}")]
    InvalidStructure(String),

    #[error("Juju version does not support Juju user secrets")]
    UserSecretsUnsupported,

    #[error("Juju secret `{id}` not found")]
    SecretNotFound { id: String },

    #[error("Access permission not granted to charm for secret `{id}`")]
    PermissionDenied { id: String },

    #[error("Juju secret `{id}` has no content")]
    EmptySecret { id: String },

    #[error("Error parsing secrets env: key `{key}` not found in Juju secret `{id}`")]
    MissingKey { id: String, key: String },

    #[error("Unable to read Juju secret `{id}`: {message}")]
    SecretBackend { id: String, message: String },

    #[error("No vault relation found to fetch secrets from")]
    NoVaultRelation,

    #[error("Unable to initialize vault client. Remove relation and retry.")]
    VaultInit(#[source] VaultError),

    #[error("Unable to read vault secret `{key}` at path `{path}`: {source}")]
    VaultRead {
        key: String,
        path: String,
        #[source]
        source: VaultError,
    },

    #[error("Environment variables cannot use reserved prefix 'TEMPORAL_' or 'TWC_'")]
    ReservedPrefix { name: String },
}

impl SecretError {
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure(message.into())
    }
}
