//! Secret resolution for the Temporal worker operator
//!
//! This crate turns the charm's declarative `environment` option into a flat
//! map of worker environment variables:
//! - **Parsing**: the `env` / `juju` / `vault` DSL, validated before any I/O
//! - **Sources**: static values, Juju user secrets, HashiCorp Vault KV v2
//! - **Security**: values held in zeroizing strings, never logged

pub mod environment;
pub mod error;
pub mod resolver;
pub mod security;
pub mod sources;
pub mod store;
pub mod vault;

pub use environment::{parse_environment, parse_legacy_secrets, EnvironmentSpec, SecretRef, SecretSource};
pub use error::SecretError;
pub use resolver::{EnvironmentResolver, ResolvedEnvironment, VaultAccess};
pub use security::SecureString;
pub use store::{HookToolSecretStore, MemorySecretStore, SecretContent, SecretEntry, SecretStore, StoreError};
pub use vault::{AppRoleConnector, VaultClient, VaultConfig, VaultConnector, VaultError, VaultKv};
