//! Environment resolution orchestration
//!
//! Dispatches every parsed [`SecretSource`] to its resolver and merges the
//! results. Later entries with the same name overwrite earlier ones.

use crate::environment::{EnvironmentSpec, SecretSource};
use crate::error::SecretError;
use crate::security::SecureString;
use crate::sources::{EnvSource, JujuSource, VaultSource};
use crate::store::SecretStore;
use crate::vault::{VaultConfig, VaultConnector};
use std::collections::BTreeMap;
use tracing::debug;
use twc_core::literals::ENV_PREFIXES;

/// How the resolver may reach vault
#[derive(Clone, Copy)]
pub enum VaultAccess<'a> {
    /// No vault relation exists
    Unrelated,
    /// A relation exists; `config` is `None` until credentials are issued
    Related {
        config: Option<&'a VaultConfig>,
        connector: &'a dyn VaultConnector,
    },
}

/// Flat, ordered result of resolving an [`EnvironmentSpec`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    vars: BTreeMap<String, SecureString>,
}

impl ResolvedEnvironment {
    pub fn insert(&mut self, name: impl Into<String>, value: SecureString) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(SecureString::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Hand the values over as plain strings for the Pebble layer
    pub fn into_env(self) -> BTreeMap<String, String> {
        self.vars
            .into_iter()
            .map(|(name, value)| (name, value.into_string()))
            .collect()
    }
}

pub struct EnvironmentResolver<'a> {
    store: &'a dyn SecretStore,
    vault: VaultAccess<'a>,
}

impl<'a> EnvironmentResolver<'a> {
    pub fn new(store: &'a dyn SecretStore, vault: VaultAccess<'a>) -> Self {
        Self { store, vault }
    }

    /// Resolve every entry of `spec`.
    ///
    /// Names and preconditions are checked before any secret is fetched.
    pub async fn resolve(&self, spec: &EnvironmentSpec) -> Result<ResolvedEnvironment, SecretError> {
        check_reserved_names(spec)?;

        let juju = JujuSource::new(self.store);
        if spec.has_juju() {
            juju.check_supported()?;
        }

        let mut vault = match self.vault {
            VaultAccess::Unrelated if spec.has_vault() => return Err(SecretError::NoVaultRelation),
            VaultAccess::Unrelated => None,
            VaultAccess::Related { config, connector } => Some(VaultSource::new(config, connector)),
        };

        let mut resolved = ResolvedEnvironment::default();
        for source in &spec.sources {
            let value = match source {
                SecretSource::Env { value, .. } => EnvSource::resolve(value),
                SecretSource::Juju { secret, key, .. } => juju.resolve(secret, key).await?,
                SecretSource::Vault { path, key, .. } => match vault.as_mut() {
                    Some(vault) => vault.resolve(path, key).await?,
                    None => return Err(SecretError::NoVaultRelation),
                },
            };
            resolved.insert(source.name(), value);
        }

        debug!("Resolved {} environment variables", resolved.len());
        Ok(resolved)
    }
}

fn check_reserved_names(spec: &EnvironmentSpec) -> Result<(), SecretError> {
    match spec
        .sources
        .iter()
        .map(SecretSource::name)
        .find(|name| ENV_PREFIXES.iter().any(|prefix| name.starts_with(prefix)))
    {
        Some(name) => Err(SecretError::ReservedPrefix {
            name: name.to_string(),
        }),
        None => Ok(()),
    }
}
