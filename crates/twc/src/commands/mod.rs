//! Command implementations

pub mod action;
pub mod check_status;
pub mod render;
pub mod run;

use crate::cli::SessionArgs;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use twc::{Charm, EventOutcome, Model, Snapshot, SnapshotContainer};
use twc_secrets::{AppRoleConnector, HookToolSecretStore, MemorySecretStore, SecretStore};

/// A snapshot loaded for one hook, plus the collaborators built from it
pub struct Session {
    path: PathBuf,
    snapshot: Snapshot,
    memory_store: MemorySecretStore,
    hook_store: Option<HookToolSecretStore>,
    container: SnapshotContainer,
    connector: AppRoleConnector,
    dry_run: bool,
}

impl Session {
    pub fn open(args: &SessionArgs) -> Result<Self> {
        let path = args
            .snapshot
            .clone()
            .context("No snapshot given (use --snapshot or TWC_SNAPSHOT)")?;
        let mut snapshot = Snapshot::load(&path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        snapshot.inherit_proxy_env();

        Ok(Self {
            memory_store: snapshot.secret_store(),
            hook_store: args.hook_tools.then(HookToolSecretStore::from_env),
            container: SnapshotContainer::new(snapshot.container.clone()),
            connector: AppRoleConnector::default(),
            dry_run: args.dry_run,
            path,
            snapshot,
        })
    }

    fn store(&self) -> &dyn SecretStore {
        match &self.hook_store {
            Some(store) => store,
            None => &self.memory_store,
        }
    }

    pub fn charm(&self) -> Result<Charm<'_>> {
        let model = self.snapshot.model().context("Invalid snapshot")?;
        Ok(Charm::new(model, self.store(), &self.container, &self.connector)
            .with_status(self.snapshot.status.clone()))
    }

    /// Print the outcome and persist what the hook changed
    pub async fn finish(mut self, model: Model, outcome: &EventOutcome) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(outcome)?);

        if self.dry_run {
            return Ok(());
        }

        let secrets = match self.hook_store {
            Some(_) => self.snapshot.secrets.clone(),
            None => self.memory_store.entries().await,
        };
        let container = self.container.state().await;
        self.snapshot.record(&model, container, secrets, outcome);
        self.snapshot
            .save(&self.path)
            .with_context(|| format!("Failed to write snapshot {}", self.path.display()))?;

        info!("Unit status: {}", outcome.status);
        Ok(())
    }
}
