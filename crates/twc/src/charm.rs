//! Reconciler and unit status machine
//!
//! Every hook ends in the same reconciliation: validate the model, build the
//! worker environment, and make sure Pebble runs the matching layer.
//!
//! ```text
//! Waiting("configuring") -> Blocked(reason)
//!                        -> Maintenance("replanning application") -> Active(...)
//! ```

use crate::container::Container;
use crate::model::Model;
use crate::relations::database::connection_env;
use crate::relations::vault::{connected_writes, ensure_nonce, get_vault_config};
use crate::relations::RelationWrite;
use crate::resources::{unpack_workflows_file, WorkflowsFileError};
use crate::state::{DatabaseConnection, StateError};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use twc_core::config::{dual_prefixed, env_suffix};
use twc_core::literals::{
    PROXY_ENV_VARS, REQUIRED_CANDID_CONFIG, REQUIRED_CHARM_CONFIG, REQUIRED_OIDC_CONFIG,
    SUPPORTED_AUTH_PROVIDERS, VALID_LOG_LEVELS, WORKLOAD_NAME,
};
use twc_core::{Layer, UnitStatus};
use twc_secrets::sources::JujuSource;
use twc_secrets::{
    parse_environment, parse_legacy_secrets, EnvironmentResolver, EnvironmentSpec,
    ResolvedEnvironment, SecretError, SecretRef, SecretStore, StoreError, VaultAccess,
    VaultConfig, VaultConnector, VaultError,
};

use crate::actions::ActionOutcome;

const WAITING_FOR_PEBBLE: &str = "waiting for pebble api";
const WAITING_FOR_PEER: &str = "waiting for peer relation";
const REPLANNING: &str = "replanning application";

/// Lifecycle events the operator reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HookEvent {
    Install,
    ConfigChanged,
    PebbleReady,
    UpdateStatus,
    PeerRelationChanged,
    VaultConnected,
    VaultReady,
    VaultGone,
    DatabaseChanged,
    DatabaseBroken,
    SecretChanged,
}

/// Why the worker cannot be (re)configured
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Fixable by changing config; blocks the unit
    #[error("{0}")]
    Config(String),

    /// A dependency will show up on its own; waits and defers
    #[error("{0}")]
    NotReady(String),

    /// A secret could not be read; blocks until access is fixed
    #[error("{0}")]
    ExternalSecret(String),
}

impl ValidationError {
    pub fn status(&self) -> UnitStatus {
        match self {
            ValidationError::NotReady(message) => UnitStatus::waiting(message.as_str()),
            ValidationError::Config(message) | ValidationError::ExternalSecret(message) => {
                UnitStatus::blocked(message.as_str())
            }
        }
    }

    pub fn defers(&self) -> bool {
        matches!(self, ValidationError::NotReady(_))
    }
}

impl From<SecretError> for ValidationError {
    fn from(err: SecretError) -> Self {
        let message = err.to_string();
        match err {
            SecretError::InvalidStructure(_)
            | SecretError::ReservedPrefix { .. }
            | SecretError::UserSecretsUnsupported => ValidationError::Config(message),
            SecretError::VaultInit(VaultError::MissingCredentials) => {
                ValidationError::NotReady(message)
            }
            _ => ValidationError::ExternalSecret(message),
        }
    }
}

impl From<StateError> for ValidationError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotReady => ValidationError::NotReady(WAITING_FOR_PEER.to_string()),
            other => ValidationError::Config(other.to_string()),
        }
    }
}

/// Failures the reconciler does not model; they abort the hook
#[derive(Error, Debug)]
pub enum CharmError {
    #[error(transparent)]
    Container(#[from] twc_core::Error),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("secret store: {0}")]
    Store(#[from] StoreError),
}

/// Result of one hook or action
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct EventOutcome {
    pub status: UnitStatus,
    /// The runtime should redeliver the event later
    pub deferred: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relation_writes: Vec<RelationWrite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionOutcome>,
}

/// Everything validation gathered, ready to become the worker environment
#[derive(Debug, Default)]
pub struct WorkerInputs {
    /// Auth settings read from the `auth-secret-id` secret
    pub auth: BTreeMap<String, String>,
    pub vault: Option<VaultConfig>,
    pub database: Option<DatabaseConnection>,
    pub peer_settings: BTreeMap<String, String>,
    pub env_file: BTreeMap<String, String>,
    pub resolved: ResolvedEnvironment,
}

pub struct Charm<'a> {
    pub(crate) model: Model,
    pub(crate) store: &'a dyn SecretStore,
    pub(crate) container: &'a dyn Container,
    pub(crate) vault: &'a dyn VaultConnector,
    status: UnitStatus,
    deferred: bool,
    relation_writes: Vec<RelationWrite>,
}

impl<'a> Charm<'a> {
    pub fn new(
        model: Model,
        store: &'a dyn SecretStore,
        container: &'a dyn Container,
        vault: &'a dyn VaultConnector,
    ) -> Self {
        Self {
            model,
            store,
            container,
            vault,
            status: UnitStatus::default(),
            deferred: false,
            relation_writes: Vec::new(),
        }
    }

    /// Start from the status the unit currently shows
    pub fn with_status(mut self, status: UnitStatus) -> Self {
        self.status = status;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn status(&self) -> &UnitStatus {
        &self.status
    }

    pub async fn handle(&mut self, event: HookEvent) -> Result<EventOutcome, CharmError> {
        info!("Handling {:?}", event);
        match event {
            HookEvent::Install => {
                ensure_nonce(self.store).await?;
            }
            HookEvent::ConfigChanged => {
                self.status = UnitStatus::default();
                self.process_env_file()?;
                if self.process_workflows_file().await? {
                    self.update().await?;
                }
            }
            HookEvent::PebbleReady => self.on_pebble_ready().await?,
            HookEvent::UpdateStatus
            | HookEvent::PeerRelationChanged
            | HookEvent::VaultReady
            | HookEvent::VaultGone
            | HookEvent::SecretChanged => self.update().await?,
            HookEvent::VaultConnected => {
                let nonce = ensure_nonce(self.store).await?;
                let writes = connected_writes(&nonce, &self.model.egress_subnet, self.model.is_leader());
                self.relation_writes.extend(writes);
            }
            HookEvent::DatabaseChanged => self.on_database_changed().await?,
            HookEvent::DatabaseBroken => self.on_database_broken().await?,
        }
        Ok(self.outcome(None))
    }

    pub(crate) fn outcome(&mut self, action: Option<ActionOutcome>) -> EventOutcome {
        EventOutcome {
            status: self.status.clone(),
            deferred: std::mem::take(&mut self.deferred),
            relation_writes: std::mem::take(&mut self.relation_writes),
            action,
        }
    }

    pub(crate) fn wait_for_pebble(&mut self) {
        self.status = UnitStatus::waiting(WAITING_FOR_PEBBLE);
        self.deferred = true;
    }

    pub(crate) fn wait_for_peer(&mut self) {
        self.status = UnitStatus::waiting(WAITING_FOR_PEER);
        self.deferred = true;
    }

    async fn on_pebble_ready(&mut self) -> Result<(), CharmError> {
        if !self.model.peer.is_ready() {
            self.wait_for_peer();
            return Ok(());
        }

        if self.model.is_leader() {
            let peer = &mut self.model.peer;
            if peer.supported_workflows()?.is_none() {
                peer.set_supported_workflows(&[])?;
            }
            if peer.supported_activities()?.is_none() {
                peer.set_supported_activities(&[])?;
            }
            if peer.supported_dependencies()?.is_none() {
                peer.set_supported_dependencies(&[])?;
            }
        }

        self.update().await
    }

    async fn on_database_changed(&mut self) -> Result<(), CharmError> {
        if !self.model.is_leader() {
            return Ok(());
        }
        if !self.model.peer.is_ready() {
            self.wait_for_peer();
            return Ok(());
        }

        self.status = UnitStatus::waiting("handling database change");
        let dbname = self.model.config.get_str("db-name").to_string();
        let connection = self
            .model
            .database
            .as_ref()
            .and_then(|data| data.connection(&dbname));
        match connection {
            Some(connection) => self.model.peer.set_database_connection(Some(&connection))?,
            None => debug!("Database relation data incomplete"),
        }

        self.update().await
    }

    async fn on_database_broken(&mut self) -> Result<(), CharmError> {
        // The departing relation no longer counts towards validation
        self.model.database = None;

        if !self.model.is_leader() {
            return Ok(());
        }
        if !self.model.peer.is_ready() {
            self.wait_for_peer();
            return Ok(());
        }

        self.model.peer.set_database_connection(None)?;
        self.update().await
    }

    /// Cache the env-file resource in peer state
    fn process_env_file(&mut self) -> Result<(), StateError> {
        if !self.model.is_leader() || !self.model.peer.is_ready() {
            return Ok(());
        }

        let env = match self.model.env_file.as_deref() {
            Some(content) => match parse_env_file(content) {
                Ok(env) => Some(env),
                Err(e) => {
                    error!("Unable to parse env-file resource: {}", e);
                    None
                }
            },
            None => None,
        };
        self.model.peer.set_env(env.as_ref())
    }

    /// Unpack the workflows-file resource and record the module it provides.
    ///
    /// Returns false when the unit was left waiting or blocked.
    async fn process_workflows_file(&mut self) -> Result<bool, CharmError> {
        let leader = self.model.is_leader();
        let Some(resource) = self.model.workflows_file.clone() else {
            if leader && self.model.peer.is_ready() {
                self.model.peer.set_module_name(None)?;
                self.model.peer.set_unpacked_file_name(None)?;
            }
            return Ok(true);
        };

        if !self.model.peer.is_ready() {
            self.wait_for_peer();
            return Ok(false);
        }
        if leader {
            self.model.peer.set_module_name(None)?;
        }
        if !self.container.can_connect() {
            self.wait_for_pebble();
            return Ok(false);
        }

        match unpack_workflows_file(self.container, &resource).await {
            Ok(wheel) => {
                if leader {
                    let peer = &mut self.model.peer;
                    peer.set_module_name(Some(wheel.module_name.as_str()))?;
                    peer.set_unpacked_file_name(Some(wheel.file_name.as_str()))?;
                }
                Ok(true)
            }
            Err(WorkflowsFileError::Container(e)) => Err(e.into()),
            Err(e) => {
                error!("Unable to process workflows-file resource: {}", e);
                self.status = UnitStatus::blocked(e.to_string());
                Ok(false)
            }
        }
    }

    /// Reconcile the workload with the current model
    pub(crate) async fn update(&mut self) -> Result<(), CharmError> {
        if !self.container.can_connect() {
            self.wait_for_pebble();
            return Ok(());
        }

        let inputs = match self.validate().await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!("Unable to configure worker: {}", e);
                self.status = e.status();
                self.deferred = e.defers();
                return Ok(());
            }
        };
        let layer = self.layer(inputs);

        let plan = self.container.plan().await?;
        if plan.contains(&layer) && self.container.is_running(WORKLOAD_NAME).await? {
            debug!("Pebble plan up to date");
            self.status = UnitStatus::active(self.active_message());
            return Ok(());
        }

        info!("Configuring Temporal worker");
        self.container.add_layer(WORKLOAD_NAME, &layer, true).await?;
        self.container.replan().await?;
        self.status = UnitStatus::maintenance(REPLANNING);
        Ok(())
    }

    fn active_message(&self) -> String {
        format!(
            "worker listening to namespace '{}' on queue '{}'",
            self.model.config.get_str("namespace"),
            self.model.config.get_str("queue")
        )
    }

    /// Layer the worker should run with, without touching the container
    pub async fn desired_layer(&self) -> Result<Layer, ValidationError> {
        let inputs = self.validate().await?;
        Ok(self.layer(inputs))
    }

    fn layer(&self, inputs: WorkerInputs) -> Layer {
        let layer = Layer::worker(self.environment(inputs));
        if self.model.config.get_bool("health-check") {
            layer.with_health_check()
        } else {
            layer
        }
    }

    /// Check config and relations, gathering everything the environment needs.
    ///
    /// The first failing check wins.
    pub async fn validate(&self) -> Result<WorkerInputs, ValidationError> {
        let config = &self.model.config;

        let log_level = config.log_level();
        if !VALID_LOG_LEVELS.contains(&log_level.as_str()) {
            return Err(ValidationError::Config(format!(
                "config: invalid log level '{}'",
                log_level
            )));
        }

        if !self.model.peer.is_ready() {
            return Err(ValidationError::NotReady(WAITING_FOR_PEER.to_string()));
        }

        check_required(REQUIRED_CHARM_CONFIG, |key| config.get_str(key))?;

        let auth = self.auth_settings().await?;

        if !config.is_blank("sentry-dsn") {
            let rate = config.get_f64("sentry-sample-rate").unwrap_or(-1.0);
            if !(0.0..=1.0).contains(&rate) {
                return Err(ValidationError::Config(
                    "Invalid config: sentry-sample-rate must be between 0 and 1".to_string(),
                ));
            }
        }

        if self.model.database.is_some() && config.is_blank("db-name") {
            return Err(ValidationError::Config(
                "Invalid config: db name value missing".to_string(),
            ));
        }

        let spec = self.environment_spec()?;

        let vault = match get_vault_config(self.model.vault.as_ref(), self.store).await {
            Ok(vault) => vault,
            Err(e @ VaultError::MissingCredentials) => {
                return Err(ValidationError::NotReady(e.to_string()))
            }
            Err(e) => return Err(ValidationError::ExternalSecret(e.to_string())),
        };

        let access = match self.model.vault {
            Some(_) => VaultAccess::Related {
                config: vault.as_ref(),
                connector: self.vault,
            },
            None => VaultAccess::Unrelated,
        };
        let resolved = EnvironmentResolver::new(self.store, access)
            .resolve(&spec)
            .await?;

        let peer = &self.model.peer;
        let database = match self.model.database {
            Some(_) => peer.database_connection()?,
            None => None,
        };

        Ok(WorkerInputs {
            auth,
            vault,
            database,
            peer_settings: self.peer_settings()?,
            env_file: peer.env()?.unwrap_or_default(),
            resolved,
        })
    }

    /// Auth provider settings, from the referenced secret or from config.
    ///
    /// Only settings read from a secret are returned; inline config already
    /// reaches the worker through the forwarded options.
    async fn auth_settings(&self) -> Result<BTreeMap<String, String>, ValidationError> {
        let config = &self.model.config;

        let (settings, from_secret) = if config.is_blank("auth-secret-id") {
            let settings = std::iter::once("auth-provider")
                .chain(REQUIRED_CANDID_CONFIG.iter().copied())
                .chain(REQUIRED_OIDC_CONFIG.iter().copied())
                .map(|key| (key.to_string(), config.get_str(key).to_string()))
                .collect::<BTreeMap<_, _>>();
            (settings, false)
        } else {
            if !config.is_blank("auth-provider") {
                return Err(ValidationError::Config(
                    "Invalid config: auth-provider and auth-secret-id cannot both be set"
                        .to_string(),
                ));
            }
            let secret = SecretRef::id(config.get_str("auth-secret-id").trim());
            let content = JujuSource::new(self.store).content(&secret).await?;
            (content, true)
        };

        let provider = settings
            .get("auth-provider")
            .map(|p| p.trim())
            .unwrap_or("");
        if provider.is_empty() {
            return Ok(if from_secret { settings } else { BTreeMap::new() });
        }

        let required = match provider {
            "candid" => REQUIRED_CANDID_CONFIG,
            "google" => REQUIRED_OIDC_CONFIG,
            _ => {
                debug!("Supported auth providers: {:?}", SUPPORTED_AUTH_PROVIDERS);
                return Err(ValidationError::Config(
                    "Invalid config: auth-provider not supported".to_string(),
                ));
            }
        };
        check_required(required, |key| {
            settings.get(key).map(String::as_str).unwrap_or("")
        })?;

        Ok(if from_secret { settings } else { BTreeMap::new() })
    }

    fn environment_spec(&self) -> Result<EnvironmentSpec, ValidationError> {
        let config = &self.model.config;
        let environment = config.get_str("environment");
        let secrets = config.get_str("secrets");

        let spec = match (environment.trim().is_empty(), secrets.trim().is_empty()) {
            (true, true) => EnvironmentSpec::default(),
            (false, true) => parse_environment(environment)?,
            (true, false) => parse_legacy_secrets(secrets)?,
            (false, false) => {
                return Err(ValidationError::Config(
                    "Invalid config: 'environment' and 'secrets' cannot both be set".to_string(),
                ))
            }
        };
        Ok(spec)
    }

    /// Worker settings kept in peer state by the list actions
    fn peer_settings(&self) -> Result<BTreeMap<String, String>, StateError> {
        let peer = &self.model.peer;
        let mut settings = BTreeMap::new();

        if let Some(module) = peer.module_name()? {
            settings.extend(dual_prefixed("MODULE_NAME", &module));
        }
        for (suffix, items) in [
            ("SUPPORTED_WORKFLOWS", peer.supported_workflows()?),
            ("SUPPORTED_ACTIVITIES", peer.supported_activities()?),
        ] {
            if let Some(items) = items.filter(|items| !items.is_empty()) {
                settings.extend(dual_prefixed(suffix, &items.join(",")));
            }
        }
        Ok(settings)
    }

    /// Assemble the worker environment; later layers win
    pub fn environment(&self, inputs: WorkerInputs) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();

        for (source, target) in PROXY_ENV_VARS {
            if let Some(value) = self.model.process_env.get(*source).filter(|v| !v.is_empty()) {
                env.insert(target.to_string(), value.clone());
            }
        }

        env.extend(self.model.config.forwarded_env());

        for (key, value) in &inputs.auth {
            env.extend(dual_prefixed(&env_suffix(key), value));
        }

        if let Some(vault) = &inputs.vault {
            env.extend(vault.env());
        }

        if let Some(connection) = &inputs.database {
            env.extend(connection_env(connection));
        }

        env.extend(inputs.peer_settings);
        env.extend(inputs.env_file);
        env.extend(inputs.resolved.into_env());
        env
    }
}

fn check_required<'c>(
    keys: &[&str],
    value: impl Fn(&str) -> &'c str,
) -> Result<(), ValidationError> {
    match keys.iter().find(|key| value(**key).trim().is_empty()) {
        Some(key) => Err(ValidationError::Config(format!(
            "Invalid config: {} value missing",
            key
        ))),
        None => Ok(()),
    }
}

fn parse_env_file(content: &str) -> Result<BTreeMap<String, String>, dotenvy::Error> {
    dotenvy::from_read_iter(content.as_bytes()).collect()
}
