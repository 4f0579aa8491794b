//! Workload container access
//!
//! [`Container`] covers the Pebble operations the operator needs.
//! [`SnapshotContainer`] keeps the plan and service state in memory so a
//! hook can be replayed from a snapshot file.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::Mutex;
use tracing::{debug, info};
use twc_core::pebble::Startup;
use twc_core::{Layer, Plan, Result};

/// Output of a command run inside the container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait Container: Send + Sync {
    /// Whether the Pebble API is reachable
    fn can_connect(&self) -> bool;

    async fn plan(&self) -> Result<Plan>;

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()>;

    /// Start or restart services whose definition changed
    async fn replan(&self) -> Result<()>;

    async fn restart(&self, service: &str) -> Result<()>;

    async fn is_running(&self, service: &str) -> Result<bool>;

    async fn exec(&self, command: &[&str]) -> Result<ExecOutput>;

    /// Write a file, creating parent directories
    async fn push(&self, path: &str, content: &[u8]) -> Result<()>;
}

/// Serializable container state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContainerState {
    pub connectable: bool,
    pub plan: Plan,
    pub layers: BTreeMap<String, Layer>,
    pub running: BTreeSet<String>,
    pub replans: u32,
    pub restarts: Vec<String>,
    /// Commands run so far, space-joined
    pub executed: Vec<String>,
    /// Canned stdout keyed by space-joined command
    pub exec_output: BTreeMap<String, String>,
    /// Canned stderr keyed by space-joined command
    pub exec_errors: BTreeMap<String, String>,
    /// Pushed files and their size in bytes
    pub files: BTreeMap<String, usize>,
}

impl Default for ContainerState {
    fn default() -> Self {
        Self {
            connectable: true,
            plan: Plan::default(),
            layers: BTreeMap::new(),
            running: BTreeSet::new(),
            replans: 0,
            restarts: Vec::new(),
            executed: Vec::new(),
            exec_output: BTreeMap::new(),
            exec_errors: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct SnapshotContainer {
    connectable: bool,
    state: Mutex<ContainerState>,
}

impl Default for SnapshotContainer {
    fn default() -> Self {
        Self::new(ContainerState::default())
    }
}

impl SnapshotContainer {
    pub fn new(state: ContainerState) -> Self {
        Self {
            connectable: state.connectable,
            state: Mutex::new(state),
        }
    }

    /// Container whose Pebble API is not up yet
    pub fn unreachable() -> Self {
        Self::new(ContainerState {
            connectable: false,
            ..ContainerState::default()
        })
    }

    /// Copy of the current state
    pub async fn state(&self) -> ContainerState {
        self.state.lock().await.clone()
    }

    pub fn into_state(self) -> ContainerState {
        self.state.into_inner()
    }
}

#[async_trait]
impl Container for SnapshotContainer {
    fn can_connect(&self) -> bool {
        self.connectable
    }

    async fn plan(&self) -> Result<Plan> {
        Ok(self.state.lock().await.plan.clone())
    }

    async fn add_layer(&self, label: &str, layer: &Layer, combine: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.layers.contains_key(label) && !combine {
            return Err(twc_core::Error::pebble(format!(
                "layer '{}' already exists",
                label
            )));
        }
        state.layers.insert(label.to_string(), layer.clone());
        state.plan.combine(layer);
        debug!("Layer '{}' added", label);
        Ok(())
    }

    async fn replan(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let enabled: BTreeSet<String> = state
            .plan
            .services
            .iter()
            .filter(|(_, service)| service.startup == Startup::Enabled)
            .map(|(name, _)| name.clone())
            .collect();
        state.running = enabled;
        state.replans += 1;
        info!("Replanned {} services", state.running.len());
        Ok(())
    }

    async fn restart(&self, service: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.plan.services.contains_key(service) {
            return Err(twc_core::Error::pebble(format!(
                "cannot restart unknown service '{}'",
                service
            )));
        }
        state.running.insert(service.to_string());
        state.restarts.push(service.to_string());
        Ok(())
    }

    async fn is_running(&self, service: &str) -> Result<bool> {
        Ok(self.state.lock().await.running.contains(service))
    }

    async fn exec(&self, command: &[&str]) -> Result<ExecOutput> {
        let mut state = self.state.lock().await;
        let line = command.join(" ");
        let stdout = state.exec_output.get(&line).cloned().unwrap_or_default();
        let stderr = state.exec_errors.get(&line).cloned().unwrap_or_default();
        state.executed.push(line);
        Ok(ExecOutput { stdout, stderr })
    }

    async fn push(&self, path: &str, content: &[u8]) -> Result<()> {
        if !self.connectable {
            return Err(twc_core::Error::pebble(format!("cannot push {}: pebble unreachable", path)));
        }
        self.state
            .lock()
            .await
            .files
            .insert(path.to_string(), content.len());
        debug!("Pushed {} ({} bytes)", path, content.len());
        Ok(())
    }
}
