//! Operator actions
//!
//! Each action returns an [`ActionOutcome`], or `None` when the action was
//! deferred because peer state or the container is not ready yet.

mod dependencies;
mod lists;
mod restart;
mod vault;

pub use lists::ListKind;

use crate::charm::{Charm, CharmError, EventOutcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Parameters passed to an action, all as strings
pub type ActionParams = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ActionName {
    Restart,
    AddVaultSecret,
    GetVaultSecret,
    AddWorkflows,
    RemoveWorkflows,
    ListWorkflows,
    AddActivities,
    RemoveActivities,
    ListActivities,
    AddDependencies,
    RemoveDependencies,
    ListDependencies,
}

/// Results reported back to the operator, or the failure message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub results: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ActionOutcome {
    pub fn success<K, V>(results: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        Self {
            results: results
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            failure: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            results: BTreeMap::new(),
            failure: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn result(&self, key: &str) -> Option<&serde_json::Value> {
        self.results.get(key)
    }
}

impl Charm<'_> {
    pub async fn run_action(
        &mut self,
        action: ActionName,
        params: &ActionParams,
    ) -> Result<EventOutcome, CharmError> {
        info!("Running action {:?}", action);
        let outcome = match action {
            ActionName::Restart => restart::run(self).await?,
            ActionName::AddVaultSecret => vault::add_secret(self, params).await?,
            ActionName::GetVaultSecret => vault::get_secret(self, params).await?,
            ActionName::AddWorkflows => lists::add(self, ListKind::Workflows, params).await?,
            ActionName::RemoveWorkflows => lists::remove(self, ListKind::Workflows, params).await?,
            ActionName::ListWorkflows => lists::list(self, ListKind::Workflows)?,
            ActionName::AddActivities => lists::add(self, ListKind::Activities, params).await?,
            ActionName::RemoveActivities => lists::remove(self, ListKind::Activities, params).await?,
            ActionName::ListActivities => lists::list(self, ListKind::Activities)?,
            ActionName::AddDependencies => dependencies::add(self, params).await?,
            ActionName::RemoveDependencies => dependencies::remove(self, params).await?,
            ActionName::ListDependencies => lists::list(self, ListKind::Dependencies)?,
        };
        Ok(self.outcome(outcome))
    }
}

/// Comma-separated parameter, trimmed, empty entries dropped
pub(crate) fn split_param(params: &ActionParams, name: &str) -> Result<Vec<String>, ActionOutcome> {
    let raw = params
        .get(name)
        .ok_or_else(|| ActionOutcome::failed(format!("`{}` is a required parameter", name)))?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}
