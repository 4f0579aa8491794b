//! Workflow, activity and dependency list actions

use super::{split_param, ActionOutcome, ActionParams};
use crate::charm::{Charm, CharmError};
use crate::state::{PeerState, StateError};
use serde_json::json;

/// A list of worker settings kept in peer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Workflows,
    Activities,
    Dependencies,
}

impl ListKind {
    pub fn param(self) -> &'static str {
        match self {
            ListKind::Workflows => "workflows",
            ListKind::Activities => "activities",
            ListKind::Dependencies => "dependencies",
        }
    }

    /// Result key the current list is reported under
    pub fn result_key(self) -> &'static str {
        match self {
            ListKind::Workflows => "supported-workflows",
            ListKind::Activities => "supported-activities",
            ListKind::Dependencies => "installed-dependencies",
        }
    }

    pub fn load(self, state: &PeerState) -> Result<Vec<String>, StateError> {
        let items = match self {
            ListKind::Workflows => state.supported_workflows()?,
            ListKind::Activities => state.supported_activities()?,
            ListKind::Dependencies => state.supported_dependencies()?,
        };
        Ok(items.unwrap_or_default())
    }

    pub fn store(self, state: &mut PeerState, items: &[String]) -> Result<(), StateError> {
        match self {
            ListKind::Workflows => state.set_supported_workflows(items),
            ListKind::Activities => state.set_supported_activities(items),
            ListKind::Dependencies => state.set_supported_dependencies(items),
        }
    }
}

/// Peer readiness and leadership checks shared by the mutating actions.
///
/// `Err(None)` means the action was deferred.
pub(super) fn check_writable(charm: &mut Charm<'_>) -> Result<(), Option<ActionOutcome>> {
    if !charm.model.peer.is_ready() {
        charm.wait_for_peer();
        return Err(None);
    }
    if !charm.model.is_leader() {
        return Err(Some(ActionOutcome::failed(StateError::NotLeader.to_string())));
    }
    Ok(())
}

pub(super) async fn add(
    charm: &mut Charm<'_>,
    kind: ListKind,
    params: &ActionParams,
) -> Result<Option<ActionOutcome>, CharmError> {
    if let Err(outcome) = check_writable(charm) {
        return Ok(outcome);
    }
    let requested = match split_param(params, kind.param()) {
        Ok(requested) => requested,
        Err(failure) => return Ok(Some(failure)),
    };

    let mut items = kind.load(&charm.model.peer)?;
    for item in requested {
        if !items.contains(&item) {
            items.push(item);
        }
    }
    kind.store(&mut charm.model.peer, &items)?;

    charm.update().await?;
    Ok(Some(ActionOutcome::success([
        ("result", json!("command succeeded")),
        (kind.result_key(), json!(items)),
    ])))
}

pub(super) async fn remove(
    charm: &mut Charm<'_>,
    kind: ListKind,
    params: &ActionParams,
) -> Result<Option<ActionOutcome>, CharmError> {
    if let Err(outcome) = check_writable(charm) {
        return Ok(outcome);
    }
    let requested = match split_param(params, kind.param()) {
        Ok(requested) => requested,
        Err(failure) => return Ok(Some(failure)),
    };

    let mut items = kind.load(&charm.model.peer)?;
    items.retain(|item| !requested.contains(item));
    kind.store(&mut charm.model.peer, &items)?;

    charm.update().await?;
    Ok(Some(ActionOutcome::success([
        ("result", json!("command succeeded")),
        (kind.result_key(), json!(items)),
    ])))
}

pub(super) fn list(charm: &mut Charm<'_>, kind: ListKind) -> Result<Option<ActionOutcome>, CharmError> {
    if !charm.model.peer.is_ready() {
        charm.wait_for_peer();
        return Ok(None);
    }
    let items = kind.load(&charm.model.peer)?;
    Ok(Some(ActionOutcome::success([
        ("result", json!("command succeeded")),
        (kind.result_key(), json!(items)),
    ])))
}
