//! `add-dependencies` and `remove-dependencies` actions
//!
//! Dependencies are pip requirements installed into the workload container.

use super::lists::{check_writable, ListKind};
use super::{split_param, ActionOutcome, ActionParams};
use crate::charm::{Charm, CharmError};
use crate::container::Container;
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use tracing::{error, info};

static REQUIREMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*(?:(?:==|>=|<=|~=|>|<)[A-Za-z0-9][A-Za-z0-9.*+!_-]*)?$")
        .expect("requirement regex is valid")
});

/// `name` or `name<op>version`
fn is_valid_requirement(requirement: &str) -> bool {
    REQUIREMENT_RE.is_match(requirement)
}

/// Normalized package name of a requirement
fn package_name(requirement: &str) -> String {
    requirement
        .split(['=', '<', '>', '~'])
        .next()
        .unwrap_or(requirement)
        .to_lowercase()
        .replace('_', "-")
}

/// Run pip; warnings on stderr are not failures
async fn pip(container: &dyn Container, args: &[&str]) -> Result<(), String> {
    let mut command = vec!["pip"];
    command.extend_from_slice(args);
    let output = container.exec(&command).await.map_err(|e| e.to_string())?;

    let stderr = output.stderr.trim();
    if stderr.is_empty() || stderr.starts_with("WARNING") {
        Ok(())
    } else {
        Err(stderr.to_string())
    }
}

fn check_container(charm: &mut Charm<'_>) -> bool {
    if charm.container.can_connect() {
        return true;
    }
    charm.wait_for_pebble();
    false
}

pub(super) async fn add(
    charm: &mut Charm<'_>,
    params: &ActionParams,
) -> Result<Option<ActionOutcome>, CharmError> {
    if let Err(outcome) = check_writable(charm) {
        return Ok(outcome);
    }
    if !check_container(charm) {
        return Ok(None);
    }
    let requested = match split_param(params, ListKind::Dependencies.param()) {
        Ok(requested) => requested,
        Err(failure) => return Ok(Some(failure)),
    };

    let mut installed = ListKind::Dependencies.load(&charm.model.peer)?;
    let mut rejected = Vec::new();
    for dependency in requested {
        if installed.contains(&dependency) {
            continue;
        }
        if !is_valid_requirement(&dependency) {
            rejected.push(dependency);
            continue;
        }
        if let Err(e) = pip(charm.container, &["install", dependency.as_str()]).await {
            error!("Error installing {}: {}", dependency, e);
            rejected.push(dependency);
            continue;
        }

        let package = package_name(&dependency);
        installed.retain(|existing| package_name(existing) != package);
        info!("Installed dependency {}", dependency);
        installed.push(dependency);
    }
    ListKind::Dependencies.store(&mut charm.model.peer, &installed)?;

    charm.update().await?;
    Ok(Some(ActionOutcome::success([
        ("result", json!("command succeeded")),
        ("installed-dependencies", json!(installed)),
        ("rejected-dependencies", json!(rejected)),
    ])))
}

pub(super) async fn remove(
    charm: &mut Charm<'_>,
    params: &ActionParams,
) -> Result<Option<ActionOutcome>, CharmError> {
    if let Err(outcome) = check_writable(charm) {
        return Ok(outcome);
    }
    if !check_container(charm) {
        return Ok(None);
    }
    let requested = match split_param(params, ListKind::Dependencies.param()) {
        Ok(requested) => requested,
        Err(failure) => return Ok(Some(failure)),
    };

    let mut installed = ListKind::Dependencies.load(&charm.model.peer)?;
    let mut removed = Vec::new();
    let mut rejected = Vec::new();
    for dependency in requested {
        if !installed.contains(&dependency) {
            rejected.push(dependency);
            continue;
        }
        if let Err(e) = pip(charm.container, &["uninstall", "-y", dependency.as_str()]).await {
            error!("Error uninstalling {}: {}", dependency, e);
            rejected.push(dependency);
            continue;
        }
        installed.retain(|existing| existing != &dependency);
        removed.push(dependency);
    }
    ListKind::Dependencies.store(&mut charm.model.peer, &installed)?;

    charm.update().await?;
    Ok(Some(ActionOutcome::success([
        ("result", json!("command succeeded")),
        ("installed-dependencies", json!(installed)),
        ("removed-dependencies", json!(removed)),
        ("rejected-dependencies", json!(rejected)),
    ])))
}
