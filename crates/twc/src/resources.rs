//! Workflows wheel attached as the `workflows-file` resource
//!
//! The wheel is pushed into the workload container and unpacked under
//! [`USER_PROVIDED_DIR`]. Its single top-level package directory names the
//! module the worker imports workflows and activities from.

use crate::container::Container;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};
use twc_core::literals::{DEFAULT_WHEEL_FILE_NAME, USER_PROVIDED_DIR};

#[derive(Error, Debug)]
pub enum WorkflowsFileError {
    #[error("Invalid state: workflows-file resource not found")]
    NotFound {
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid state: failed to extract module name from wheel file")]
    ModuleName,

    #[error(transparent)]
    Container(#[from] twc_core::Error),
}

/// Where the wheel landed and which module it provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedWheel {
    pub module_name: String,
    pub file_name: String,
}

/// Replace the container's user-provided directory with the unpacked wheel
pub async fn unpack_workflows_file(
    container: &dyn Container,
    resource: &Path,
) -> Result<UnpackedWheel, WorkflowsFileError> {
    let content = tokio::fs::read(resource)
        .await
        .map_err(|source| WorkflowsFileError::NotFound { source })?;
    let file_name = resource
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_WHEEL_FILE_NAME)
        .to_string();
    let target = format!("{}/{}", USER_PROVIDED_DIR, file_name);

    container.exec(&["rm", "-rf", USER_PROVIDED_DIR]).await?;
    container.push(&target, &content).await?;
    container.exec(&["apt-get", "update"]).await?;
    container.exec(&["apt-get", "install", "-y", "unzip"]).await?;

    let unzip = container.exec(&["unzip", target.as_str(), "-d", USER_PROVIDED_DIR]).await?;
    if !unzip.stderr.trim().is_empty() {
        warn!("unzip reported: {}", unzip.stderr.trim());
    }

    let found = container
        .exec(&[
            "find",
            USER_PROVIDED_DIR,
            "-mindepth",
            "1",
            "-maxdepth",
            "1",
            "-type",
            "d",
            "!",
            "-name",
            "*.dist-info",
            "!",
            "-name",
            "*.whl",
        ])
        .await?;
    if !found.stderr.trim().is_empty() {
        warn!("failed to extract module name from wheel file: {}", found.stderr.trim());
        return Err(WorkflowsFileError::ModuleName);
    }

    let module_name = module_from_listing(&found.stdout).ok_or(WorkflowsFileError::ModuleName)?;
    info!("Unpacked {} providing module '{}'", file_name, module_name);

    Ok(UnpackedWheel {
        module_name,
        file_name,
    })
}

/// Last path segment of the first directory listed
fn module_from_listing(listing: &str) -> Option<String> {
    let first = listing.lines().map(str::trim).find(|line| !line.is_empty())?;
    let name = first.trim_end_matches('/').rsplit('/').next()?;
    debug!("Wheel module directory: {}", first);
    (!name.is_empty()).then(|| name.to_string())
}
