//! Worker health check backing the Pebble `exec` check

use std::path::Path;
use tracing::{error, info};
use twc_core::literals::WORKER_STATUS_SUCCESS;

/// Whether the worker reported itself healthy in its status file
pub fn worker_healthy(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let status = content.trim();
            info!("Worker status: {}", status);
            status.starts_with(WORKER_STATUS_SUCCESS)
        }
        Err(e) => {
            error!("Status file {} unreadable, worker is not running: {}", path.display(), e);
            false
        }
    }
}

/// Process exit code for the check
pub fn exit_code(path: &Path) -> i32 {
    if worker_healthy(path) {
        0
    } else {
        1
    }
}
