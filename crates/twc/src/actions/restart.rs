//! `restart` action

use super::ActionOutcome;
use crate::charm::{Charm, CharmError};
use tracing::error;
use twc_core::literals::WORKLOAD_NAME;

pub(super) async fn run(charm: &mut Charm<'_>) -> Result<Option<ActionOutcome>, CharmError> {
    if !charm.container.can_connect() {
        charm.wait_for_pebble();
        return Ok(None);
    }

    if let Err(e) = charm.container.restart(WORKLOAD_NAME).await {
        error!("Unable to restart {}: {}", WORKLOAD_NAME, e);
        return Ok(Some(ActionOutcome::failed(e.to_string())));
    }

    charm.update().await?;
    Ok(Some(ActionOutcome::success([(
        "result",
        "worker successfully restarted",
    )])))
}
