//! `add-vault-secret` and `get-vault-secret` actions

use super::{ActionOutcome, ActionParams};
use crate::charm::{Charm, CharmError};
use crate::relations::vault::get_vault_config;
use tracing::error;
use twc_secrets::VaultKv;

const CLIENT_UNAVAILABLE: &str = "Unable to initialize vault client. Remove relation and retry.";

fn check_relation(charm: &Charm<'_>) -> Result<(), ActionOutcome> {
    if !charm.container.can_connect() {
        return Err(ActionOutcome::failed("Failed to connect to the container"));
    }
    if charm.model.vault.is_none() {
        return Err(ActionOutcome::failed("No vault relation found"));
    }
    Ok(())
}

/// Non-empty values of every named parameter, in order
fn required<'p>(params: &'p ActionParams, names: &[&str]) -> Option<Vec<&'p str>> {
    names
        .iter()
        .map(|name| {
            params
                .get(*name)
                .map(String::as_str)
                .filter(|value| !value.is_empty())
        })
        .collect()
}

async fn client(charm: &Charm<'_>) -> Result<Box<dyn VaultKv>, ActionOutcome> {
    let config = match get_vault_config(charm.model.vault.as_ref(), charm.store).await {
        Ok(Some(config)) => config,
        Ok(None) => return Err(ActionOutcome::failed("No vault relation found")),
        Err(e) => {
            error!("Unable to initialize vault client: {}", e);
            return Err(ActionOutcome::failed(CLIENT_UNAVAILABLE));
        }
    };
    charm.vault.connect(&config).await.map_err(|e| {
        error!("Unable to initialize vault client: {}", e);
        ActionOutcome::failed(CLIENT_UNAVAILABLE)
    })
}

pub(super) async fn add_secret(
    charm: &mut Charm<'_>,
    params: &ActionParams,
) -> Result<Option<ActionOutcome>, CharmError> {
    if let Err(failure) = check_relation(charm) {
        return Ok(Some(failure));
    }
    let Some([path, key, value]) =
        required(params, &["path", "key", "value"]).and_then(|v| <[&str; 3]>::try_from(v).ok())
    else {
        return Ok(Some(ActionOutcome::failed(
            "`path`, `key` and `value` are required parameters",
        )));
    };

    let client = match client(charm).await {
        Ok(client) => client,
        Err(failure) => return Ok(Some(failure)),
    };
    if let Err(e) = client.write_secret(path, key, value).await {
        error!("Unable to create secret in vault: {}", e);
        return Ok(Some(ActionOutcome::failed(e.to_string())));
    }

    charm.update().await?;
    Ok(Some(ActionOutcome::success([(
        "result",
        "secret successfully created",
    )])))
}

pub(super) async fn get_secret(
    charm: &mut Charm<'_>,
    params: &ActionParams,
) -> Result<Option<ActionOutcome>, CharmError> {
    if let Err(failure) = check_relation(charm) {
        return Ok(Some(failure));
    }
    let Some([path, key]) =
        required(params, &["path", "key"]).and_then(|v| <[&str; 2]>::try_from(v).ok())
    else {
        return Ok(Some(ActionOutcome::failed(
            "`path` and `key` are required parameters",
        )));
    };

    let client = match client(charm).await {
        Ok(client) => client,
        Err(failure) => return Ok(Some(failure)),
    };
    match client.read_secret(path, key).await {
        Ok(value) => Ok(Some(ActionOutcome::success([("result", value)]))),
        Err(e) => {
            let message = format!("Unable to read vault secret `{}` at path `{}`: {}", key, path, e);
            error!("{}", message);
            Ok(Some(ActionOutcome::failed(message)))
        }
    }
}
