//! `twc action <name> -p key=value`

use super::Session;
use crate::cli::SessionArgs;
use anyhow::{bail, Result};
use clap::Args;
use twc::{ActionName, ActionParams};

#[derive(Args, Debug)]
pub struct ActionArgs {
    /// Action to run
    #[arg(value_enum)]
    pub name: ActionName,

    /// Action parameter as key=value (repeatable)
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

pub async fn run(args: ActionArgs, session: &SessionArgs) -> Result<()> {
    let params: ActionParams = args.params.into_iter().collect();

    let session = Session::open(session)?;
    let mut charm = session.charm()?;
    let outcome = charm.run_action(args.name, &params).await?;
    let model = charm.into_model();
    session.finish(model, &outcome).await?;

    if let Some(failure) = outcome.action.as_ref().and_then(|a| a.failure.as_deref()) {
        bail!("Action failed: {}", failure);
    }
    Ok(())
}
