//! `twc render`

use super::Session;
use crate::cli::SessionArgs;
use anyhow::{bail, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Output as JSON instead of YAML
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RenderArgs, session: &SessionArgs) -> Result<()> {
    let session = Session::open(session)?;
    let charm = session.charm()?;

    let layer = match charm.desired_layer().await {
        Ok(layer) => layer,
        Err(e) => bail!("{}", e.status()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&layer)?);
    } else {
        print!("{}", serde_yaml_ng::to_string(&layer)?);
    }
    Ok(())
}
