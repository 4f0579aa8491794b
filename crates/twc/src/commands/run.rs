//! `twc run <event>`

use super::Session;
use crate::cli::SessionArgs;
use anyhow::Result;
use clap::Args;
use twc::HookEvent;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Event to handle
    #[arg(value_enum)]
    pub event: HookEvent,
}

pub async fn run(args: RunArgs, session: &SessionArgs) -> Result<()> {
    let session = Session::open(session)?;
    let mut charm = session.charm()?;
    let outcome = charm.handle(args.event).await?;
    let model = charm.into_model();
    session.finish(model, &outcome).await
}
