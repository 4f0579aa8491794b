//! `twc check-status`

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use twc_core::literals::WORKER_STATUS_FILE;

#[derive(Args, Debug)]
pub struct CheckStatusArgs {
    /// Status file written by the worker
    #[arg(long, default_value = WORKER_STATUS_FILE)]
    pub file: PathBuf,
}

pub fn run(args: CheckStatusArgs) -> Result<()> {
    std::process::exit(twc::check::exit_code(&args.file))
}
