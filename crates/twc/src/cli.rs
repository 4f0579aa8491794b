//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use crate::commands::action::ActionArgs;
pub use crate::commands::check_status::CheckStatusArgs;
pub use crate::commands::render::RenderArgs;
pub use crate::commands::run::RunArgs;

/// twc - Temporal worker operator
#[derive(Parser, Debug)]
#[command(name = "twc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the hook's model comes from
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Path to the hook snapshot YAML file
    #[arg(short, long, global = true, env = "TWC_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Read Juju secrets through the hook tools instead of the snapshot
    #[arg(long, global = true)]
    pub hook_tools: bool,

    /// Print the outcome without writing the snapshot back
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Handle a lifecycle event
    Run(RunArgs),

    /// Run an operator action
    Action(ActionArgs),

    /// Print the Pebble layer the worker would run with
    Render(RenderArgs),

    /// Exit 0 if the worker reports itself healthy
    CheckStatus(CheckStatusArgs),
}
