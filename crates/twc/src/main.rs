//! twc - hook and action runner for the Temporal worker operator
//!
//! This is the entry point of the `twc` binary.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => commands::run::run(args, &cli.session).await,
        Commands::Action(args) => commands::action::run(args, &cli.session).await,
        Commands::Render(args) => commands::render::run(args, &cli.session).await,
        Commands::CheckStatus(args) => commands::check_status::run(args),
    }
}

/// Initialize tracing with appropriate verbosity.
///
/// Logs go to stderr; stdout carries the command's result.
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
