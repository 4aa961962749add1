//! panelsync CLI - Command-line interface for the panel reconciliation engine
//!
//! Provides commands for:
//! - Triggering a sync run (foreground or detached)
//! - Cancelling the run in flight
//! - Viewing the current run and mirror counts
//! - Browsing run history

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    cancel::CancelCommand, history::HistoryCommand, status::StatusCommand, sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "panelsync", version, about = "Panel mirror reconciliation for Stellae Hosting")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Reconcile the local mirror with the panel
    Sync(SyncCommand),
    /// Cancel the run currently in flight
    Cancel(CancelCommand),
    /// Show the current run and mirrored entity counts
    Status(StatusCommand),
    /// Browse past sync runs
    History(HistoryCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(format).await,
        Commands::Cancel(cmd) => cmd.execute(format).await,
        Commands::Status(cmd) => cmd.execute(format).await,
        Commands::History(cmd) => cmd.execute(format).await,
    }
}
