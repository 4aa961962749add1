//! Sync command - trigger a reconciliation run
//!
//! Claims a run, drives it to its terminal status, and prints the
//! per-entity summary. Runs execute in the foreground here: the CLI
//! process owns the runtime, so enqueue-and-exit would abandon the run
//! and wedge the Running slot until the stale threshold. A cancel can
//! be issued from another terminal while this command runs.

use std::str::FromStr;

use anyhow::Result;
use clap::Args;

use panelsync_core::domain::errors::SyncLogError;
use panelsync_core::domain::run::{SyncRun, SyncTarget};

use crate::commands;
use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Entity type to reconcile (locations, nodes, allocations,
    /// nests_and_eggs, servers, server_databases, users, all)
    #[arg(long, default_value = "all")]
    pub target: String,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let target = match SyncTarget::from_str(&self.target) {
            Ok(target) => target,
            Err(e) => {
                formatter.error(&e.to_string());
                return Ok(());
            }
        };

        let service = commands::build_service().await?;

        formatter.info(&format!("Reconciling {} against the panel...", target));

        match service.run_sync(target).await {
            Ok(run) => print_run(formatter.as_ref(), &run),
            Err(SyncLogError::SyncAlreadyInProgress) => {
                formatter.error("A sync run is already in progress; cancel it or wait");
            }
            Err(e) => formatter.error(&e.to_string()),
        }

        Ok(())
    }
}

/// Prints a finished run: terminal status plus per-entity counts
pub fn print_run(formatter: &dyn OutputFormatter, run: &SyncRun) {
    if run.status().is_success() {
        formatter.success(&format!(
            "Run {} completed in {}s",
            run.id(),
            run.duration().num_seconds()
        ));
    } else {
        formatter.error(&format!("Run {} {}", run.id(), run.status()));
    }

    if let Some(summary) = &run.metadata().summary {
        for (target, counts) in &summary.counts {
            formatter.info(&format!(
                "{}: {} created, {} updated, {} skipped",
                target, counts.created, counts.updated, counts.skipped
            ));
            for error in &counts.errors {
                formatter.info(&format!("  skipped #{}: {}", error.panel_id, error.message));
            }
        }
    }

    formatter.print_json(&serde_json::to_value(run).unwrap_or_default());
}
