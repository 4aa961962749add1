//! Cancel command - flag the current run for cooperative cancellation
//!
//! Cancellation is advisory: the engine observes the flag at the next
//! page boundary, so the run may take up to one page's processing time
//! to reach the Cancelled status.

use anyhow::Result;
use clap::Args;

use panelsync_core::domain::errors::SyncLogError;

use crate::commands;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct CancelCommand {}

impl CancelCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let service = commands::build_service().await?;

        match service.cancel().await {
            Ok(run_id) => {
                formatter.success(&format!(
                    "Cancellation requested for run {run_id}; it will stop at the next page boundary"
                ));
                formatter.print_json(&serde_json::json!({ "run_id": run_id.to_string() }));
            }
            Err(SyncLogError::NoRunInProgress) => {
                formatter.error("No sync run is currently in progress");
            }
            Err(e) => formatter.error(&e.to_string()),
        }

        Ok(())
    }
}
