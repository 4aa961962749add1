//! Status command - current run plus mirrored entity counts

use anyhow::Result;
use clap::Args;

use crate::commands;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let service = commands::build_service().await?;
        let report = service.status().await?;

        match &report.current_run {
            Some(run) => {
                formatter.success(&format!(
                    "Run {} is reconciling {} (started {}, cancel requested: {})",
                    run.id(),
                    run.target(),
                    run.started_at().format("%Y-%m-%d %H:%M:%S UTC"),
                    run.cancel_requested()
                ));
            }
            None => formatter.success("No sync run in progress"),
        }

        let counts = &report.counts;
        formatter.info(&format!("locations:        {}", counts.locations));
        formatter.info(&format!("nodes:            {}", counts.nodes));
        formatter.info(&format!("allocations:      {}", counts.allocations));
        formatter.info(&format!("nests:            {}", counts.nests));
        formatter.info(&format!("eggs:             {}", counts.eggs));
        formatter.info(&format!("servers:          {}", counts.servers));
        formatter.info(&format!("server databases: {}", counts.server_databases));
        formatter.info(&format!("users:            {}", counts.users));

        formatter.print_json(&serde_json::to_value(&report).unwrap_or_default());

        Ok(())
    }
}
