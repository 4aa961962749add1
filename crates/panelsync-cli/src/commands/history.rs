//! History command - browse past sync runs
//!
//! Reverse-chronological, cursor-paginated. The printed cursor can be
//! passed back via `--cursor` to fetch the next page.

use anyhow::Result;
use clap::Args;

use crate::commands;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Maximum runs to show (capped server-side at 100)
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Continuation cursor from a previous invocation
    #[arg(long)]
    pub cursor: Option<String>,
}

impl HistoryCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let service = commands::build_service().await?;
        let page = service.history(self.limit, self.cursor.as_deref()).await?;

        if page.runs.is_empty() {
            formatter.success("No sync runs recorded");
            return Ok(());
        }

        formatter.success(&format!("{} run(s)", page.runs.len()));
        for run in &page.runs {
            let finished = run
                .finished_at()
                .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let skipped = run
                .metadata()
                .summary
                .as_ref()
                .map(|s| s.total_skipped())
                .unwrap_or(0);

            formatter.info(&format!(
                "{}  {:16}  {:9}  started {}  finished {}  skipped {}",
                run.id(),
                run.target().to_string(),
                run.status().to_string(),
                run.started_at().format("%Y-%m-%d %H:%M:%S"),
                finished,
                skipped
            ));
        }

        if let Some(cursor) = &page.next_cursor {
            formatter.info(&format!("next page: --cursor {cursor}"));
        }

        formatter.print_json(&serde_json::json!({
            "runs": page.runs,
            "next_cursor": page.next_cursor,
        }));

        Ok(())
    }
}
