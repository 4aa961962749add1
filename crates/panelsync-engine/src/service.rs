//! Operator-facing sync service
//!
//! The contract consumed by the thin route layer and the CLI:
//!
//! - **start**: claim the Running slot and return the run id immediately;
//!   the run itself executes as background work on the runtime, so the
//!   triggering request is never held open for the run's duration.
//! - **cancel**: idempotent flagging of the current Running run.
//! - **status**: the current run (if any) plus aggregate mirror counts.
//! - **history**: cursor-paginated past runs.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::error;

use panelsync_core::domain::errors::SyncLogError;
use panelsync_core::domain::newtypes::RunId;
use panelsync_core::domain::run::{SyncRun, SyncTarget};
use panelsync_core::ports::mirror_repository::{IMirrorRepository, MirrorCounts};
use panelsync_core::ports::panel_provider::IPanelProvider;
use panelsync_core::ports::sync_log::{ISyncLogStore, RunPage};

use crate::controller::SyncRunController;

/// Current run plus aggregate mirror counts, as shown to an operator
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// The Running run, if any
    pub current_run: Option<SyncRun>,
    /// Point-in-time mirrored entity counts
    pub counts: MirrorCounts,
}

/// Operator-facing facade over the run controller and stores
pub struct SyncService {
    controller: Arc<SyncRunController>,
    mirror: Arc<dyn IMirrorRepository>,
    log: Arc<dyn ISyncLogStore>,
}

impl SyncService {
    /// Wires a service from the three adapters
    pub fn new(
        panel: Arc<dyn IPanelProvider>,
        mirror: Arc<dyn IMirrorRepository>,
        log: Arc<dyn ISyncLogStore>,
    ) -> Self {
        let controller = Arc::new(SyncRunController::new(
            panel,
            Arc::clone(&mirror),
            Arc::clone(&log),
        ));
        Self {
            controller,
            mirror,
            log,
        }
    }

    /// Claims a run and executes it in the background
    ///
    /// Returns the claimed run immediately; progress is observed via
    /// [`status`](Self::status) and [`history`](Self::history). Fails with
    /// `SyncAlreadyInProgress` without creating a row when a run is
    /// already Running.
    pub async fn start_sync(&self, target: SyncTarget) -> Result<SyncRun, SyncLogError> {
        let run = self.controller.start(target).await?;

        let controller = Arc::clone(&self.controller);
        let background = run.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.execute(&background).await {
                // The run row, if any, already carries its terminal state;
                // this only covers log-store failures during finalize.
                error!(run_id = %background.id(), error = %e, "Background sync run failed to finalize");
            }
        });

        Ok(run)
    }

    /// Claims a run and waits for it to finish, returning the final state
    ///
    /// Used by the CLI's foreground mode.
    pub async fn run_sync(&self, target: SyncTarget) -> Result<SyncRun, SyncLogError> {
        self.controller.run(target).await
    }

    /// Flags the current Running run for cooperative cancellation
    ///
    /// Returns the flagged run's id, or `NoRunInProgress` when nothing is
    /// running. Idempotent while the run is still Running.
    pub async fn cancel(&self) -> Result<RunId, SyncLogError> {
        let current = self
            .log
            .current_run()
            .await?
            .ok_or(SyncLogError::NoRunInProgress)?;

        let run_id = *current.id();
        self.log.request_cancel(&run_id).await?;
        Ok(run_id)
    }

    /// Returns the current run (if any) plus aggregate mirror counts
    pub async fn status(&self) -> Result<StatusReport> {
        let current_run = self
            .log
            .current_run()
            .await
            .context("Failed to read current run")?;
        let counts = self
            .mirror
            .count_entities()
            .await
            .context("Failed to count mirrored entities")?;

        Ok(StatusReport {
            current_run,
            counts,
        })
    }

    /// Returns one page of run history, newest first
    pub async fn history(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RunPage, SyncLogError> {
        self.log.list_recent(limit, cursor).await
    }

    /// Retrieves a single run by id
    pub async fn get_run(&self, run_id: &RunId) -> Result<Option<SyncRun>, SyncLogError> {
        self.log.get_run(run_id).await
    }
}
