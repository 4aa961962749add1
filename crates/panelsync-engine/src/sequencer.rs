//! Full-sync sequencer
//!
//! Composes the phases of a full sync in the fixed dependency order:
//! locations, nodes, allocations, nests and eggs (infrastructure, because
//! servers reference nodes and eggs and allocations reference nodes),
//! then servers, then server databases, then users.
//!
//! A phase's fatal panel error does not stop later phases - an
//! infrastructure outage should not block user sync - but the aggregate
//! reports fine-grained per-phase outcomes, not a single success flag.
//! An observed cancellation does stop the remaining phases; they are
//! reported as skipped.

use anyhow::Result;
use tracing::{info, warn};

use panelsync_core::domain::newtypes::RunId;
use panelsync_core::domain::run::{
    EntityCounts, PhaseOutcome, RunStatus, SyncSummary, FULL_SYNC_ORDER,
};

use crate::controller::{PhaseControl, SyncRunController};

/// Runs every entity phase of a full sync in dependency order
pub struct FullSyncSequencer<'a> {
    controller: &'a SyncRunController,
}

impl<'a> FullSyncSequencer<'a> {
    /// Creates a sequencer over the given controller
    pub fn new(controller: &'a SyncRunController) -> Self {
        Self { controller }
    }

    /// Runs all phases and resolves the run's overall terminal status
    ///
    /// Overall status precedence: `Cancelled` beats `Failed` beats
    /// `Completed`. The failure message carried on the run is the first
    /// phase failure, in phase order. The caller (the controller) is
    /// responsible for finalizing the run with the returned state.
    pub async fn run_full(&self, run_id: &RunId) -> Result<(RunStatus, SyncSummary)> {
        let mut summary = SyncSummary::default();
        let mut cancelled = false;
        let mut first_failure: Option<String> = None;

        for target in FULL_SYNC_ORDER {
            if cancelled {
                summary.record_phase(target, EntityCounts::default(), PhaseOutcome::Skipped);
                continue;
            }

            let result = self.controller.run_phase(run_id, target).await?;
            match result.control {
                PhaseControl::Done => {
                    info!(
                        phase = %target,
                        created = result.counts.created,
                        updated = result.counts.updated,
                        skipped = result.counts.skipped,
                        "Phase completed"
                    );
                    summary.record_phase(target, result.counts, PhaseOutcome::Completed);
                }
                PhaseControl::Fatal(e) => {
                    // Later phases are still attempted
                    warn!(phase = %target, error = %e, "Phase failed, continuing with remaining phases");
                    if first_failure.is_none() {
                        first_failure = Some(e.to_string());
                    }
                    summary.record_phase(target, result.counts, PhaseOutcome::Failed(e.to_string()));
                }
                PhaseControl::CancelObserved => {
                    info!(phase = %target, "Cancellation observed, skipping remaining phases");
                    cancelled = true;
                    summary.record_phase(target, result.counts, PhaseOutcome::Cancelled);
                }
            }
        }

        let status = if cancelled {
            RunStatus::Cancelled
        } else if let Some(reason) = first_failure {
            RunStatus::Failed(reason)
        } else {
            RunStatus::Completed
        };

        Ok((status, summary))
    }
}
