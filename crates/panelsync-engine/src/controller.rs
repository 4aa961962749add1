//! Sync run controller
//!
//! Drives one logical sync run end to end:
//!
//! 1. **Claim**: [`SyncRunController::start`] asks the sync log store for
//!    the single Running slot; a concurrent run surfaces as
//!    `SyncAlreadyInProgress` and no row is created.
//! 2. **Work loop**: for each entity type, pages are fetched in strictly
//!    increasing order and every record is handed to the matching
//!    upserter. After each page - including the last - the run's
//!    cancellation flag is re-read from the store.
//! 3. **Finalize**: exactly one terminal transition, durably recorded
//!    before control returns: `Completed` when all pages are exhausted,
//!    `Failed` on a fatal panel error, `Cancelled` when the flag was
//!    observed.
//!
//! Cancellation is cooperative and page-granular: the in-flight page
//! always completes before the check, and no record writes are rolled
//! back.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use panelsync_core::domain::errors::{PanelError, SyncLogError};
use panelsync_core::domain::newtypes::RunId;
use panelsync_core::domain::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNode, PanelServer, PanelServerDatabase,
    PanelUser,
};
use panelsync_core::domain::run::{
    EntityCounts, PhaseOutcome, RunStatus, SyncRun, SyncSummary, SyncTarget, UpsertOutcome,
};
use panelsync_core::ports::mirror_repository::IMirrorRepository;
use panelsync_core::ports::panel_provider::{IPanelProvider, Page};
use panelsync_core::ports::sync_log::ISyncLogStore;

use crate::sequencer::FullSyncSequencer;
use crate::upsert::{
    AllocationUpserter, EggUpserter, LocationUpserter, NestUpserter, NodeUpserter,
    ServerDatabaseUpserter, ServerUpserter, UserUpserter,
};

// ============================================================================
// Phase control flow
// ============================================================================

/// How one phase's page loop ended
#[derive(Debug)]
pub(crate) enum PhaseControl {
    /// All pages exhausted
    Done,
    /// A fatal panel error stopped the phase
    Fatal(PanelError),
    /// The cancellation flag was observed at a page boundary
    CancelObserved,
}

/// One phase's counters plus how its loop ended
#[derive(Debug)]
pub(crate) struct PhaseResult {
    pub counts: EntityCounts,
    pub control: PhaseControl,
}

/// Maps a single-target phase result onto the run's terminal status
fn resolve_single(target: SyncTarget, result: PhaseResult) -> (RunStatus, SyncSummary) {
    let mut summary = SyncSummary::default();
    let (status, outcome) = match result.control {
        PhaseControl::Done => (RunStatus::Completed, PhaseOutcome::Completed),
        PhaseControl::Fatal(e) => (
            RunStatus::Failed(e.to_string()),
            PhaseOutcome::Failed(e.to_string()),
        ),
        PhaseControl::CancelObserved => (RunStatus::Cancelled, PhaseOutcome::Cancelled),
    };
    summary.record_phase(target, result.counts, outcome);
    (status, summary)
}

// ============================================================================
// SyncRunController
// ============================================================================

/// Orchestrates one sync run across one or more entity types
///
/// ## Dependencies
///
/// - `panel`: paginated listing access to the external panel
/// - `mirror`: local mirror persistence (used by the upserters, and to
///   enumerate parents for child-scoped listings)
/// - `log`: durable run log holding the single-flight slot and the
///   cancellation flag
pub struct SyncRunController {
    panel: Arc<dyn IPanelProvider>,
    mirror: Arc<dyn IMirrorRepository>,
    log: Arc<dyn ISyncLogStore>,
}

impl SyncRunController {
    /// Creates a new controller with the given adapters
    pub fn new(
        panel: Arc<dyn IPanelProvider>,
        mirror: Arc<dyn IMirrorRepository>,
        log: Arc<dyn ISyncLogStore>,
    ) -> Self {
        Self { panel, mirror, log }
    }

    /// Claims the single Running slot and records a new run
    ///
    /// Fails with [`SyncLogError::SyncAlreadyInProgress`] when another run
    /// holds the slot; no log row is created in that case.
    pub async fn start(&self, target: SyncTarget) -> Result<SyncRun, SyncLogError> {
        self.log.start_run(target).await
    }

    /// Executes a previously claimed run to its terminal status
    ///
    /// The terminal state is durably recorded via the log store before this
    /// returns; the finalized run is read back and returned.
    pub async fn execute(&self, run: &SyncRun) -> Result<SyncRun, SyncLogError> {
        let run_id = *run.id();
        let target = run.target();
        info!(run_id = %run_id, target = %target, "Sync run starting");

        let outcome = match target {
            SyncTarget::All => FullSyncSequencer::new(self).run_full(&run_id).await,
            single => self.run_single(&run_id, single).await,
        };

        let (status, summary) = match outcome {
            Ok((status, summary)) => (status, summary),
            Err(err) => {
                // Infrastructure failure (store unreachable mid-run);
                // distinct from the classified panel errors, but the run
                // still terminates as failed.
                let chain = format!("{err:#}");
                error!(run_id = %run_id, error = %chain, "Sync run aborted");
                (RunStatus::Failed(chain), SyncSummary::default())
            }
        };

        self.log.finalize(&run_id, status.clone(), summary).await?;

        info!(run_id = %run_id, status = %status, "Sync run finalized");

        self.log
            .get_run(&run_id)
            .await?
            .ok_or(SyncLogError::RunNotFound(run_id))
    }

    /// Claims and executes a run in one call
    pub async fn run(&self, target: SyncTarget) -> Result<SyncRun, SyncLogError> {
        let run = self.start(target).await?;
        self.execute(&run).await
    }

    /// Runs a single-target sync and resolves its terminal status
    async fn run_single(
        &self,
        run_id: &RunId,
        target: SyncTarget,
    ) -> Result<(RunStatus, SyncSummary)> {
        let result = self.run_phase(run_id, target).await?;
        Ok(resolve_single(target, result))
    }

    /// Runs one phase (one entity type) of a sync
    pub(crate) async fn run_phase(
        &self,
        run_id: &RunId,
        target: SyncTarget,
    ) -> Result<PhaseResult> {
        match target {
            SyncTarget::Locations => self.sync_locations(run_id).await,
            SyncTarget::Nodes => self.sync_nodes(run_id).await,
            SyncTarget::Allocations => self.sync_allocations(run_id).await,
            SyncTarget::NestsAndEggs => self.sync_nests_and_eggs(run_id).await,
            SyncTarget::Servers => self.sync_servers(run_id).await,
            SyncTarget::ServerDatabases => self.sync_server_databases(run_id).await,
            SyncTarget::Users => self.sync_users(run_id).await,
            SyncTarget::All => Err(anyhow::anyhow!(
                "the full-sync target is driven by the sequencer, not a single phase"
            )),
        }
    }

    // ========================================================================
    // Page loop
    // ========================================================================

    /// Reads the run's cancellation flag from the store
    async fn check_cancel(&self, run_id: &RunId) -> Result<bool> {
        self.log
            .is_cancel_requested(run_id)
            .await
            .context("Failed to read cancellation flag")
    }

    /// Drives one paginated listing to completion
    ///
    /// Fetches pages 1..n in order, reconciles every record, and re-reads
    /// the cancellation flag after each page. The in-flight page always
    /// completes before the cancellation check, and the check runs after
    /// the final page too, so a cancel requested during the last page
    /// still converges to `Cancelled` rather than `Completed`.
    async fn drive_pages<R, F, FFut, Rec, RecFut>(
        &self,
        run_id: &RunId,
        fetch: F,
        reconcile: Rec,
        counts: &mut EntityCounts,
    ) -> Result<PhaseControl>
    where
        F: Fn(u32) -> FFut,
        FFut: Future<Output = std::result::Result<Page<R>, PanelError>>,
        Rec: Fn(R) -> RecFut,
        RecFut: Future<Output = (i64, UpsertOutcome)>,
    {
        let mut page_no: u32 = 1;
        loop {
            let page = match fetch(page_no).await {
                Ok(page) => page,
                Err(e) => return Ok(PhaseControl::Fatal(e)),
            };

            debug!(page = page_no, records = page.records.len(), "Processing page");

            for record in page.records {
                let (panel_id, outcome) = reconcile(record).await;
                counts.tally(panel_id, outcome);
            }

            if self.check_cancel(run_id).await? {
                return Ok(PhaseControl::CancelObserved);
            }

            if !page.has_more {
                return Ok(PhaseControl::Done);
            }
            page_no += 1;
        }
    }

    // ========================================================================
    // Per-entity phases
    // ========================================================================

    async fn sync_locations(&self, run_id: &RunId) -> Result<PhaseResult> {
        let upserter = LocationUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let panel = Arc::clone(&self.panel);
        let fetch = move |page| {
            let panel = Arc::clone(&panel);
            async move { panel.list_locations(page).await }
        };
        let reconcile = move |record: PanelLocation| {
            let upserter = upserter.clone();
            async move { (record.id, upserter.reconcile(&record).await) }
        };

        let control = self.drive_pages(run_id, fetch, reconcile, &mut counts).await?;
        Ok(PhaseResult { counts, control })
    }

    async fn sync_nodes(&self, run_id: &RunId) -> Result<PhaseResult> {
        let upserter = NodeUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let panel = Arc::clone(&self.panel);
        let fetch = move |page| {
            let panel = Arc::clone(&panel);
            async move { panel.list_nodes(page).await }
        };
        let reconcile = move |record: PanelNode| {
            let upserter = upserter.clone();
            async move { (record.id, upserter.reconcile(&record).await) }
        };

        let control = self.drive_pages(run_id, fetch, reconcile, &mut counts).await?;
        Ok(PhaseResult { counts, control })
    }

    /// Allocations are listed through their owning node, so this phase
    /// iterates the mirrored nodes; running Nodes first is what makes a
    /// targeted allocation sync meaningful.
    async fn sync_allocations(&self, run_id: &RunId) -> Result<PhaseResult> {
        let upserter = AllocationUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let node_ids = self
            .mirror
            .node_panel_ids()
            .await
            .context("Failed to enumerate mirrored nodes")?;
        debug!(nodes = node_ids.len(), "Syncing allocations per node");

        for node_id in node_ids {
            let panel = Arc::clone(&self.panel);
            let fetch = move |page| {
                let panel = Arc::clone(&panel);
                async move { panel.list_allocations(node_id, page).await }
            };
            let upserter_for_node = upserter.clone();
            let reconcile = move |record: PanelAllocation| {
                let upserter = upserter_for_node.clone();
                async move { (record.id, upserter.reconcile(&record, node_id).await) }
            };

            let control = self
                .drive_pages(run_id, fetch, reconcile, &mut counts)
                .await?;
            if !matches!(control, PhaseControl::Done) {
                return Ok(PhaseResult { counts, control });
            }
        }

        Ok(PhaseResult {
            counts,
            control: PhaseControl::Done,
        })
    }

    /// Nests and their eggs are one phase: each page of nests is
    /// reconciled, then the eggs of those nests are paged before moving
    /// on. Cancellation is still observed at every page boundary, outer
    /// and inner.
    async fn sync_nests_and_eggs(&self, run_id: &RunId) -> Result<PhaseResult> {
        let nest_upserter = NestUpserter::new(Arc::clone(&self.mirror));
        let egg_upserter = EggUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let mut page_no: u32 = 1;
        loop {
            let page = match self.panel.list_nests(page_no).await {
                Ok(page) => page,
                Err(e) => {
                    return Ok(PhaseResult {
                        counts,
                        control: PhaseControl::Fatal(e),
                    })
                }
            };

            let mut mirrored_nests = Vec::new();
            for record in &page.records {
                let outcome = nest_upserter.reconcile(record).await;
                // A nest that failed to reconcile has no mirror row for
                // its eggs to reference; skip its egg listing this run.
                if !matches!(outcome, UpsertOutcome::Skipped(_)) {
                    mirrored_nests.push(record.id);
                }
                counts.tally(record.id, outcome);
            }

            if self.check_cancel(run_id).await? {
                return Ok(PhaseResult {
                    counts,
                    control: PhaseControl::CancelObserved,
                });
            }

            for nest_id in mirrored_nests {
                let panel = Arc::clone(&self.panel);
                let fetch = move |page| {
                    let panel = Arc::clone(&panel);
                    async move { panel.list_eggs(nest_id, page).await }
                };
                let upserter_for_nest = egg_upserter.clone();
                let reconcile = move |record: PanelEgg| {
                    let upserter = upserter_for_nest.clone();
                    async move { (record.id, upserter.reconcile(&record, nest_id).await) }
                };

                let control = self
                    .drive_pages(run_id, fetch, reconcile, &mut counts)
                    .await?;
                if !matches!(control, PhaseControl::Done) {
                    return Ok(PhaseResult { counts, control });
                }
            }

            if !page.has_more {
                break;
            }
            page_no += 1;
        }

        Ok(PhaseResult {
            counts,
            control: PhaseControl::Done,
        })
    }

    async fn sync_servers(&self, run_id: &RunId) -> Result<PhaseResult> {
        let upserter = ServerUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let panel = Arc::clone(&self.panel);
        let fetch = move |page| {
            let panel = Arc::clone(&panel);
            async move { panel.list_servers(page).await }
        };
        let reconcile = move |record: PanelServer| {
            let upserter = upserter.clone();
            async move { (record.id, upserter.reconcile(&record).await) }
        };

        let control = self.drive_pages(run_id, fetch, reconcile, &mut counts).await?;
        Ok(PhaseResult { counts, control })
    }

    /// Server databases are listed through their owning server, so this
    /// phase iterates the mirrored servers.
    async fn sync_server_databases(&self, run_id: &RunId) -> Result<PhaseResult> {
        let upserter = ServerDatabaseUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let server_ids = self
            .mirror
            .server_panel_ids()
            .await
            .context("Failed to enumerate mirrored servers")?;
        debug!(servers = server_ids.len(), "Syncing databases per server");

        for server_id in server_ids {
            let panel = Arc::clone(&self.panel);
            let fetch = move |page| {
                let panel = Arc::clone(&panel);
                async move { panel.list_server_databases(server_id, page).await }
            };
            let upserter_for_server = upserter.clone();
            let reconcile = move |record: PanelServerDatabase| {
                let upserter = upserter_for_server.clone();
                async move { (record.id, upserter.reconcile(&record, server_id).await) }
            };

            let control = self
                .drive_pages(run_id, fetch, reconcile, &mut counts)
                .await?;
            if !matches!(control, PhaseControl::Done) {
                return Ok(PhaseResult { counts, control });
            }
        }

        Ok(PhaseResult {
            counts,
            control: PhaseControl::Done,
        })
    }

    async fn sync_users(&self, run_id: &RunId) -> Result<PhaseResult> {
        let upserter = UserUpserter::new(Arc::clone(&self.mirror));
        let mut counts = EntityCounts::default();

        let panel = Arc::clone(&self.panel);
        let fetch = move |page| {
            let panel = Arc::clone(&panel);
            async move { panel.list_users(page).await }
        };
        let reconcile = move |record: PanelUser| {
            let upserter = upserter.clone();
            async move { (record.id, upserter.reconcile(&record).await) }
        };

        let control = self.drive_pages(run_id, fetch, reconcile, &mut counts).await?;
        Ok(PhaseResult { counts, control })
    }
}
