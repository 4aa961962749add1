//! Sync log store port (driven/secondary port)
//!
//! Durable record of sync runs: status, timing, target, cancellation flag
//! and finalized summary, queryable for history and for the "is anything
//! running" check.
//!
//! ## Design Notes
//!
//! - `start_run` is the single-flight gate. Implementations must make the
//!   claim atomic at the store (unique-constraint-backed insert or
//!   conditional write), never a read-then-write in application code:
//!   two concurrent starts must resolve to exactly one `SyncRun` and one
//!   `SyncAlreadyInProgress`.
//! - `finalize` is a one-time terminal transition guarded on the row
//!   still being Running; a second call observes `AlreadyFinalized`.
//! - History pagination is keyset-based on `(started_at, id)` with an
//!   opaque cursor, reverse-chronological.

use crate::domain::errors::SyncLogError;
use crate::domain::newtypes::RunId;
use crate::domain::run::{RunStatus, SyncRun, SyncSummary, SyncTarget};

/// Hard cap on `list_recent` page size, bounding response size
pub const HISTORY_LIMIT_MAX: u32 = 100;

/// One page of run history
#[derive(Debug, Clone)]
pub struct RunPage {
    /// Runs in reverse-chronological order
    pub runs: Vec<SyncRun>,
    /// Cursor for the next page; None when this is the last page
    pub next_cursor: Option<String>,
}

/// Port trait for the durable sync run log
#[async_trait::async_trait]
pub trait ISyncLogStore: Send + Sync {
    /// Atomically claims the single Running slot and records a new run
    ///
    /// Fails with [`SyncLogError::SyncAlreadyInProgress`] if a Running row
    /// exists; no new row is created in that case.
    async fn start_run(&self, target: SyncTarget) -> Result<SyncRun, SyncLogError>;

    /// Sets `cancel_requested` on the given run
    ///
    /// Fails with [`SyncLogError::NoRunInProgress`] if that run is not
    /// (or no longer) Running. Idempotent while the run is Running.
    async fn request_cancel(&self, run_id: &RunId) -> Result<(), SyncLogError>;

    /// Reads the cancellation flag; polled by the controller between pages
    async fn is_cancel_requested(&self, run_id: &RunId) -> Result<bool, SyncLogError>;

    /// One-time terminal transition with the finalized summary
    ///
    /// `status` must be terminal. Fails with
    /// [`SyncLogError::AlreadyFinalized`] if the run already left Running.
    async fn finalize(
        &self,
        run_id: &RunId,
        status: RunStatus,
        summary: SyncSummary,
    ) -> Result<(), SyncLogError>;

    /// Returns the Running run, if any
    async fn current_run(&self) -> Result<Option<SyncRun>, SyncLogError>;

    /// Retrieves a run by id
    async fn get_run(&self, run_id: &RunId) -> Result<Option<SyncRun>, SyncLogError>;

    /// Reverse-chronological run history, cursor-paginated
    ///
    /// `limit` is clamped to [`HISTORY_LIMIT_MAX`].
    async fn list_recent(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RunPage, SyncLogError>;
}
