//! Panelsync Engine - Reconciliation use cases
//!
//! Orchestrates synchronization of the local mirror against the external
//! panel through the ports defined in `panelsync-core`:
//!
//! 1. The [`controller::SyncRunController`] claims the single Running slot,
//!    drives paginated listing to completion for one entity type, polls the
//!    cancellation flag at page boundaries, and finalizes the run exactly
//!    once.
//! 2. The [`sequencer::FullSyncSequencer`] composes the phases of a full
//!    sync in dependency order and reports per-phase outcomes.
//! 3. The [`upsert`] module holds one upserter per entity type; a single
//!    record's failure becomes a `Skipped` outcome, never a run abort.
//! 4. The [`service::SyncService`] is the operator-facing surface:
//!    enqueue-and-return, cancel, status, history.

pub mod controller;
pub mod sequencer;
pub mod service;
pub mod upsert;

pub use controller::SyncRunController;
pub use sequencer::FullSyncSequencer;
pub use service::{StatusReport, SyncService};
