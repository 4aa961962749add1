//! Entity upserters
//!
//! One upserter per mirrored entity type. Each takes one externally-sourced
//! record, resolves the matching mirror row by panel id (users also by
//! email), applies the merge policy from `panelsync-core::domain::merge`,
//! and writes the result back.
//!
//! ## Failure policy
//!
//! A single record's mapping or write failure must not abort the page: it
//! is caught here, logged with the external id, and returned as
//! [`UpsertOutcome::Skipped`], which the run controller accumulates into
//! the run's error list. One malformed upstream record must not block the
//! sync of thousands of good ones.
//!
//! No upserter writes outside its own entity's table.

mod infrastructure;
mod servers;
mod users;

pub use infrastructure::{
    AllocationUpserter, EggUpserter, LocationUpserter, NestUpserter, NodeUpserter,
};
pub use servers::{ServerDatabaseUpserter, ServerUpserter};
pub use users::UserUpserter;

use panelsync_core::domain::run::UpsertOutcome;
use tracing::warn;

/// Converts a caught per-record failure into a Skipped outcome
///
/// Logged here so every skip carries the external id, whatever the caller
/// does with the outcome.
pub(crate) fn skip(panel_id: i64, action: &str, err: &dyn std::fmt::Display) -> UpsertOutcome {
    let reason = format!("{action}: {err}");
    warn!(panel_id, %reason, "Skipping record");
    UpsertOutcome::Skipped(reason)
}
