//! Port definitions (trait interfaces for adapters)
//!
//! Driven (secondary) ports implemented by the adapter crates:
//! - [`IPanelProvider`] - paginated listing access to the external panel
//! - [`IMirrorRepository`] - persistence for the local mirror entities
//! - [`ISyncLogStore`] - durable sync run log with the single-flight claim

pub mod mirror_repository;
pub mod panel_provider;
pub mod sync_log;

pub use mirror_repository::{IMirrorRepository, MirrorCounts};
pub use panel_provider::{IPanelProvider, Page};
pub use sync_log::{ISyncLogStore, RunPage, HISTORY_LIMIT_MAX};
