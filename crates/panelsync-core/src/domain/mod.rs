//! Domain layer - entities, value objects, and pure business rules
//!
//! Everything in this module is I/O-free. The adapter crates map these
//! types to and from their storage and wire representations.

pub mod errors;
pub mod merge;
pub mod mirror;
pub mod newtypes;
pub mod panel;
pub mod run;

pub use errors::{DomainError, PanelError, SyncLogError};
pub use mirror::{Allocation, Egg, Location, Nest, Node, Server, ServerDatabase, User};
pub use run::{
    EntityCounts, PhaseOutcome, PhaseReport, RecordError, RunMetadata, RunStatus, SyncRun,
    SyncSummary, SyncTarget, UpsertOutcome,
};
