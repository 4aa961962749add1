//! Domain error types
//!
//! This module defines the classified errors the engine's state machine
//! branches on: validation failures, panel (remote API) failures, and
//! sync-log control-flow errors.

use thiserror::Error;

use super::newtypes::RunId;
use super::run::SyncTarget;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Errors raised by the panel client, classified for the run state machine
///
/// All three variants are whole-phase fatal: the run controller stops the
/// current entity type and finalizes the run (or phase, in a full sync) as
/// `Failed`. Single-record problems never surface here; they are absorbed
/// by the upserters as `Skipped` outcomes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PanelError {
    /// Transient failure: network error, timeout, or a 5xx response
    #[error("Panel unavailable while listing {entity}: {reason}")]
    Unavailable {
        /// The entity type being listed when the failure occurred
        entity: SyncTarget,
        /// Underlying transport or status description
        reason: String,
    },

    /// The panel rejected the request (4xx) - bad credentials or bad request
    #[error("Panel rejected the {entity} listing request (HTTP {status})")]
    Rejected {
        /// The entity type being listed when the rejection occurred
        entity: SyncTarget,
        /// The HTTP status code, surfaced verbatim to the operator
        status: u16,
    },

    /// The response body did not match the expected shape
    ///
    /// Also raised when pagination metadata is missing: the client fails
    /// closed rather than looping forever or silently stopping after one
    /// page.
    #[error("Unexpected panel response while listing {entity}: {reason}")]
    Protocol {
        /// The entity type being listed
        entity: SyncTarget,
        /// What was wrong with the response
        reason: String,
    },
}

impl PanelError {
    /// The entity type that was being listed when this error occurred
    pub fn entity(&self) -> SyncTarget {
        match self {
            PanelError::Unavailable { entity, .. }
            | PanelError::Rejected { entity, .. }
            | PanelError::Protocol { entity, .. } => *entity,
        }
    }
}

/// Control-flow errors on the sync log store's state machine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncLogError {
    /// A Running row already exists; a new run cannot start
    #[error("A sync run is already in progress")]
    SyncAlreadyInProgress,

    /// A cancel was requested but nothing is running
    #[error("No sync run is currently in progress")]
    NoRunInProgress,

    /// `finalize` was called on a run that already reached a terminal status
    #[error("Sync run {0} is already finalized")]
    AlreadyFinalized(RunId),

    /// The referenced run does not exist
    #[error("Sync run {0} not found")]
    RunNotFound(RunId),

    /// Adapter-level storage failure (connection, query, serialization)
    #[error("Sync log storage error: {0}")]
    Storage(String),
}
