//! SyncRun domain entity and run bookkeeping types
//!
//! A [`SyncRun`] is one invocation of the reconciliation engine against one
//! or more entity types, tracked end-to-end by a durable sync log row. This
//! module also defines the aggregate result types (`EntityCounts`,
//! `SyncSummary`, `PhaseReport`) and the per-record [`UpsertOutcome`].

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::RunId;

// ============================================================================
// SyncTarget
// ============================================================================

/// Which entity type (or all of them) a run reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTarget {
    Locations,
    Nodes,
    Allocations,
    NestsAndEggs,
    Servers,
    ServerDatabases,
    Users,
    All,
}

/// The fixed phase order of a full sync
///
/// Infrastructure first (servers reference nodes and eggs, allocations
/// reference nodes), then servers and their databases, then users.
pub const FULL_SYNC_ORDER: [SyncTarget; 7] = [
    SyncTarget::Locations,
    SyncTarget::Nodes,
    SyncTarget::Allocations,
    SyncTarget::NestsAndEggs,
    SyncTarget::Servers,
    SyncTarget::ServerDatabases,
    SyncTarget::Users,
];

impl SyncTarget {
    /// Stable snake_case name, used in storage, summaries, and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTarget::Locations => "locations",
            SyncTarget::Nodes => "nodes",
            SyncTarget::Allocations => "allocations",
            SyncTarget::NestsAndEggs => "nests_and_eggs",
            SyncTarget::Servers => "servers",
            SyncTarget::ServerDatabases => "server_databases",
            SyncTarget::Users => "users",
            SyncTarget::All => "all",
        }
    }
}

impl Display for SyncTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SyncTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locations" => Ok(SyncTarget::Locations),
            "nodes" => Ok(SyncTarget::Nodes),
            "allocations" => Ok(SyncTarget::Allocations),
            "nests_and_eggs" => Ok(SyncTarget::NestsAndEggs),
            "servers" => Ok(SyncTarget::Servers),
            "server_databases" => Ok(SyncTarget::ServerDatabases),
            "users" => Ok(SyncTarget::Users),
            "all" => Ok(SyncTarget::All),
            other => Err(DomainError::ValidationFailed(format!(
                "Unknown sync target: {other}"
            ))),
        }
    }
}

// ============================================================================
// RunStatus
// ============================================================================

/// Status of a sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is currently executing
    Running,
    /// Run finished with all pages of all requested targets exhausted
    Completed,
    /// Run stopped on a phase-fatal panel error
    Failed(String),
    /// Run observed a cancel request and stopped at a page boundary
    Cancelled,
}

impl RunStatus {
    /// Returns true if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self, RunStatus::Running)
    }

    /// Returns true if the run has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        !self.is_running()
    }

    /// Returns true if the run completed successfully
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }

    /// Returns true if the run failed
    pub fn is_failed(&self) -> bool {
        matches!(self, RunStatus::Failed(_))
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed(msg) => write!(f, "failed: {}", msg),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ============================================================================
// UpsertOutcome
// ============================================================================

/// Result of reconciling a single external record into the mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new mirror row was created (first sighting of this panel id)
    Created,
    /// An existing mirror row had its panel-owned fields refreshed
    Updated,
    /// The record could not be reconciled; the reason is recorded and the
    /// run continues with the next record
    Skipped(String),
}

// ============================================================================
// Counters and summaries
// ============================================================================

/// A single record that failed to reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordError {
    /// The external panel id of the offending record
    pub panel_id: i64,
    /// Why reconciliation was skipped
    pub message: String,
}

/// Per-entity-type created/updated/skipped counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    /// One entry per skipped record, in processing order
    #[serde(default)]
    pub errors: Vec<RecordError>,
}

impl EntityCounts {
    /// Folds one reconcile outcome into the counters
    pub fn tally(&mut self, panel_id: i64, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created => self.created += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Skipped(message) => {
                self.skipped += 1;
                self.errors.push(RecordError { panel_id, message });
            }
        }
    }

    /// Total records seen
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.skipped
    }
}

/// Outcome of one phase in a full sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// All pages of this phase were processed
    Completed,
    /// The phase stopped on a fatal panel error; later phases still run
    Failed(String),
    /// A cancel request was observed during this phase
    Cancelled,
    /// The phase never ran because an earlier phase observed a cancel
    Skipped,
}

/// One phase's report inside a run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub target: SyncTarget,
    pub outcome: PhaseOutcome,
}

/// Aggregate result of a run, persisted into the sync log on finalize
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Counters keyed by target name (`SyncTarget::as_str`)
    #[serde(default)]
    pub counts: BTreeMap<String, EntityCounts>,
    /// Fine-grained per-phase status; one entry for single-target runs,
    /// one per phase for a full sync
    #[serde(default)]
    pub phases: Vec<PhaseReport>,
}

impl SyncSummary {
    /// Records a phase's counters and outcome
    pub fn record_phase(&mut self, target: SyncTarget, counts: EntityCounts, outcome: PhaseOutcome) {
        self.counts.insert(target.as_str().to_string(), counts);
        self.phases.push(PhaseReport { target, outcome });
    }

    /// Total skipped records across all phases
    pub fn total_skipped(&self) -> u64 {
        self.counts.values().map(|c| c.skipped).sum()
    }

    /// Returns the first fatal phase error, if any phase failed
    pub fn first_failure(&self) -> Option<&str> {
        self.phases.iter().find_map(|p| match &p.outcome {
            PhaseOutcome::Failed(msg) => Some(msg.as_str()),
            _ => None,
        })
    }
}

// ============================================================================
// RunMetadata
// ============================================================================

/// Free-form metadata bag attached to a sync log row
///
/// `cancel_requested` is the only field mutated out-of-band (by the cancel
/// action) while the run is in flight; `summary` is written once, on
/// finalize. Unknown keys written by other tools round-trip through `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub cancel_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SyncSummary>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================================================
// SyncRun
// ============================================================================

/// Represents one sync run, as recorded in the sync log
///
/// Created in `Running` status when a run starts; only the cancellation
/// flag is mutated while in flight; transitions to a terminal status
/// exactly once and is immutable afterwards except for historical reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRun {
    /// Unique identifier, stable for the run's lifetime
    id: RunId,
    /// The entity type(s) this run reconciles
    target: SyncTarget,
    /// Current status
    status: RunStatus,
    /// When the run started
    started_at: DateTime<Utc>,
    /// When the run reached a terminal status (None while running)
    finished_at: Option<DateTime<Utc>>,
    /// Cancellation flag and finalized summary
    metadata: RunMetadata,
}

impl SyncRun {
    /// Creates a new run in Running status
    pub fn new(target: SyncTarget) -> Self {
        Self {
            id: RunId::new(),
            target,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            metadata: RunMetadata::default(),
        }
    }

    /// Reconstitutes a run from stored parts
    pub fn from_parts(
        id: RunId,
        target: SyncTarget,
        status: RunStatus,
        started_at: DateTime<Utc>,
        finished_at: Option<DateTime<Utc>>,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            id,
            target,
            status,
            started_at,
            finished_at,
            metadata,
        }
    }

    // --- Getters ---

    /// Returns the run's unique identifier
    pub fn id(&self) -> &RunId {
        &self.id
    }

    /// Returns the run's target
    pub fn target(&self) -> SyncTarget {
        self.target
    }

    /// Returns the current status
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Returns when the run started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run finished, if terminal
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns the metadata bag
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Returns true if the run is still in progress
    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    /// Returns true if a cancel has been requested for this run
    pub fn cancel_requested(&self) -> bool {
        self.metadata.cancel_requested
    }

    /// Wall-clock duration of the run (so far, if still running)
    pub fn duration(&self) -> chrono::Duration {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        end - self.started_at
    }

    // --- Mutators ---

    /// Flags this run for cooperative cancellation
    pub fn request_cancel(&mut self) {
        self.metadata.cancel_requested = true;
    }

    /// Marks the run as completed with its summary
    pub fn complete(&mut self, summary: SyncSummary) {
        self.status = RunStatus::Completed;
        self.metadata.summary = Some(summary);
        self.finished_at = Some(Utc::now());
    }

    /// Marks the run as failed with a reason and partial summary
    pub fn fail(&mut self, reason: impl Into<String>, summary: SyncSummary) {
        self.status = RunStatus::Failed(reason.into());
        self.metadata.summary = Some(summary);
        self.finished_at = Some(Utc::now());
    }

    /// Marks the run as cancelled, preserving partial counts
    pub fn cancel(&mut self, summary: SyncSummary) {
        self.status = RunStatus::Cancelled;
        self.metadata.summary = Some(summary);
        self.finished_at = Some(Utc::now());
    }
}
