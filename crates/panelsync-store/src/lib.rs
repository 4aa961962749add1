//! Panelsync Store - Local state persistence
//!
//! SQLite-based storage for:
//! - The local mirror of panel entities (one table per entity type,
//!   uniquely indexed on the external panel id)
//! - The sync run log (status, timing, cancellation flag, summaries)
//!
//! ## Architecture
//!
//! This crate implements the `IMirrorRepository` and `ISyncLogStore`
//! ports from `panelsync-core` using SQLite as the storage backend. It
//! is a driven (secondary) adapter in the hexagonal architecture.
//!
//! The single-flight invariant lives here, not in application code: the
//! schema carries a partial unique index on `sync_runs(status)` for
//! `status = 'running'`, so concurrent attempts to claim the Running
//! slot are resolved by the database, and the loser observes
//! `SyncAlreadyInProgress`.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - connection pool with migration support
//! - [`SqliteMirrorRepository`] - full `IMirrorRepository` implementation
//! - [`SqliteSyncLogStore`] - full `ISyncLogStore` implementation
//! - [`StoreError`] - error types for storage operations

pub mod mirror;
pub mod pool;
pub mod sync_log;

pub use mirror::SqliteMirrorRepository;
pub use pool::DatabasePool;
pub use sync_log::SqliteSyncLogStore;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
