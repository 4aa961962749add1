//! SQLite implementation of ISyncLogStore
//!
//! Persists sync runs and enforces the single-flight invariant at the
//! store level: the schema's partial unique index on
//! `sync_runs(status) WHERE status = 'running'` makes the Running-slot
//! claim an atomic INSERT, so two concurrent starts can never both
//! succeed, regardless of what the application layer observed first.
//!
//! ## Status encoding
//!
//! Statuses are stored as plain strings ("running", "completed",
//! "cancelled"); the Failed variant is stored as "failed:<reason>".
//!
//! ## Stale-run reclamation
//!
//! A crash mid-run leaves a Running row behind, which would block all
//! future runs. `start_run` finalizes any Running row older than the
//! configured threshold as failed, inside the claiming transaction.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use panelsync_core::domain::errors::SyncLogError;
use panelsync_core::domain::newtypes::RunId;
use panelsync_core::domain::run::{RunMetadata, RunStatus, SyncRun, SyncSummary, SyncTarget};
use panelsync_core::ports::sync_log::{ISyncLogStore, RunPage, HISTORY_LIMIT_MAX};

use crate::mirror::{fmt_ts, parse_datetime, parse_optional_datetime};
use crate::StoreError;

/// SQLite-based implementation of the sync log store port
pub struct SqliteSyncLogStore {
    pool: SqlitePool,
    /// Running rows older than this are treated as abandoned by a crashed
    /// process and reclaimed on the next start
    stale_run_after: Duration,
}

impl SqliteSyncLogStore {
    /// Creates a new store with the given pool and stale-run threshold
    pub fn new(pool: SqlitePool, stale_run_after: Duration) -> Self {
        Self {
            pool,
            stale_run_after,
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

fn storage(e: impl std::fmt::Display) -> SyncLogError {
    SyncLogError::Storage(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed")
    )
}

/// Serialize a RunStatus to a string for storage
fn run_status_to_string(status: &RunStatus) -> String {
    match status {
        RunStatus::Running => "running".to_string(),
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Cancelled => "cancelled".to_string(),
        RunStatus::Failed(msg) => format!("failed:{}", msg),
    }
}

/// Deserialize a RunStatus from its stored string representation
fn run_status_from_string(s: &str) -> Result<RunStatus, StoreError> {
    match s {
        "running" => Ok(RunStatus::Running),
        "completed" => Ok(RunStatus::Completed),
        "cancelled" => Ok(RunStatus::Cancelled),
        s if s.starts_with("failed:") => Ok(RunStatus::Failed(s[7..].to_string())),
        other => Err(StoreError::SerializationError(format!(
            "Unknown run status: {other}"
        ))),
    }
}

/// Reconstruct a SyncRun from a database row
fn run_from_row(row: &SqliteRow) -> Result<SyncRun, StoreError> {
    let id_str: String = row.get("id");
    let target_str: String = row.get("target");
    let status_str: String = row.get("status");
    let started_at_str: String = row.get("started_at");
    let finished_at_str: Option<String> = row.get("finished_at");
    let metadata_str: String = row.get("metadata");

    let id = RunId::from_str(&id_str)
        .map_err(|e| StoreError::SerializationError(format!("Invalid RunId '{id_str}': {e}")))?;
    let target = SyncTarget::from_str(&target_str).map_err(|e| {
        StoreError::SerializationError(format!("Invalid target '{target_str}': {e}"))
    })?;
    let status = run_status_from_string(&status_str)?;
    let started_at = parse_datetime(&started_at_str)?;
    let finished_at = parse_optional_datetime(finished_at_str)?;
    let metadata: RunMetadata = serde_json::from_str(&metadata_str)
        .map_err(|e| StoreError::SerializationError(format!("Invalid run metadata: {e}")))?;

    Ok(SyncRun::from_parts(
        id,
        target,
        status,
        started_at,
        finished_at,
        metadata,
    ))
}

/// Encodes a history cursor from the keyset position of the last row
fn encode_cursor(run: &SyncRun) -> String {
    format!("{}|{}", fmt_ts(run.started_at()), run.id())
}

/// Decodes a history cursor into its (started_at, id) parts
fn decode_cursor(cursor: &str) -> Result<(String, String), SyncLogError> {
    match cursor.split_once('|') {
        Some((ts, id)) if !ts.is_empty() && !id.is_empty() => {
            Ok((ts.to_string(), id.to_string()))
        }
        _ => Err(SyncLogError::Storage(format!(
            "Invalid history cursor: {cursor}"
        ))),
    }
}

// ============================================================================
// ISyncLogStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ISyncLogStore for SqliteSyncLogStore {
    async fn start_run(&self, target: SyncTarget) -> Result<SyncRun, SyncLogError> {
        let run = SyncRun::new(target);
        let metadata = serde_json::to_string(run.metadata()).map_err(storage)?;

        let mut tx = self.pool.begin().await.map_err(storage)?;

        // Reclaim a Running row abandoned by a crashed process, so the
        // single-flight slot cannot stay wedged forever.
        let stale_cutoff = Utc::now()
            - chrono::Duration::from_std(self.stale_run_after)
                .unwrap_or_else(|_| chrono::Duration::seconds(3600));
        let reclaimed = sqlx::query(
            "UPDATE sync_runs SET status = ?, finished_at = ? \
             WHERE status = 'running' AND started_at < ?",
        )
        .bind(run_status_to_string(&RunStatus::Failed(
            "stale run reclaimed".to_string(),
        )))
        .bind(fmt_ts(Utc::now()))
        .bind(fmt_ts(stale_cutoff))
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if reclaimed.rows_affected() > 0 {
            warn!(
                reclaimed = reclaimed.rows_affected(),
                stale_after_secs = self.stale_run_after.as_secs(),
                "Reclaimed stale running sync run"
            );
        }

        // The atomic claim: the partial unique index on status='running'
        // turns a lost race into a constraint violation here.
        let insert = sqlx::query(
            "INSERT INTO sync_runs (id, target, status, started_at, finished_at, metadata) \
             VALUES (?, ?, 'running', ?, NULL, ?)",
        )
        .bind(run.id().to_string())
        .bind(target.as_str())
        .bind(fmt_ts(run.started_at()))
        .bind(metadata)
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(SyncLogError::SyncAlreadyInProgress);
            }
            Err(e) => return Err(storage(e)),
        }

        tx.commit().await.map_err(storage)?;

        debug!(run_id = %run.id(), target = %target, "Sync run claimed");
        Ok(run)
    }

    async fn request_cancel(&self, run_id: &RunId) -> Result<(), SyncLogError> {
        let row = sqlx::query("SELECT status, metadata FROM sync_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            return Err(SyncLogError::RunNotFound(*run_id));
        };

        let status = run_status_from_string(&row.get::<String, _>("status")).map_err(storage)?;
        if !status.is_running() {
            return Err(SyncLogError::NoRunInProgress);
        }

        let mut metadata: RunMetadata =
            serde_json::from_str(&row.get::<String, _>("metadata")).map_err(storage)?;
        metadata.cancel_requested = true;
        let metadata_json = serde_json::to_string(&metadata).map_err(storage)?;

        let updated = sqlx::query(
            "UPDATE sync_runs SET metadata = ? WHERE id = ? AND status = 'running'",
        )
        .bind(metadata_json)
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        // The run may have finalized between the read and the write
        if updated.rows_affected() == 0 {
            return Err(SyncLogError::NoRunInProgress);
        }

        debug!(run_id = %run_id, "Cancellation requested");
        Ok(())
    }

    async fn is_cancel_requested(&self, run_id: &RunId) -> Result<bool, SyncLogError> {
        let row = sqlx::query("SELECT metadata FROM sync_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            return Err(SyncLogError::RunNotFound(*run_id));
        };

        let metadata: RunMetadata =
            serde_json::from_str(&row.get::<String, _>("metadata")).map_err(storage)?;
        Ok(metadata.cancel_requested)
    }

    async fn finalize(
        &self,
        run_id: &RunId,
        status: RunStatus,
        summary: SyncSummary,
    ) -> Result<(), SyncLogError> {
        if status.is_running() {
            return Err(SyncLogError::Storage(
                "finalize requires a terminal status".to_string(),
            ));
        }

        let row = sqlx::query("SELECT status, metadata FROM sync_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        let Some(row) = row else {
            return Err(SyncLogError::RunNotFound(*run_id));
        };

        let current = run_status_from_string(&row.get::<String, _>("status")).map_err(storage)?;
        if !current.is_running() {
            return Err(SyncLogError::AlreadyFinalized(*run_id));
        }

        // Preserve the cancellation flag and any foreign metadata keys
        let mut metadata: RunMetadata =
            serde_json::from_str(&row.get::<String, _>("metadata")).map_err(storage)?;
        metadata.summary = Some(summary);
        let metadata_json = serde_json::to_string(&metadata).map_err(storage)?;

        // Guarded on status so the terminal transition happens exactly once
        let updated = sqlx::query(
            "UPDATE sync_runs SET status = ?, finished_at = ?, metadata = ? \
             WHERE id = ? AND status = 'running'",
        )
        .bind(run_status_to_string(&status))
        .bind(fmt_ts(Utc::now()))
        .bind(metadata_json)
        .bind(run_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if updated.rows_affected() == 0 {
            return Err(SyncLogError::AlreadyFinalized(*run_id));
        }

        debug!(run_id = %run_id, status = %status, "Sync run finalized");
        Ok(())
    }

    async fn current_run(&self) -> Result<Option<SyncRun>, SyncLogError> {
        let row = sqlx::query("SELECT * FROM sync_runs WHERE status = 'running' LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref()
            .map(run_from_row)
            .transpose()
            .map_err(storage)
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Option<SyncRun>, SyncLogError> {
        let row = sqlx::query("SELECT * FROM sync_runs WHERE id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.as_ref()
            .map(run_from_row)
            .transpose()
            .map_err(storage)
    }

    async fn list_recent(
        &self,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<RunPage, SyncLogError> {
        let limit = limit.clamp(1, HISTORY_LIMIT_MAX);

        // Fetch one extra row to decide whether another page follows
        let rows = match cursor {
            Some(cursor) => {
                let (ts, id) = decode_cursor(cursor)?;
                sqlx::query(
                    "SELECT * FROM sync_runs \
                     WHERE started_at < ? OR (started_at = ? AND id < ?) \
                     ORDER BY started_at DESC, id DESC LIMIT ?",
                )
                .bind(&ts)
                .bind(&ts)
                .bind(&id)
                .bind(i64::from(limit) + 1)
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?
            }
            None => {
                sqlx::query("SELECT * FROM sync_runs ORDER BY started_at DESC, id DESC LIMIT ?")
                    .bind(i64::from(limit) + 1)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(storage)?
            }
        };

        let mut runs = rows
            .iter()
            .map(run_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(storage)?;

        let next_cursor = if runs.len() > limit as usize {
            runs.truncate(limit as usize);
            runs.last().map(encode_cursor)
        } else {
            None
        };

        Ok(RunPage { runs, next_cursor })
    }
}
