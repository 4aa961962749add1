//! CLI subcommands

pub mod cancel;
pub mod history;
pub mod status;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use panelsync_core::config::Config;
use panelsync_engine::SyncService;
use panelsync_panel::PanelApiProvider;
use panelsync_store::{DatabasePool, SqliteMirrorRepository, SqliteSyncLogStore};

/// Loads configuration and wires the sync service from its adapters
///
/// Every subcommand goes through here: config file, SQLite pool (with
/// migrations), panel HTTP provider, and the two stores.
pub async fn build_service() -> Result<SyncService> {
    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);
    info!(config_path = %config_path.display(), "Loaded configuration");

    let pool = DatabasePool::new(&config.database.path)
        .await
        .context("Failed to open database")?;

    let panel = Arc::new(PanelApiProvider::from_config(&config.panel));
    let mirror = Arc::new(SqliteMirrorRepository::new(pool.pool().clone()));
    let log = Arc::new(SqliteSyncLogStore::new(
        pool.pool().clone(),
        Duration::from_secs(config.sync.stale_run_after_secs),
    ));

    Ok(SyncService::new(panel, mirror, log))
}
