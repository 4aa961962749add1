//! Upserters for servers and their databases

use std::sync::Arc;

use chrono::Utc;

use panelsync_core::domain::merge;
use panelsync_core::domain::panel::{PanelServer, PanelServerDatabase};
use panelsync_core::domain::run::UpsertOutcome;
use panelsync_core::ports::mirror_repository::IMirrorRepository;

use super::skip;

/// Reconciles server records into the mirror
#[derive(Clone)]
pub struct ServerUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl ServerUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one server record
    ///
    /// References to the owning user, node, egg, and allocation are stored
    /// as panel ids; this upserter never touches those entities' tables.
    pub async fn reconcile(&self, record: &PanelServer) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_server_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load server", &e),
        };

        match existing {
            Some(mut server) => {
                merge::apply_panel_server(&mut server, record, now);
                match self.mirror.upsert_server(&server).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update server", &e),
                }
            }
            None => {
                let server = merge::new_server(record, now);
                match self.mirror.upsert_server(&server).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create server", &e),
                }
            }
        }
    }
}

/// Reconciles server database records into the mirror
#[derive(Clone)]
pub struct ServerDatabaseUpserter {
    mirror: Arc<dyn IMirrorRepository>,
}

impl ServerDatabaseUpserter {
    pub fn new(mirror: Arc<dyn IMirrorRepository>) -> Self {
        Self { mirror }
    }

    /// Creates or updates the mirror row for one database of `server_panel_id`
    pub async fn reconcile(
        &self,
        record: &PanelServerDatabase,
        server_panel_id: i64,
    ) -> UpsertOutcome {
        let now = Utc::now();

        let existing = match self.mirror.find_server_database_by_panel_id(record.id).await {
            Ok(existing) => existing,
            Err(e) => return skip(record.id, "load server database", &e),
        };

        match existing {
            Some(mut database) => {
                merge::apply_panel_server_database(&mut database, record, server_panel_id, now);
                match self.mirror.upsert_server_database(&database).await {
                    Ok(()) => UpsertOutcome::Updated,
                    Err(e) => skip(record.id, "update server database", &e),
                }
            }
            None => {
                let database = merge::new_server_database(record, server_panel_id, now);
                match self.mirror.upsert_server_database(&database).await {
                    Ok(()) => UpsertOutcome::Created,
                    Err(e) => skip(record.id, "create server database", &e),
                }
            }
        }
    }
}
