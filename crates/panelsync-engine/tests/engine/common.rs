//! Shared test harness: scripted panel stub plus real SQLite stores

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use panelsync_core::domain::errors::PanelError;
use panelsync_core::domain::newtypes::RunId;
use panelsync_core::domain::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNest, PanelNode, PanelServer,
    PanelServerDatabase, PanelServerLimits, PanelUser,
};
use panelsync_core::domain::run::SyncTarget;
use panelsync_core::ports::panel_provider::{IPanelProvider, Page};
use panelsync_core::ports::sync_log::ISyncLogStore;
use panelsync_engine::SyncRunController;
use panelsync_store::{DatabasePool, SqliteMirrorRepository, SqliteSyncLogStore};

// ============================================================================
// Scripted panel stub
// ============================================================================

/// An in-process `IPanelProvider` serving pre-scripted pages
///
/// Entity data is a list of pages; child-scoped entities are keyed by
/// their parent's panel id. Every fetch is recorded so tests can assert
/// on exact page access patterns. Optionally, one entity type can be
/// scripted to fail, and a cancel hook can flag a run on the sync log
/// store during a fetch (to exercise cooperative cancellation without
/// real concurrency races).
#[derive(Default)]
pub struct StubPanel {
    pub locations: Vec<Vec<PanelLocation>>,
    pub nodes: Vec<Vec<PanelNode>>,
    pub allocations: HashMap<i64, Vec<Vec<PanelAllocation>>>,
    pub nests: Vec<Vec<PanelNest>>,
    pub eggs: HashMap<i64, Vec<Vec<PanelEgg>>>,
    pub servers: Vec<Vec<PanelServer>>,
    pub databases: HashMap<i64, Vec<Vec<PanelServerDatabase>>>,
    pub users: Vec<Vec<PanelUser>>,
    /// When set, every fetch for this target fails with the given error
    pub fail: Option<(SyncTarget, PanelError)>,
    pub fetches: Mutex<Vec<(SyncTarget, u32)>>,
    pub cancel_hook: Mutex<Option<(Arc<dyn ISyncLogStore>, RunId)>>,
}

impl StubPanel {
    /// Every (target, page) fetch issued so far, in order
    pub fn fetches(&self) -> Vec<(SyncTarget, u32)> {
        self.fetches.lock().unwrap().clone()
    }

    /// Fetches for one target only, in order
    pub fn fetches_for(&self, target: SyncTarget) -> Vec<u32> {
        self.fetches()
            .into_iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, page)| page)
            .collect()
    }

    /// Arms the cancel hook: the next fetches flag `run_id` for
    /// cancellation on the given store before serving their page
    pub fn cancel_during_fetch(&self, log: Arc<dyn ISyncLogStore>, run_id: RunId) {
        *self.cancel_hook.lock().unwrap() = Some((log, run_id));
    }

    async fn on_fetch(&self, target: SyncTarget, page: u32) -> Result<(), PanelError> {
        self.fetches.lock().unwrap().push((target, page));

        let hook = self.cancel_hook.lock().unwrap().clone();
        if let Some((log, run_id)) = hook {
            log.request_cancel(&run_id).await.ok();
        }

        if let Some((fail_target, err)) = &self.fail {
            if *fail_target == target {
                return Err(err.clone());
            }
        }
        Ok(())
    }
}

fn page_of<T: Clone>(pages: &[Vec<T>], page: u32) -> Page<T> {
    if pages.is_empty() {
        return Page::empty();
    }
    let records = pages.get((page - 1) as usize).cloned().unwrap_or_default();
    Page {
        records,
        has_more: (page as usize) < pages.len(),
    }
}

#[async_trait::async_trait]
impl IPanelProvider for StubPanel {
    async fn list_locations(&self, page: u32) -> Result<Page<PanelLocation>, PanelError> {
        self.on_fetch(SyncTarget::Locations, page).await?;
        Ok(page_of(&self.locations, page))
    }

    async fn list_nodes(&self, page: u32) -> Result<Page<PanelNode>, PanelError> {
        self.on_fetch(SyncTarget::Nodes, page).await?;
        Ok(page_of(&self.nodes, page))
    }

    async fn list_allocations(
        &self,
        node_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelAllocation>, PanelError> {
        self.on_fetch(SyncTarget::Allocations, page).await?;
        let pages = self
            .allocations
            .get(&node_panel_id)
            .map(|p| p.as_slice())
            .unwrap_or(&[]);
        Ok(page_of(pages, page))
    }

    async fn list_nests(&self, page: u32) -> Result<Page<PanelNest>, PanelError> {
        self.on_fetch(SyncTarget::NestsAndEggs, page).await?;
        Ok(page_of(&self.nests, page))
    }

    async fn list_eggs(
        &self,
        nest_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelEgg>, PanelError> {
        self.on_fetch(SyncTarget::NestsAndEggs, page).await?;
        let pages = self
            .eggs
            .get(&nest_panel_id)
            .map(|p| p.as_slice())
            .unwrap_or(&[]);
        Ok(page_of(pages, page))
    }

    async fn list_servers(&self, page: u32) -> Result<Page<PanelServer>, PanelError> {
        self.on_fetch(SyncTarget::Servers, page).await?;
        Ok(page_of(&self.servers, page))
    }

    async fn list_server_databases(
        &self,
        server_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelServerDatabase>, PanelError> {
        self.on_fetch(SyncTarget::ServerDatabases, page).await?;
        let pages = self
            .databases
            .get(&server_panel_id)
            .map(|p| p.as_slice())
            .unwrap_or(&[]);
        Ok(page_of(pages, page))
    }

    async fn list_users(&self, page: u32) -> Result<Page<PanelUser>, PanelError> {
        self.on_fetch(SyncTarget::Users, page).await?;
        Ok(page_of(&self.users, page))
    }
}

// ============================================================================
// Record builders
// ============================================================================

pub fn user(id: i64, email: &str) -> PanelUser {
    PanelUser {
        id,
        email: email.to_string(),
        username: format!("user{id}"),
        first_name: None,
        last_name: None,
        root_admin: false,
        created_at: None,
    }
}

pub fn location(id: i64, short: &str) -> PanelLocation {
    PanelLocation {
        id,
        short: short.to_string(),
        long: None,
    }
}

pub fn node(id: i64, location_id: i64) -> PanelNode {
    PanelNode {
        id,
        location_id,
        name: format!("node-{id:02}"),
        fqdn: format!("node{id:02}.stellae.test"),
        scheme: "https".to_string(),
        memory: 65536,
        disk: 512000,
        maintenance_mode: false,
    }
}

pub fn allocation(id: i64, port: i64) -> PanelAllocation {
    PanelAllocation {
        id,
        ip: "203.0.113.10".to_string(),
        port,
        alias: None,
        assigned: false,
    }
}

pub fn nest(id: i64, name: &str) -> PanelNest {
    PanelNest {
        id,
        name: name.to_string(),
        description: None,
    }
}

pub fn egg(id: i64, name: &str) -> PanelEgg {
    PanelEgg {
        id,
        name: name.to_string(),
        docker_image: "ghcr.io/yolks/java:17".to_string(),
    }
}

pub fn server(id: i64, owner: i64, node: i64, egg: i64, alloc: i64) -> PanelServer {
    PanelServer {
        id,
        uuid: format!("00000000-0000-0000-0000-{id:012}"),
        name: format!("srv-{id}"),
        description: None,
        suspended: false,
        user: owner,
        node,
        egg,
        allocation: alloc,
        limits: PanelServerLimits {
            memory: 4096,
            disk: 10240,
            cpu: 200,
        },
    }
}

pub fn database(id: i64, name: &str) -> PanelServerDatabase {
    PanelServerDatabase {
        id,
        database: name.to_string(),
        username: format!("u{id}"),
        remote: "%".to_string(),
    }
}

// ============================================================================
// Harness
// ============================================================================

/// The engine wired to a scripted panel and fresh in-memory stores
pub struct Harness {
    pub panel: Arc<StubPanel>,
    pub mirror: Arc<SqliteMirrorRepository>,
    pub log: Arc<SqliteSyncLogStore>,
    pub controller: SyncRunController,
}

/// Builds a harness around the given scripted panel
pub async fn harness(stub: StubPanel) -> Harness {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    let mirror = Arc::new(SqliteMirrorRepository::new(pool.pool().clone()));
    let log = Arc::new(SqliteSyncLogStore::new(
        pool.pool().clone(),
        Duration::from_secs(3600),
    ));
    let panel = Arc::new(stub);

    let controller = SyncRunController::new(
        Arc::clone(&panel) as Arc<dyn IPanelProvider>,
        Arc::clone(&mirror) as Arc<dyn panelsync_core::ports::mirror_repository::IMirrorRepository>,
        Arc::clone(&log) as Arc<dyn ISyncLogStore>,
    );

    Harness {
        panel,
        mirror,
        log,
        controller,
    }
}
