//! Field merge policy: panel-owned vs. locally-owned
//!
//! Every mirror entity has two kinds of fields:
//!
//! - **Panel-owned** - truth always comes from the external panel and is
//!   overwritten on every sync (names, references, limits, status flags).
//! - **Locally-owned** - this system alone manages them and a sync must
//!   never overwrite or null them: `password_hash` and `is_migrated` on
//!   [`User`], the local `id` on every entity, and `last_synced_at`
//!   (stamped here, never taken from the panel).
//!
//! The split is expressed as one `new_*` / `apply_panel_*` function pair
//! per entity type, so the policy is testable in isolation from the write
//! path: `apply_panel_*` touches exactly the panel-owned fields and the
//! sync stamp, nothing else.

use chrono::{DateTime, Utc};

use super::errors::DomainError;
use super::mirror::{Allocation, Egg, Location, Nest, Node, Server, ServerDatabase, User};
use super::newtypes::{Email, MirrorId};
use super::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNest, PanelNode, PanelServer,
    PanelServerDatabase, PanelUser,
};

// ============================================================================
// Location
// ============================================================================

/// Builds a new mirror row for a location seen for the first time
pub fn new_location(rec: &PanelLocation, now: DateTime<Utc>) -> Location {
    Location {
        id: MirrorId::new(),
        panel_id: rec.id,
        short_code: rec.short.clone(),
        description: rec.long.clone(),
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing location row
pub fn apply_panel_location(local: &mut Location, rec: &PanelLocation, now: DateTime<Utc>) {
    local.short_code = rec.short.clone();
    local.description = rec.long.clone();
    local.last_synced_at = now;
}

// ============================================================================
// Node
// ============================================================================

/// Builds a new mirror row for a node seen for the first time
pub fn new_node(rec: &PanelNode, now: DateTime<Utc>) -> Node {
    Node {
        id: MirrorId::new(),
        panel_id: rec.id,
        location_panel_id: rec.location_id,
        name: rec.name.clone(),
        fqdn: rec.fqdn.clone(),
        scheme: rec.scheme.clone(),
        memory_mb: rec.memory,
        disk_mb: rec.disk,
        maintenance_mode: rec.maintenance_mode,
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing node row
pub fn apply_panel_node(local: &mut Node, rec: &PanelNode, now: DateTime<Utc>) {
    local.location_panel_id = rec.location_id;
    local.name = rec.name.clone();
    local.fqdn = rec.fqdn.clone();
    local.scheme = rec.scheme.clone();
    local.memory_mb = rec.memory;
    local.disk_mb = rec.disk;
    local.maintenance_mode = rec.maintenance_mode;
    local.last_synced_at = now;
}

// ============================================================================
// Allocation
// ============================================================================

/// Builds a new mirror row for an allocation seen for the first time
///
/// Allocations are listed through their node, so the node's panel id is
/// supplied by the caller rather than read off the record.
pub fn new_allocation(rec: &PanelAllocation, node_panel_id: i64, now: DateTime<Utc>) -> Allocation {
    Allocation {
        id: MirrorId::new(),
        panel_id: rec.id,
        node_panel_id,
        ip: rec.ip.clone(),
        port: rec.port,
        alias: rec.alias.clone(),
        assigned: rec.assigned,
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing allocation row
pub fn apply_panel_allocation(
    local: &mut Allocation,
    rec: &PanelAllocation,
    node_panel_id: i64,
    now: DateTime<Utc>,
) {
    local.node_panel_id = node_panel_id;
    local.ip = rec.ip.clone();
    local.port = rec.port;
    local.alias = rec.alias.clone();
    local.assigned = rec.assigned;
    local.last_synced_at = now;
}

// ============================================================================
// Nest / Egg
// ============================================================================

/// Builds a new mirror row for a nest seen for the first time
pub fn new_nest(rec: &PanelNest, now: DateTime<Utc>) -> Nest {
    Nest {
        id: MirrorId::new(),
        panel_id: rec.id,
        name: rec.name.clone(),
        description: rec.description.clone(),
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing nest row
pub fn apply_panel_nest(local: &mut Nest, rec: &PanelNest, now: DateTime<Utc>) {
    local.name = rec.name.clone();
    local.description = rec.description.clone();
    local.last_synced_at = now;
}

/// Builds a new mirror row for an egg seen for the first time
pub fn new_egg(rec: &PanelEgg, nest_panel_id: i64, now: DateTime<Utc>) -> Egg {
    Egg {
        id: MirrorId::new(),
        panel_id: rec.id,
        nest_panel_id,
        name: rec.name.clone(),
        docker_image: rec.docker_image.clone(),
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing egg row
pub fn apply_panel_egg(local: &mut Egg, rec: &PanelEgg, nest_panel_id: i64, now: DateTime<Utc>) {
    local.nest_panel_id = nest_panel_id;
    local.name = rec.name.clone();
    local.docker_image = rec.docker_image.clone();
    local.last_synced_at = now;
}

// ============================================================================
// Server
// ============================================================================

/// Builds a new mirror row for a server seen for the first time
pub fn new_server(rec: &PanelServer, now: DateTime<Utc>) -> Server {
    Server {
        id: MirrorId::new(),
        panel_id: rec.id,
        uuid: rec.uuid.clone(),
        name: rec.name.clone(),
        description: rec.description.clone(),
        suspended: rec.suspended,
        owner_panel_id: rec.user,
        node_panel_id: rec.node,
        egg_panel_id: rec.egg,
        allocation_panel_id: rec.allocation,
        memory_mb: rec.limits.memory,
        disk_mb: rec.limits.disk,
        cpu_pct: rec.limits.cpu,
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing server row
pub fn apply_panel_server(local: &mut Server, rec: &PanelServer, now: DateTime<Utc>) {
    local.uuid = rec.uuid.clone();
    local.name = rec.name.clone();
    local.description = rec.description.clone();
    local.suspended = rec.suspended;
    local.owner_panel_id = rec.user;
    local.node_panel_id = rec.node;
    local.egg_panel_id = rec.egg;
    local.allocation_panel_id = rec.allocation;
    local.memory_mb = rec.limits.memory;
    local.disk_mb = rec.limits.disk;
    local.cpu_pct = rec.limits.cpu;
    local.last_synced_at = now;
}

// ============================================================================
// ServerDatabase
// ============================================================================

/// Builds a new mirror row for a server database seen for the first time
pub fn new_server_database(
    rec: &PanelServerDatabase,
    server_panel_id: i64,
    now: DateTime<Utc>,
) -> ServerDatabase {
    ServerDatabase {
        id: MirrorId::new(),
        panel_id: rec.id,
        server_panel_id,
        database_name: rec.database.clone(),
        username: rec.username.clone(),
        remote_host: rec.remote.clone(),
        last_synced_at: now,
    }
}

/// Refreshes the panel-owned fields of an existing server database row
pub fn apply_panel_server_database(
    local: &mut ServerDatabase,
    rec: &PanelServerDatabase,
    server_panel_id: i64,
    now: DateTime<Utc>,
) {
    local.server_panel_id = server_panel_id;
    local.database_name = rec.database.clone();
    local.username = rec.username.clone();
    local.remote_host = rec.remote.clone();
    local.last_synced_at = now;
}

// ============================================================================
// User
// ============================================================================

/// Builds a new local account for a panel user with no local match
///
/// The account starts with no password and `is_migrated = false`; it is
/// not usable for password login until the registration flow completes it.
pub fn new_user(rec: &PanelUser, now: DateTime<Utc>) -> Result<User, DomainError> {
    let email = Email::new(rec.email.clone())?;
    Ok(User {
        id: MirrorId::new(),
        panel_id: Some(rec.id),
        email,
        username: rec.username.clone(),
        first_name: rec.first_name.clone(),
        last_name: rec.last_name.clone(),
        root_admin: rec.root_admin,
        password_hash: None,
        is_migrated: false,
        last_synced_at: Some(now),
        created_at: rec.created_at.unwrap_or(now),
    })
}

/// Refreshes the panel-owned fields of an existing user row
///
/// Sets the panel id if the row was matched by email and had none yet.
/// `password_hash` and `is_migrated` are deliberately untouched.
pub fn apply_panel_user(
    local: &mut User,
    rec: &PanelUser,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    local.panel_id = Some(rec.id);
    local.email = Email::new(rec.email.clone())?;
    local.username = rec.username.clone();
    local.first_name = rec.first_name.clone();
    local.last_name = rec.last_name.clone();
    local.root_admin = rec.root_admin;
    local.last_synced_at = Some(now);
    Ok(())
}
