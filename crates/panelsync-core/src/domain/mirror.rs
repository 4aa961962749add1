//! Local mirror entities
//!
//! One struct per mirrored panel entity type. Every entity owns a local
//! [`MirrorId`] plus the panel's numeric id (uniquely indexed in storage),
//! a set of panel-owned fields that are overwritten on every sync, and
//! locally-owned fields that a sync must never clobber. The split between
//! the two is enforced by the functions in [`super::merge`], not here.
//!
//! Mirror rows are created on first sighting of an external record and
//! updated on every subsequent sighting. They are never deleted by a sync:
//! absence from a page is not treated as deletion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Email, MirrorId};

/// Mirrored location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: MirrorId,
    pub panel_id: i64,
    pub short_code: String,
    pub description: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: MirrorId,
    pub panel_id: i64,
    /// Panel id of the location this node belongs to
    pub location_panel_id: i64,
    pub name: String,
    pub fqdn: String,
    pub scheme: String,
    pub memory_mb: i64,
    pub disk_mb: i64,
    pub maintenance_mode: bool,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: MirrorId,
    pub panel_id: i64,
    /// Panel id of the node this allocation belongs to
    pub node_panel_id: i64,
    pub ip: String,
    pub port: i64,
    pub alias: Option<String>,
    pub assigned: bool,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored nest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nest {
    pub id: MirrorId,
    pub panel_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored egg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Egg {
    pub id: MirrorId,
    pub panel_id: i64,
    /// Panel id of the nest this egg belongs to
    pub nest_panel_id: i64,
    pub name: String,
    pub docker_image: String,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: MirrorId,
    pub panel_id: i64,
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub suspended: bool,
    /// Panel id of the owning user
    pub owner_panel_id: i64,
    /// Panel id of the hosting node
    pub node_panel_id: i64,
    /// Panel id of the egg this server runs
    pub egg_panel_id: i64,
    /// Panel id of the primary allocation
    pub allocation_panel_id: i64,
    pub memory_mb: i64,
    pub disk_mb: i64,
    pub cpu_pct: i64,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored server database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDatabase {
    pub id: MirrorId,
    pub panel_id: i64,
    /// Panel id of the server this database belongs to
    pub server_panel_id: i64,
    pub database_name: String,
    pub username: String,
    pub remote_host: String,
    pub last_synced_at: DateTime<Utc>,
}

/// Mirrored user account
///
/// Users are the one entity type that can exist locally before the panel
/// knows about them (registration flow), which is why `panel_id` is
/// optional here and lookups go by panel id OR email. `password_hash` and
/// `is_migrated` are locally owned: a sync must never overwrite or null
/// them, or accounts get silently logged out or de-migrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: MirrorId,
    pub panel_id: Option<i64>,
    pub email: Email,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub root_admin: bool,
    /// Locally owned; None until the registration flow sets a password
    pub password_hash: Option<String>,
    /// Locally owned onboarding flag
    pub is_migrated: bool,
    /// Locally owned; None until first reconciled from the panel
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
