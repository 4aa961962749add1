//! External panel records
//!
//! Typed, read-only representations of the records the external panel
//! returns from its listing endpoints. These are not owned by this system;
//! the engine only ever reads them and maps them into mirror entities.
//! The numeric `id` on every record is the join key to the local mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical location grouping nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelLocation {
    pub id: i64,
    /// Short code, e.g. "us-east"
    pub short: String,
    /// Optional human-readable description
    pub long: Option<String>,
}

/// A daemon host that runs game servers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelNode {
    pub id: i64,
    pub location_id: i64,
    pub name: String,
    pub fqdn: String,
    /// "http" or "https"
    pub scheme: String,
    /// Memory capacity in MiB
    pub memory: i64,
    /// Disk capacity in MiB
    pub disk: i64,
    pub maintenance_mode: bool,
}

/// A network allocation (ip:port) on a node
///
/// Allocations are listed through their owning node; the node's panel id
/// is carried by the caller, not by the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelAllocation {
    pub id: i64,
    pub ip: String,
    pub port: i64,
    pub alias: Option<String>,
    /// Whether a server currently occupies this allocation
    pub assigned: bool,
}

/// A nest: a family of service eggs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelNest {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// An egg: a service template inside a nest
///
/// Eggs are listed through their owning nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelEgg {
    pub id: i64,
    pub name: String,
    pub docker_image: String,
}

/// Resource limits attached to a server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelServerLimits {
    /// Memory limit in MiB
    pub memory: i64,
    /// Disk limit in MiB
    pub disk: i64,
    /// CPU limit in percent (100 = one core)
    pub cpu: i64,
}

/// A provisioned game server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelServer {
    pub id: i64,
    /// The panel's long server UUID
    pub uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub suspended: bool,
    /// Panel id of the owning user
    pub user: i64,
    /// Panel id of the hosting node
    pub node: i64,
    /// Panel id of the egg this server runs
    pub egg: i64,
    /// Panel id of the primary allocation
    pub allocation: i64,
    pub limits: PanelServerLimits,
}

/// A database provisioned for a server
///
/// Databases are listed through their owning server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelServerDatabase {
    pub id: i64,
    pub database: String,
    pub username: String,
    /// Allowed connection host pattern (often "%")
    pub remote: String,
}

/// A panel user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub root_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}
