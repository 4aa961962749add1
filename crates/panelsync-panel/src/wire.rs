//! Panel API wire formats
//!
//! Raw JSON shapes returned by the panel's listing endpoints, and their
//! conversion into the port-level record types from `panelsync-core`.
//!
//! Every listing endpoint returns:
//!
//! ```json
//! {
//!   "data": [ ... ],
//!   "meta": { "pagination": { "total_pages": 3, "current_page": 1 } }
//! }
//! ```
//!
//! `has_more` is derived exclusively from the panel's own pagination
//! metadata. If the metadata is missing the conversion fails closed with
//! [`PanelError::Protocol`] rather than looping forever or silently
//! stopping after one page.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use panelsync_core::domain::errors::PanelError;
use panelsync_core::domain::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNest, PanelNode, PanelServer,
    PanelServerDatabase, PanelServerLimits, PanelUser,
};
use panelsync_core::domain::run::SyncTarget;
use panelsync_core::ports::panel_provider::Page;

// ============================================================================
// Envelope
// ============================================================================

/// Raw response from a paginated listing endpoint
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    /// Records on this page
    #[serde(default)]
    pub data: Vec<T>,
    /// Pagination metadata (its absence is a protocol error)
    pub meta: Option<Meta>,
}

/// The `meta` envelope around pagination
#[derive(Debug, Deserialize)]
pub struct Meta {
    pub pagination: Option<Pagination>,
}

/// Pagination metadata reported by the panel
#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub total_pages: u32,
    pub current_page: u32,
}

/// Converts a raw listing response into a port-level page
///
/// Fails closed with [`PanelError::Protocol`] when the pagination
/// metadata is missing.
pub fn into_page<T, U>(
    response: ListResponse<T>,
    entity: SyncTarget,
    convert: impl Fn(T) -> U,
) -> Result<Page<U>, PanelError> {
    let pagination = response
        .meta
        .and_then(|m| m.pagination)
        .ok_or_else(|| PanelError::Protocol {
            entity,
            reason: "missing pagination metadata".to_string(),
        })?;

    let has_more = pagination.current_page < pagination.total_pages;

    Ok(Page {
        records: response.data.into_iter().map(convert).collect(),
        has_more,
    })
}

// ============================================================================
// Per-entity wire records
// ============================================================================

/// A location as returned by the panel
#[derive(Debug, Deserialize)]
pub struct WireLocation {
    pub id: i64,
    pub short: String,
    #[serde(default)]
    pub long: Option<String>,
}

impl From<WireLocation> for PanelLocation {
    fn from(w: WireLocation) -> Self {
        PanelLocation {
            id: w.id,
            short: w.short,
            long: w.long,
        }
    }
}

/// A node as returned by the panel
#[derive(Debug, Deserialize)]
pub struct WireNode {
    pub id: i64,
    pub location_id: i64,
    pub name: String,
    pub fqdn: String,
    pub scheme: String,
    pub memory: i64,
    pub disk: i64,
    #[serde(default)]
    pub maintenance_mode: bool,
}

impl From<WireNode> for PanelNode {
    fn from(w: WireNode) -> Self {
        PanelNode {
            id: w.id,
            location_id: w.location_id,
            name: w.name,
            fqdn: w.fqdn,
            scheme: w.scheme,
            memory: w.memory,
            disk: w.disk,
            maintenance_mode: w.maintenance_mode,
        }
    }
}

/// An allocation as returned by the panel (listed per node)
#[derive(Debug, Deserialize)]
pub struct WireAllocation {
    pub id: i64,
    pub ip: String,
    pub port: i64,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub assigned: bool,
}

impl From<WireAllocation> for PanelAllocation {
    fn from(w: WireAllocation) -> Self {
        PanelAllocation {
            id: w.id,
            ip: w.ip,
            port: w.port,
            alias: w.alias,
            assigned: w.assigned,
        }
    }
}

/// A nest as returned by the panel
#[derive(Debug, Deserialize)]
pub struct WireNest {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<WireNest> for PanelNest {
    fn from(w: WireNest) -> Self {
        PanelNest {
            id: w.id,
            name: w.name,
            description: w.description,
        }
    }
}

/// An egg as returned by the panel (listed per nest)
#[derive(Debug, Deserialize)]
pub struct WireEgg {
    pub id: i64,
    pub name: String,
    pub docker_image: String,
}

impl From<WireEgg> for PanelEgg {
    fn from(w: WireEgg) -> Self {
        PanelEgg {
            id: w.id,
            name: w.name,
            docker_image: w.docker_image,
        }
    }
}

/// Server resource limits as returned by the panel
///
/// The panel also reports swap and block-IO weights; the mirror does not
/// track those, so they are accepted and dropped here.
#[derive(Debug, Deserialize)]
pub struct WireServerLimits {
    pub memory: i64,
    pub disk: i64,
    pub cpu: i64,
    #[serde(default)]
    #[allow(dead_code)]
    pub swap: i64,
    #[serde(default)]
    #[allow(dead_code)]
    pub io: i64,
}

/// A server as returned by the panel
#[derive(Debug, Deserialize)]
pub struct WireServer {
    pub id: i64,
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suspended: bool,
    pub user: i64,
    pub node: i64,
    pub egg: i64,
    pub allocation: i64,
    pub limits: WireServerLimits,
}

impl From<WireServer> for PanelServer {
    fn from(w: WireServer) -> Self {
        PanelServer {
            id: w.id,
            uuid: w.uuid,
            name: w.name,
            description: w.description,
            suspended: w.suspended,
            user: w.user,
            node: w.node,
            egg: w.egg,
            allocation: w.allocation,
            limits: PanelServerLimits {
                memory: w.limits.memory,
                disk: w.limits.disk,
                cpu: w.limits.cpu,
            },
        }
    }
}

/// A server database as returned by the panel (listed per server)
#[derive(Debug, Deserialize)]
pub struct WireServerDatabase {
    pub id: i64,
    pub database: String,
    pub username: String,
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_remote() -> String {
    "%".to_string()
}

impl From<WireServerDatabase> for PanelServerDatabase {
    fn from(w: WireServerDatabase) -> Self {
        PanelServerDatabase {
            id: w.id,
            database: w.database,
            username: w.username,
            remote: w.remote,
        }
    }
}

/// A user as returned by the panel
#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub root_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<WireUser> for PanelUser {
    fn from(w: WireUser) -> Self {
        PanelUser {
            id: w.id,
            email: w.email,
            username: w.username,
            first_name: w.first_name,
            last_name: w.last_name,
            root_admin: w.root_admin,
            created_at: w.created_at,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
