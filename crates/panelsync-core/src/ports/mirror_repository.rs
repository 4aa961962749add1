//! Mirror repository port (driven/secondary port)
//!
//! Persistence interface for the local mirror entities. One wide trait
//! rather than a trait per entity, to avoid proliferating small
//! repository traits; implementations may delegate internally.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, etc.) and don't need domain-level classification; the
//!   upserters fold any failure into a `Skipped` outcome.
//! - `upsert_*` is keyed on the entity's panel id (unique index): insert
//!   on first sighting, update on every subsequent one. Each call is
//!   atomic at the row level; there is no cross-row transaction, by
//!   contract with the page loop's cancellation semantics.
//! - `*_panel_ids` drive the child-scoped listings (allocations per
//!   node, databases per server) in stable ascending order.

use serde::{Deserialize, Serialize};

use crate::domain::mirror::{
    Allocation, Egg, Location, Nest, Node, Server, ServerDatabase, User,
};
use crate::domain::newtypes::Email;

/// Point-in-time aggregate counts of mirrored entities
///
/// Produced transactionally so the counts are mutually consistent, not a
/// torn read across tables mid-write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorCounts {
    pub locations: u64,
    pub nodes: u64,
    pub allocations: u64,
    pub nests: u64,
    pub eggs: u64,
    pub servers: u64,
    pub server_databases: u64,
    pub users: u64,
}

/// Port trait for local mirror persistence
#[async_trait::async_trait]
pub trait IMirrorRepository: Send + Sync {
    // --- Locations ---

    /// Retrieves a location by its panel id
    async fn find_location_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Location>>;

    /// Saves a location (insert or update, keyed on panel id)
    async fn upsert_location(&self, location: &Location) -> anyhow::Result<()>;

    // --- Nodes ---

    /// Retrieves a node by its panel id
    async fn find_node_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Node>>;

    /// Saves a node (insert or update, keyed on panel id)
    async fn upsert_node(&self, node: &Node) -> anyhow::Result<()>;

    /// Panel ids of all mirrored nodes, ascending
    async fn node_panel_ids(&self) -> anyhow::Result<Vec<i64>>;

    // --- Allocations ---

    /// Retrieves an allocation by its panel id
    async fn find_allocation_by_panel_id(
        &self,
        panel_id: i64,
    ) -> anyhow::Result<Option<Allocation>>;

    /// Saves an allocation (insert or update, keyed on panel id)
    async fn upsert_allocation(&self, allocation: &Allocation) -> anyhow::Result<()>;

    // --- Nests and eggs ---

    /// Retrieves a nest by its panel id
    async fn find_nest_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Nest>>;

    /// Saves a nest (insert or update, keyed on panel id)
    async fn upsert_nest(&self, nest: &Nest) -> anyhow::Result<()>;

    /// Retrieves an egg by its panel id
    async fn find_egg_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Egg>>;

    /// Saves an egg (insert or update, keyed on panel id)
    async fn upsert_egg(&self, egg: &Egg) -> anyhow::Result<()>;

    // --- Servers ---

    /// Retrieves a server by its panel id
    async fn find_server_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<Server>>;

    /// Saves a server (insert or update, keyed on panel id)
    async fn upsert_server(&self, server: &Server) -> anyhow::Result<()>;

    /// Panel ids of all mirrored servers, ascending
    async fn server_panel_ids(&self) -> anyhow::Result<Vec<i64>>;

    // --- Server databases ---

    /// Retrieves a server database by its panel id
    async fn find_server_database_by_panel_id(
        &self,
        panel_id: i64,
    ) -> anyhow::Result<Option<ServerDatabase>>;

    /// Saves a server database (insert or update, keyed on panel id)
    async fn upsert_server_database(&self, database: &ServerDatabase) -> anyhow::Result<()>;

    // --- Users ---

    /// Retrieves a user by their panel id
    async fn find_user_by_panel_id(&self, panel_id: i64) -> anyhow::Result<Option<User>>;

    /// Retrieves a user by email (locally-registered accounts may exist
    /// before the panel knows about them)
    async fn find_user_by_email(&self, email: &Email) -> anyhow::Result<Option<User>>;

    /// Saves a user (insert or update, keyed on the local id)
    async fn upsert_user(&self, user: &User) -> anyhow::Result<()>;

    // --- Aggregates ---

    /// Counts all mirrored entities inside a single transaction
    async fn count_entities(&self) -> anyhow::Result<MirrorCounts>;
}
