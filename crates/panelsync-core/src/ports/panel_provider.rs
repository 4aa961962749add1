//! Panel provider port (driven/secondary port)
//!
//! Interface for paginated, read-only access to the external panel's
//! application API. One listing method per entity type; child-scoped
//! types (allocations, eggs, server databases) take the panel id of
//! their parent resource.
//!
//! ## Design Notes
//!
//! - Methods return the classified [`PanelError`] rather than `anyhow`,
//!   because the run controller's state machine branches on the error
//!   class (unavailable vs. rejected vs. protocol).
//! - `Page::has_more` must be derived from the panel's own pagination
//!   metadata. An implementation that cannot determine it must fail with
//!   `PanelError::Protocol` instead of guessing.
//! - Implementations are stateless between calls apart from credentials.

use crate::domain::errors::PanelError;
use crate::domain::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNest, PanelNode, PanelServer,
    PanelServerDatabase, PanelUser,
};

/// One page of external records
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Records on this page, in the panel's order
    pub records: Vec<T>,
    /// Whether more pages follow (`current_page < total_pages`)
    pub has_more: bool,
}

impl<T> Page<T> {
    /// A final empty page
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            has_more: false,
        }
    }
}

/// Port trait for the external panel's listing endpoints
///
/// Page numbers start at 1 and must be requested in strictly increasing
/// order within one entity type; the panel's pagination cursors depend
/// on this.
#[async_trait::async_trait]
pub trait IPanelProvider: Send + Sync {
    /// Lists locations
    async fn list_locations(&self, page: u32) -> Result<Page<PanelLocation>, PanelError>;

    /// Lists nodes
    async fn list_nodes(&self, page: u32) -> Result<Page<PanelNode>, PanelError>;

    /// Lists the allocations of one node
    async fn list_allocations(
        &self,
        node_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelAllocation>, PanelError>;

    /// Lists nests
    async fn list_nests(&self, page: u32) -> Result<Page<PanelNest>, PanelError>;

    /// Lists the eggs of one nest
    async fn list_eggs(&self, nest_panel_id: i64, page: u32) -> Result<Page<PanelEgg>, PanelError>;

    /// Lists servers
    async fn list_servers(&self, page: u32) -> Result<Page<PanelServer>, PanelError>;

    /// Lists the databases of one server
    async fn list_server_databases(
        &self,
        server_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelServerDatabase>, PanelError>;

    /// Lists users
    async fn list_users(&self, page: u32) -> Result<Page<PanelUser>, PanelError>;
}
