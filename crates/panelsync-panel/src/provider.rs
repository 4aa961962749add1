//! IPanelProvider implementation over the panel's application API
//!
//! Maps transport and HTTP failures onto the classified [`PanelError`]
//! taxonomy the run controller branches on:
//!
//! | Condition | Error |
//! |---|---|
//! | connect failure, timeout, 5xx | `PanelError::Unavailable` |
//! | any 4xx (bad token, bad request) | `PanelError::Rejected` |
//! | undecodable body, missing pagination | `PanelError::Protocol` |

use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use panelsync_core::config::PanelConfig;
use panelsync_core::domain::errors::PanelError;
use panelsync_core::domain::panel::{
    PanelAllocation, PanelEgg, PanelLocation, PanelNest, PanelNode, PanelServer,
    PanelServerDatabase, PanelUser,
};
use panelsync_core::domain::run::SyncTarget;
use panelsync_core::ports::panel_provider::{IPanelProvider, Page};

use crate::client::PanelClient;
use crate::wire::{
    self, ListResponse, WireAllocation, WireEgg, WireLocation, WireNest, WireNode, WireServer,
    WireServerDatabase, WireUser,
};

/// `IPanelProvider` backed by the panel's HTTP application API
pub struct PanelApiProvider {
    client: PanelClient,
    /// Records requested per page (fixed per client configuration)
    page_size: u32,
}

impl PanelApiProvider {
    /// Creates a provider from an existing client
    pub fn new(client: PanelClient, page_size: u32) -> Self {
        Self { client, page_size }
    }

    /// Creates a provider from the panel configuration section
    pub fn from_config(config: &PanelConfig) -> Self {
        Self::new(PanelClient::from_config(config), config.page_size)
    }

    /// Builds the query string shared by all listing requests
    fn paging(&self, page: u32) -> String {
        format!("page={}&per_page={}", page, self.page_size)
    }

    /// Fetches and decodes one listing page
    ///
    /// The only side effect is the network call; classification of every
    /// failure mode happens here so the per-entity methods stay thin.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        entity: SyncTarget,
        path: &str,
    ) -> Result<ListResponse<T>, PanelError> {
        debug!(entity = %entity, path, "Fetching panel listing page");

        let response = self
            .client
            .request(Method::GET, path)
            .send()
            .await
            .map_err(|e| {
                warn!(entity = %entity, error = %e, "Panel request failed to complete");
                PanelError::Unavailable {
                    entity,
                    reason: if e.is_timeout() {
                        "request timed out".to_string()
                    } else {
                        format!("transport error: {e}")
                    },
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(PanelError::Unavailable {
                entity,
                reason: format!("HTTP {}", status.as_u16()),
            });
        }
        if status.is_client_error() {
            return Err(PanelError::Rejected {
                entity,
                status: status.as_u16(),
            });
        }

        response
            .json::<ListResponse<T>>()
            .await
            .map_err(|e| PanelError::Protocol {
                entity,
                reason: format!("invalid JSON body: {e}"),
            })
    }
}

#[async_trait::async_trait]
impl IPanelProvider for PanelApiProvider {
    async fn list_locations(&self, page: u32) -> Result<Page<PanelLocation>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!("/api/application/locations?{}", self.paging(page));
        let response: ListResponse<WireLocation> =
            self.fetch_list(SyncTarget::Locations, &path).await?;
        wire::into_page(response, SyncTarget::Locations, PanelLocation::from)
    }

    async fn list_nodes(&self, page: u32) -> Result<Page<PanelNode>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!("/api/application/nodes?{}", self.paging(page));
        let response: ListResponse<WireNode> = self.fetch_list(SyncTarget::Nodes, &path).await?;
        wire::into_page(response, SyncTarget::Nodes, PanelNode::from)
    }

    async fn list_allocations(
        &self,
        node_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelAllocation>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!(
            "/api/application/nodes/{}/allocations?{}",
            node_panel_id,
            self.paging(page)
        );
        let response: ListResponse<WireAllocation> =
            self.fetch_list(SyncTarget::Allocations, &path).await?;
        wire::into_page(response, SyncTarget::Allocations, PanelAllocation::from)
    }

    async fn list_nests(&self, page: u32) -> Result<Page<PanelNest>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!("/api/application/nests?{}", self.paging(page));
        let response: ListResponse<WireNest> =
            self.fetch_list(SyncTarget::NestsAndEggs, &path).await?;
        wire::into_page(response, SyncTarget::NestsAndEggs, PanelNest::from)
    }

    async fn list_eggs(&self, nest_panel_id: i64, page: u32) -> Result<Page<PanelEgg>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!(
            "/api/application/nests/{}/eggs?{}",
            nest_panel_id,
            self.paging(page)
        );
        let response: ListResponse<WireEgg> =
            self.fetch_list(SyncTarget::NestsAndEggs, &path).await?;
        wire::into_page(response, SyncTarget::NestsAndEggs, PanelEgg::from)
    }

    async fn list_servers(&self, page: u32) -> Result<Page<PanelServer>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!("/api/application/servers?{}", self.paging(page));
        let response: ListResponse<WireServer> =
            self.fetch_list(SyncTarget::Servers, &path).await?;
        wire::into_page(response, SyncTarget::Servers, PanelServer::from)
    }

    async fn list_server_databases(
        &self,
        server_panel_id: i64,
        page: u32,
    ) -> Result<Page<PanelServerDatabase>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!(
            "/api/application/servers/{}/databases?{}",
            server_panel_id,
            self.paging(page)
        );
        let response: ListResponse<WireServerDatabase> =
            self.fetch_list(SyncTarget::ServerDatabases, &path).await?;
        wire::into_page(response, SyncTarget::ServerDatabases, PanelServerDatabase::from)
    }

    async fn list_users(&self, page: u32) -> Result<Page<PanelUser>, PanelError> {
        debug_assert!(page >= 1, "page numbers start at 1");
        let path = format!("/api/application/users?{}", self.paging(page));
        let response: ListResponse<WireUser> = self.fetch_list(SyncTarget::Users, &path).await?;
        wire::into_page(response, SyncTarget::Users, PanelUser::from)
    }
}
