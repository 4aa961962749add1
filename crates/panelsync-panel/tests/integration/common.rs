//! Shared test helpers for panel API integration tests
//!
//! Provides wiremock-based mock server setup for the panel's listing
//! endpoints. Each helper mounts a mock endpoint and returns a configured
//! provider pointing at the mock server.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use panelsync_panel::{PanelApiProvider, PanelClient};

/// Page size used by every test provider
pub const TEST_PAGE_SIZE: u32 = 25;

/// Starts a mock server and returns it with a provider pointed at it.
pub async fn setup_panel_mock() -> (MockServer, PanelApiProvider) {
    let server = MockServer::start().await;
    let client = PanelClient::new(server.uri(), "test-token", Duration::from_secs(5));
    let provider = PanelApiProvider::new(client, TEST_PAGE_SIZE);
    (server, provider)
}

/// Builds a listing response body with pagination metadata.
pub fn list_body(
    data: serde_json::Value,
    current_page: u32,
    total_pages: u32,
) -> serde_json::Value {
    serde_json::json!({
        "data": data,
        "meta": {
            "pagination": {
                "total_pages": total_pages,
                "current_page": current_page
            }
        }
    })
}

/// Mounts one page of a listing endpoint, matched on the `page` parameter.
pub async fn mount_list_page(
    server: &MockServer,
    endpoint_path: &str,
    page: u32,
    total_pages: u32,
    data: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(list_body(data, page, total_pages)))
        .mount(server)
        .await;
}
