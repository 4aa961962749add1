//! Integration tests for panel error classification
//!
//! Verifies the HTTP-status-to-PanelError mapping:
//! - 5xx and transport failures -> Unavailable
//! - 4xx -> Rejected carrying the status code
//! - malformed bodies and missing pagination metadata -> Protocol

use std::time::Duration;

use panelsync_core::domain::errors::PanelError;
use panelsync_core::domain::run::SyncTarget;
use panelsync_core::ports::panel_provider::IPanelProvider;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_server_error_maps_to_unavailable() {
    let (server, provider) = common::setup_panel_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/application/users"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = provider.list_users(1).await.unwrap_err();
    assert!(matches!(
        err,
        PanelError::Unavailable { entity, ref reason }
            if entity == SyncTarget::Users && reason.contains("503")
    ));
}

#[tokio::test]
async fn test_client_error_maps_to_rejected_with_status() {
    let (server, provider) = common::setup_panel_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/application/nodes"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = provider.list_nodes(1).await.unwrap_err();
    assert_eq!(
        err,
        PanelError::Rejected {
            entity: SyncTarget::Nodes,
            status: 403
        }
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_rejected() {
    let (server, provider) = common::setup_panel_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/application/servers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = provider.list_servers(1).await.unwrap_err();
    assert!(matches!(err, PanelError::Rejected { status: 401, .. }));
}

#[tokio::test]
async fn test_malformed_body_maps_to_protocol() {
    let (server, provider) = common::setup_panel_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/application/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = provider.list_locations(1).await.unwrap_err();
    assert!(matches!(
        err,
        PanelError::Protocol { entity, .. } if entity == SyncTarget::Locations
    ));
}

#[tokio::test]
async fn test_missing_pagination_metadata_maps_to_protocol() {
    let (server, provider) = common::setup_panel_mock().await;

    // A well-formed body whose meta block is absent: the client must fail
    // closed instead of assuming a single page.
    Mock::given(method("GET"))
        .and(path("/api/application/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "id": 1, "email": "a@x.com", "username": "a" }]
        })))
        .mount(&server)
        .await;

    let err = provider.list_users(1).await.unwrap_err();
    assert!(matches!(
        err,
        PanelError::Protocol { ref reason, .. } if reason.contains("pagination")
    ));
}

#[tokio::test]
async fn test_connection_refused_maps_to_unavailable() {
    // Nothing is listening on this port
    let client = panelsync_panel::PanelClient::new(
        "http://127.0.0.1:1",
        "test-token",
        Duration::from_secs(1),
    );
    let provider = panelsync_panel::PanelApiProvider::new(client, 25);

    let err = provider.list_users(1).await.unwrap_err();
    assert!(matches!(err, PanelError::Unavailable { .. }));
}

#[tokio::test]
async fn test_timeout_maps_to_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/application/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::list_body(serde_json::json!([]), 1, 1))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client =
        panelsync_panel::PanelClient::new(server.uri(), "test-token", Duration::from_millis(100));
    let provider = panelsync_panel::PanelApiProvider::new(client, 25);

    let err = provider.list_users(1).await.unwrap_err();
    assert!(matches!(
        err,
        PanelError::Unavailable { ref reason, .. } if reason.contains("timed out")
    ));
}
