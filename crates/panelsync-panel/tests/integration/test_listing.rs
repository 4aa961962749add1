//! Integration tests for the listing endpoints
//!
//! Verifies end-to-end behavior against a wiremock panel:
//! - field mapping for each entity type
//! - `has_more` derivation from pagination metadata
//! - per-page query parameters (page, per_page)
//! - child-scoped endpoints (allocations per node, eggs per nest,
//!   databases per server)

use panelsync_core::ports::panel_provider::IPanelProvider;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TEST_PAGE_SIZE};

#[tokio::test]
async fn test_list_users_single_page() {
    let (server, provider) = common::setup_panel_mock().await;

    let data = serde_json::json!([
        {
            "id": 501,
            "email": "a@x.com",
            "username": "a",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "root_admin": true,
            "created_at": "2026-01-15T10:00:00Z"
        },
        { "id": 502, "email": "b@x.com", "username": "b" }
    ]);
    common::mount_list_page(&server, "/api/application/users", 1, 1, data).await;

    let page = provider.list_users(1).await.expect("Listing users failed");

    assert_eq!(page.records.len(), 2);
    assert!(!page.has_more);

    let ada = &page.records[0];
    assert_eq!(ada.id, 501);
    assert_eq!(ada.email, "a@x.com");
    assert_eq!(ada.first_name.as_deref(), Some("Ada"));
    assert!(ada.root_admin);

    let b = &page.records[1];
    assert_eq!(b.id, 502);
    assert!(b.first_name.is_none());
    assert!(!b.root_admin);
}

#[tokio::test]
async fn test_list_users_reports_more_pages() {
    let (server, provider) = common::setup_panel_mock().await;

    common::mount_list_page(
        &server,
        "/api/application/users",
        1,
        3,
        serde_json::json!([{ "id": 1, "email": "a@x.com", "username": "a" }]),
    )
    .await;

    let page = provider.list_users(1).await.unwrap();
    assert!(page.has_more);
}

#[tokio::test]
async fn test_page_size_sent_as_per_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/application/locations"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", TEST_PAGE_SIZE.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::list_body(serde_json::json!([]), 2, 2)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = panelsync_panel::PanelClient::new(
        server.uri(),
        "test-token",
        std::time::Duration::from_secs(5),
    );
    let provider = panelsync_panel::PanelApiProvider::new(client, TEST_PAGE_SIZE);

    let page = provider.list_locations(2).await.unwrap();
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_list_nodes_field_mapping() {
    let (server, provider) = common::setup_panel_mock().await;

    let data = serde_json::json!([
        {
            "id": 2,
            "location_id": 7,
            "name": "node-01",
            "fqdn": "node01.stellae.test",
            "scheme": "https",
            "memory": 65536,
            "disk": 512000,
            "maintenance_mode": false
        }
    ]);
    common::mount_list_page(&server, "/api/application/nodes", 1, 1, data).await;

    let page = provider.list_nodes(1).await.unwrap();
    let node = &page.records[0];

    assert_eq!(node.id, 2);
    assert_eq!(node.location_id, 7);
    assert_eq!(node.fqdn, "node01.stellae.test");
    assert_eq!(node.scheme, "https");
    assert_eq!(node.memory, 65536);
    assert!(!node.maintenance_mode);
}

#[tokio::test]
async fn test_list_allocations_scoped_to_node() {
    let (server, provider) = common::setup_panel_mock().await;

    let data = serde_json::json!([
        { "id": 14, "ip": "203.0.113.10", "port": 25565, "alias": "mc.stellae.test", "assigned": true },
        { "id": 15, "ip": "203.0.113.10", "port": 25566, "assigned": false }
    ]);
    common::mount_list_page(&server, "/api/application/nodes/2/allocations", 1, 1, data).await;

    let page = provider.list_allocations(2, 1).await.unwrap();

    assert_eq!(page.records.len(), 2);
    assert_eq!(page.records[0].alias.as_deref(), Some("mc.stellae.test"));
    assert!(page.records[0].assigned);
    assert!(!page.records[1].assigned);
}

#[tokio::test]
async fn test_list_nests_and_eggs() {
    let (server, provider) = common::setup_panel_mock().await;

    common::mount_list_page(
        &server,
        "/api/application/nests",
        1,
        1,
        serde_json::json!([{ "id": 4, "name": "Minecraft", "description": "Minecraft servers" }]),
    )
    .await;
    common::mount_list_page(
        &server,
        "/api/application/nests/4/eggs",
        1,
        1,
        serde_json::json!([
            { "id": 9, "name": "Paper", "docker_image": "ghcr.io/yolks/java:17" }
        ]),
    )
    .await;

    let nests = provider.list_nests(1).await.unwrap();
    assert_eq!(nests.records[0].name, "Minecraft");

    let eggs = provider.list_eggs(4, 1).await.unwrap();
    assert_eq!(eggs.records[0].docker_image, "ghcr.io/yolks/java:17");
}

#[tokio::test]
async fn test_list_servers_with_limits() {
    let (server, provider) = common::setup_panel_mock().await;

    let data = serde_json::json!([
        {
            "id": 3,
            "uuid": "d290f1ee-6c54-4b01-90e6-d701748f0851",
            "name": "mc-1",
            "description": "Ada's server",
            "suspended": false,
            "user": 501,
            "node": 2,
            "egg": 9,
            "allocation": 14,
            "limits": { "memory": 4096, "swap": 0, "disk": 10240, "io": 500, "cpu": 200 }
        }
    ]);
    common::mount_list_page(&server, "/api/application/servers", 1, 1, data).await;

    let page = provider.list_servers(1).await.unwrap();
    let srv = &page.records[0];

    assert_eq!(srv.uuid, "d290f1ee-6c54-4b01-90e6-d701748f0851");
    assert_eq!(srv.user, 501);
    assert_eq!(srv.limits.memory, 4096);
    assert_eq!(srv.limits.cpu, 200);
}

#[tokio::test]
async fn test_list_server_databases_scoped_to_server() {
    let (server, provider) = common::setup_panel_mock().await;

    common::mount_list_page(
        &server,
        "/api/application/servers/3/databases",
        1,
        1,
        serde_json::json!([
            { "id": 11, "database": "s3_minecraft", "username": "u3", "remote": "%" }
        ]),
    )
    .await;

    let page = provider.list_server_databases(3, 1).await.unwrap();
    assert_eq!(page.records[0].database, "s3_minecraft");
    assert_eq!(page.records[0].remote, "%");
}

#[tokio::test]
async fn test_empty_listing() {
    let (server, provider) = common::setup_panel_mock().await;

    common::mount_list_page(&server, "/api/application/locations", 1, 1, serde_json::json!([]))
        .await;

    let page = provider.list_locations(1).await.unwrap();
    assert!(page.records.is_empty());
    assert!(!page.has_more);
}
