#![allow(clippy::unwrap_used)]
// Integration tests for `NetboxClient` using wiremock.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topolab_api::types::DeviceFilter;
use topolab_api::{Error, NetboxClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NetboxClient) {
    let server = MockServer::start().await;
    let client = NetboxClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

fn page(count: u64, results: serde_json::Value) -> serde_json::Value {
    json!({ "count": count, "next": null, "previous": null, "results": results })
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_token_header_is_sent() {
    let server = MockServer::start().await;
    let token: secrecy::SecretString = "0123456789abcdef".to_string().into();
    let client =
        NetboxClient::from_token(&server.uri(), &token, &TransportConfig::default()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/7/"))
        .and(header("authorization", "Token 0123456789abcdef"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "cr1-eqiad",
            "role": {"id": 1, "slug": "cr"},
            "status": {"value": "active", "label": "Active"}
        })))
        .mount(&server)
        .await;

    let device = client.get_device(7).await.unwrap();
    assert_eq!(device.name.as_deref(), Some("cr1-eqiad"));
    assert_eq!(device.role_slug(), Some("cr"));
}

#[tokio::test]
async fn test_forbidden_maps_to_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"detail": "Invalid token"})),
        )
        .mount(&server)
        .await;

    let result = client.list_devices(&DeviceFilter::default()).await;
    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "Invalid token"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

// ── Listing & pagination ────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices_passes_filters() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .and(query_param("role", "cr"))
        .and(query_param("status", "active"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            1,
            json!([{ "id": 1, "name": "cr1", "role": {"id": 1, "slug": "cr"} }]),
        )))
        .mount(&server)
        .await;

    let filter = DeviceFilter {
        roles: vec!["cr".into()],
        statuses: vec!["active".into()],
        names: vec![],
    };
    let devices = client.list_devices(&filter).await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, 1);
}

#[tokio::test]
async fn test_interfaces_are_paginated() {
    let (server, client) = setup().await;
    let client = client.with_page_size(2);

    let iface = |id: u64, name: &str| {
        json!({
            "id": id,
            "device": {"id": 1, "name": "cr1"},
            "name": name,
            "type": {"value": "10gbase-x-sfpp"}
        })
    };

    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            3,
            json!([iface(10, "xe-0/0/0"), iface(11, "xe-0/0/1")]),
        )))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/"))
        .and(query_param("offset", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page(3, json!([iface(12, "ae0")]))),
        )
        .mount(&server)
        .await;

    let interfaces = client.list_interfaces(1).await.unwrap();
    let names: Vec<&str> = interfaces.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["xe-0/0/0", "xe-0/0/1", "ae0"]);
}

#[tokio::test]
async fn test_subnet_addresses() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/ip-addresses/"))
        .and(query_param("parent", "192.0.2.0/31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            2,
            json!([
                {
                    "id": 100,
                    "address": "192.0.2.0/31",
                    "assigned_object_type": "dcim.interface",
                    "assigned_object_id": 20,
                    "assigned_object": {"id": 20, "name": "et-0/0/0", "device": {"id": 2, "name": "r2"}}
                },
                {
                    "id": 101,
                    "address": "192.0.2.1/31",
                    "assigned_object_type": "dcim.interface",
                    "assigned_object_id": 10
                }
            ]),
        )))
        .mount(&server)
        .await;

    let addrs = client.list_ip_addresses_in("192.0.2.0/31").await.unwrap();
    assert_eq!(addrs.len(), 2);
    assert_eq!(
        addrs[0]
            .assigned_object
            .as_ref()
            .and_then(|o| o.device.as_ref())
            .map(|d| d.id),
        Some(2)
    );
}

// ── Error mapping ───────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/circuits/circuits/99/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let err = client.get_circuit(99).await.unwrap_err();
    assert!(
        matches!(err, Error::NotFound { resource: "circuit", id: 99 }),
        "unexpected error: {err:?}"
    );
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/rear-ports/5/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.get_rear_port(5).await.unwrap_err();
    match err {
        Error::Deserialization { body, .. } => assert!(body.contains("maintenance")),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/ipam/fhrp-groups/"))
        .respond_with(ResponseTemplate::new(503).set_body_string(""))
        .mount(&server)
        .await;

    let err = client.list_fhrp_groups().await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 503, .. }));
    assert!(err.is_transient());
}
