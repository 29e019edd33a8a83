#![allow(clippy::unwrap_used)]
// Prefetch against a mock NetBox, then resolve the fetched snapshot.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use topolab_api::NetboxClient;
use topolab_core::{CoreError, FetchConfig, Inventory, ResolveConfig, fetch_snapshot, resolve};

// ── Helpers ─────────────────────────────────────────────────────────

fn page(results: serde_json::Value) -> serde_json::Value {
    let count = results.as_array().map_or(0, Vec::len);
    json!({ "count": count, "next": null, "previous": null, "results": results })
}

async fn mount_list(server: &MockServer, route: &str, results: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(results)))
        .mount(server)
        .await;
}

async fn mount_filtered(
    server: &MockServer,
    route: &str,
    key: &str,
    value: &str,
    results: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param(key, value))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(results)))
        .mount(server)
        .await;
}

fn device(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "role": {"id": 1, "slug": "cr"},
        "status": {"value": "active"}
    })
}

fn interface(id: u64, device_id: u64, device: &str) -> serde_json::Value {
    json!({
        "id": id,
        "device": {"id": device_id, "name": device},
        "name": "et-0/0/0",
        "type": {"value": "100gbase-x-qsfp28"},
        "count_ipaddresses": 1
    })
}

fn address(id: u64, cidr: &str, interface_id: u64) -> serde_json::Value {
    json!({
        "id": id,
        "address": cidr,
        "assigned_object_type": "dcim.interface",
        "assigned_object_id": interface_id
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_then_resolve_point_to_point() {
    let server = MockServer::start().await;
    let client = NetboxClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();

    mount_list(
        &server,
        "/api/dcim/devices/",
        json!([device(1, "r1"), device(2, "r2")]),
    )
    .await;
    mount_list(&server, "/api/ipam/fhrp-groups/", json!([])).await;
    mount_list(&server, "/api/ipam/fhrp-group-assignments/", json!([])).await;

    mount_filtered(&server, "/api/dcim/interfaces/", "device_id", "1", json!([interface(10, 1, "r1")])).await;
    mount_filtered(&server, "/api/dcim/interfaces/", "device_id", "2", json!([interface(20, 2, "r2")])).await;

    let r1_addr = address(100, "192.0.2.1/31", 10);
    let r2_addr = address(200, "192.0.2.0/31", 20);
    mount_filtered(&server, "/api/ipam/ip-addresses/", "device_id", "1", json!([r1_addr.clone()])).await;
    mount_filtered(&server, "/api/ipam/ip-addresses/", "device_id", "2", json!([r2_addr.clone()])).await;
    mount_filtered(
        &server,
        "/api/ipam/ip-addresses/",
        "parent",
        "192.0.2.0/31",
        json!([r1_addr, r2_addr]),
    )
    .await;

    let snapshot = fetch_snapshot(&client, &FetchConfig::default()).await.unwrap();
    assert_eq!(snapshot.devices.len(), 2);
    assert_eq!(snapshot.interfaces.len(), 2);
    assert_eq!(snapshot.addresses.len(), 2);
    assert_eq!(snapshot.interfaces_of(1)[0].name, "et-0/0/0");
    assert!(snapshot.source.as_deref().unwrap().ends_with("/api/"));

    let resolution = resolve(&snapshot, &ResolveConfig::default()).unwrap();
    assert_eq!(resolution.graph.links.len(), 1);
}

#[tokio::test]
async fn test_adapter_failure_aborts_fetch() {
    let server = MockServer::start().await;
    let client = NetboxClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = fetch_snapshot(&client, &FetchConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Inventory(_)));
    assert!(err.as_inventory().unwrap().is_transient());
}

#[tokio::test]
async fn test_cable_peer_pulls_in_far_device() {
    let server = MockServer::start().await;
    let client = NetboxClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();

    // Only r1 matches the seed filter; r2 is discovered through the cable.
    mount_list(&server, "/api/dcim/devices/", json!([device(1, "r1")])).await;
    mount_list(&server, "/api/ipam/fhrp-groups/", json!([])).await;
    mount_list(&server, "/api/ipam/fhrp-group-assignments/", json!([])).await;

    let mut cabled = interface(10, 1, "r1");
    cabled["link_peers"] = json!([{"id": 20}]);
    cabled["link_peers_type"] = json!("dcim.interface");
    mount_filtered(&server, "/api/dcim/interfaces/", "device_id", "1", json!([cabled])).await;
    mount_filtered(&server, "/api/dcim/interfaces/", "device_id", "2", json!([interface(20, 2, "r2")])).await;
    mount_filtered(&server, "/api/ipam/ip-addresses/", "device_id", "1", json!([])).await;
    mount_filtered(&server, "/api/ipam/ip-addresses/", "device_id", "2", json!([])).await;

    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/20/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(interface(20, 2, "r2")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/devices/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(device(2, "r2")))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = fetch_snapshot(&client, &FetchConfig::default()).await.unwrap();
    assert!(snapshot.devices.contains_key(&2));
    assert!(snapshot.interfaces.contains_key(&20));
}
