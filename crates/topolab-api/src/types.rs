//! Response types for the NetBox REST API (`/api/dcim`, `/api/ipam`, `/api/circuits`).
//!
//! Only the fields the topology engine reads are modeled. NetBox grows
//! fields between releases and omits nullable ones on older versions, so
//! nearly everything is `#[serde(default)]`.

use serde::{Deserialize, Serialize};

// ── Pagination ───────────────────────────────────────────────────────

/// Envelope returned by every NetBox list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

// ── Shared nested shapes ─────────────────────────────────────────────

/// Choice field, e.g. `{"value": "active", "label": "Active"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceValue {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Brief representation of a related object (device, role, provider...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedVirtualChassis {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub master: Option<NestedRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedIpAddress {
    pub id: u64,
    pub address: String,
    #[serde(default)]
    pub dns_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedVlan {
    pub id: u64,
    pub vid: u16,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedCircuit {
    pub id: u64,
    #[serde(default)]
    pub cid: Option<String>,
}

/// A cable peer or connected endpoint.
///
/// The concrete shape depends on the sibling `*_type` field
/// (`dcim.interface`, `dcim.frontport`, `circuits.circuittermination`...),
/// so every type-specific attribute is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedPeer {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub device: Option<NestedRef>,
    #[serde(default)]
    pub circuit: Option<NestedCircuit>,
    #[serde(default)]
    pub term_side: Option<String>,
}

// ── DCIM ─────────────────────────────────────────────────────────────

/// Device from `GET /api/dcim/devices/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    /// NetBox >= 4.0.
    #[serde(default)]
    pub role: Option<NestedRef>,
    /// NetBox < 4.0.
    #[serde(default)]
    pub device_role: Option<NestedRef>,
    #[serde(default)]
    pub status: Option<ChoiceValue>,
    #[serde(default)]
    pub virtual_chassis: Option<NestedVirtualChassis>,
    #[serde(default)]
    pub primary_ip4: Option<NestedIpAddress>,
    #[serde(default)]
    pub primary_ip6: Option<NestedIpAddress>,
}

impl DeviceResponse {
    /// Role slug from whichever role field this NetBox version populates.
    pub fn role_slug(&self) -> Option<&str> {
        self.role
            .as_ref()
            .or(self.device_role.as_ref())
            .and_then(|r| r.slug.as_deref())
    }
}

/// Interface from `GET /api/dcim/interfaces/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceResponse {
    pub id: u64,
    pub device: NestedRef,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChoiceValue,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub mgmt_only: bool,
    #[serde(default)]
    pub parent: Option<NestedRef>,
    #[serde(default)]
    pub lag: Option<NestedRef>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mode: Option<ChoiceValue>,
    #[serde(default)]
    pub untagged_vlan: Option<NestedVlan>,
    #[serde(default)]
    pub tagged_vlans: Vec<NestedVlan>,
    #[serde(default)]
    pub link_peers: Vec<NestedPeer>,
    #[serde(default)]
    pub link_peers_type: Option<String>,
    #[serde(default)]
    pub connected_endpoints: Option<Vec<NestedPeer>>,
    #[serde(default)]
    pub connected_endpoints_type: Option<String>,
    #[serde(default)]
    pub count_ipaddresses: u32,
    #[serde(default)]
    pub count_fhrp_groups: u32,
}

fn default_true() -> bool {
    true
}

/// Front port from `GET /api/dcim/front-ports/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontPortResponse {
    pub id: u64,
    pub name: String,
    pub device: NestedRef,
    pub rear_port: NestedRef,
}

/// Rear port from `GET /api/dcim/rear-ports/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RearPortResponse {
    pub id: u64,
    pub name: String,
    pub device: NestedRef,
    #[serde(default)]
    pub link_peers: Vec<NestedPeer>,
    #[serde(default)]
    pub link_peers_type: Option<String>,
}

// ── IPAM ─────────────────────────────────────────────────────────────

/// IP address from `GET /api/ipam/ip-addresses/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddressResponse {
    pub id: u64,
    /// CIDR notation, e.g. `192.0.2.1/31`.
    pub address: String,
    #[serde(default)]
    pub assigned_object_type: Option<String>,
    #[serde(default)]
    pub assigned_object_id: Option<u64>,
    #[serde(default)]
    pub assigned_object: Option<NestedPeer>,
    #[serde(default)]
    pub role: Option<ChoiceValue>,
    #[serde(default)]
    pub dns_name: String,
}

/// FHRP (VRRP/HSRP...) group from `GET /api/ipam/fhrp-groups/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FhrpGroupResponse {
    pub id: u64,
    #[serde(default)]
    pub protocol: Option<String>,
    pub group_id: u32,
    #[serde(default)]
    pub ip_addresses: Vec<NestedIpAddress>,
}

/// Group membership from `GET /api/ipam/fhrp-group-assignments/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FhrpAssignmentResponse {
    pub id: u64,
    pub group: NestedRef,
    pub interface_type: String,
    pub interface_id: u64,
    #[serde(default)]
    pub interface: Option<NestedPeer>,
    #[serde(default)]
    pub priority: u16,
}

// ── Circuits ─────────────────────────────────────────────────────────

/// Circuit from `GET /api/circuits/circuits/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitResponse {
    pub id: u64,
    pub cid: String,
    pub provider: NestedRef,
    #[serde(rename = "type")]
    pub kind: NestedRef,
}

/// Circuit termination from `GET /api/circuits/circuit-terminations/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitTerminationResponse {
    pub id: u64,
    pub circuit: NestedCircuit,
    pub term_side: String,
    #[serde(default)]
    pub link_peers: Vec<NestedPeer>,
    #[serde(default)]
    pub link_peers_type: Option<String>,
}

// ── Query filters ────────────────────────────────────────────────────

/// Device list filter. Empty vectors leave the field unfiltered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub roles: Vec<String>,
    pub statuses: Vec<String>,
    pub names: Vec<String>,
}

impl DeviceFilter {
    /// Repeated query parameters, NetBox-style (`role=cr&role=asw`).
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let roles = self.roles.iter().map(|r| ("role", r.clone()));
        let statuses = self.statuses.iter().map(|s| ("status", s.clone()));
        let names = self.names.iter().map(|n| ("name", n.clone()));
        roles.chain(statuses).chain(names).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interface_defaults_enabled_when_missing() {
        let iface: InterfaceResponse = serde_json::from_value(json!({
            "id": 7,
            "device": {"id": 1, "name": "cr1"},
            "name": "et-0/0/0",
            "type": {"value": "100gbase-x-qsfp28"}
        }))
        .unwrap();
        assert!(iface.enabled);
        assert!(iface.link_peers.is_empty());
        assert!(iface.connected_endpoints.is_none());
    }

    #[test]
    fn role_slug_prefers_new_field() {
        let device: DeviceResponse = serde_json::from_value(json!({
            "id": 1,
            "name": "cr1",
            "role": {"id": 3, "slug": "cr"},
            "device_role": {"id": 4, "slug": "old"}
        }))
        .unwrap();
        assert_eq!(device.role_slug(), Some("cr"));
    }

    #[test]
    fn role_slug_falls_back_to_device_role() {
        let device: DeviceResponse = serde_json::from_value(json!({
            "id": 1,
            "name": "asw1",
            "device_role": {"id": 4, "slug": "asw"}
        }))
        .unwrap();
        assert_eq!(device.role_slug(), Some("asw"));
    }

    #[test]
    fn filter_params_repeat_keys() {
        let filter = DeviceFilter {
            roles: vec!["cr".into(), "cloudsw".into()],
            statuses: vec!["active".into()],
            names: vec![],
        };
        assert_eq!(
            filter.to_params(),
            vec![
                ("role", "cr".to_owned()),
                ("role", "cloudsw".to_owned()),
                ("status", "active".to_owned()),
            ]
        );
    }
}
