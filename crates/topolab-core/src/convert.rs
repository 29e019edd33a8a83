// ── API response → inventory record conversion ──
//
// The only place raw NetBox shapes are interpreted. Anything that fails
// validation here is dropped (with a warning) or becomes an explicit
// `Option`/`LinkPeer::Other`, never a runtime type check further in.

use tracing::warn;

use topolab_api::types::{
    CircuitResponse, CircuitTerminationResponse, DeviceResponse, FhrpAssignmentResponse,
    FhrpGroupResponse, FrontPortResponse, InterfaceResponse, IpAddressResponse, NestedPeer,
    NestedRef, RearPortResponse,
};

use crate::inventory::{
    AddressRecord, CircuitKind, CircuitRecord, CircuitTerminationRecord, DeviceRecord,
    FhrpAssignmentRecord, FhrpGroupRecord, FrontPortRecord, InterfaceKind, InterfaceRecord,
    LinkPeer, NamedRef, RearPortRecord, VirtualChassisRef, VlanMode,
};
use crate::model::Address;

const INTERFACE_TYPE: &str = "dcim.interface";
const TERMINATION_TYPE: &str = "circuits.circuittermination";
const FRONT_PORT_TYPE: &str = "dcim.frontport";

fn ref_name(r: &NestedRef) -> String {
    r.name
        .clone()
        .or_else(|| r.slug.clone())
        .unwrap_or_else(|| r.id.to_string())
}

fn named(r: &NestedRef) -> NamedRef {
    NamedRef {
        id: r.id,
        name: ref_name(r),
    }
}

fn parse_address(raw: &str, context: &str) -> Option<Address> {
    match raw.parse::<Address>() {
        Ok(address) => Some(address),
        Err(e) => {
            warn!(address = raw, context, error = %e, "dropping unparseable address");
            None
        }
    }
}

/// First cable peer, typed by the sibling `*_type` discriminator.
fn link_peer(peers: &[NestedPeer], peer_type: Option<&str>) -> Option<LinkPeer> {
    let peer = peers.first()?;
    let peer_type = peer_type?;
    Some(match peer_type {
        INTERFACE_TYPE => LinkPeer::Interface { id: peer.id },
        TERMINATION_TYPE => match &peer.circuit {
            Some(circuit) => LinkPeer::CircuitTermination {
                id: peer.id,
                circuit_id: circuit.id,
            },
            None => LinkPeer::Other {
                object_type: peer_type.to_owned(),
            },
        },
        FRONT_PORT_TYPE => LinkPeer::FrontPort { id: peer.id },
        other => LinkPeer::Other {
            object_type: other.to_owned(),
        },
    })
}

// ── DCIM ────────────────────────────────────────────────────────────

pub fn device(response: &DeviceResponse) -> DeviceRecord {
    DeviceRecord {
        id: response.id,
        name: response
            .name
            .clone()
            .unwrap_or_else(|| format!("device-{}", response.id)),
        role: response.role_slug().map(ToOwned::to_owned),
        status: response.status.as_ref().map(|s| s.value.clone()),
        virtual_chassis: response.virtual_chassis.as_ref().map(|vc| VirtualChassisRef {
            id: vc.id,
            name: vc.name.clone(),
            master_id: vc.master.as_ref().map(|m| m.id),
        }),
        primary_ip4_dns: response
            .primary_ip4
            .as_ref()
            .and_then(|ip| ip.dns_name.clone())
            .filter(|dns| !dns.is_empty()),
        primary_ip6_dns: response
            .primary_ip6
            .as_ref()
            .and_then(|ip| ip.dns_name.clone())
            .filter(|dns| !dns.is_empty()),
    }
}

pub fn interface(response: &InterfaceResponse) -> InterfaceRecord {
    let connected_interface = match response.connected_endpoints_type.as_deref() {
        Some(INTERFACE_TYPE) => response
            .connected_endpoints
            .as_ref()
            .and_then(|endpoints| endpoints.first())
            .map(|endpoint| endpoint.id),
        _ => None,
    };

    InterfaceRecord {
        id: response.id,
        device_id: response.device.id,
        device_name: ref_name(&response.device),
        name: response.name.clone(),
        kind: InterfaceKind::from_type(&response.kind.value),
        enabled: response.enabled,
        mgmt_only: response.mgmt_only,
        parent: response.parent.as_ref().map(named),
        lag: response.lag.as_ref().map(named),
        description: response.description.clone(),
        mode: response
            .mode
            .as_ref()
            .and_then(|m| VlanMode::from_value(&m.value)),
        untagged_vlan: response.untagged_vlan.as_ref().map(|v| v.vid),
        tagged_vlans: response.tagged_vlans.iter().map(|v| v.vid).collect(),
        link_peer: link_peer(&response.link_peers, response.link_peers_type.as_deref()),
        connected_interface,
        address_count: response.count_ipaddresses,
        fhrp_group_count: response.count_fhrp_groups,
    }
}

pub fn front_port(response: &FrontPortResponse) -> FrontPortRecord {
    FrontPortRecord {
        id: response.id,
        device_id: response.device.id,
        name: response.name.clone(),
        rear_port_id: response.rear_port.id,
    }
}

pub fn rear_port(response: &RearPortResponse) -> RearPortRecord {
    RearPortRecord {
        id: response.id,
        device_id: response.device.id,
        name: response.name.clone(),
        link_peer: link_peer(&response.link_peers, response.link_peers_type.as_deref()),
    }
}

// ── IPAM ────────────────────────────────────────────────────────────

pub fn address(response: &IpAddressResponse) -> Option<AddressRecord> {
    let address = parse_address(&response.address, "ip-address")?;
    let interface_id = match response.assigned_object_type.as_deref() {
        Some(INTERFACE_TYPE) => response.assigned_object_id,
        _ => None,
    };
    Some(AddressRecord {
        id: response.id,
        address,
        interface_id,
        role: response.role.as_ref().map(|r| r.value.clone()),
    })
}

pub fn fhrp_group(response: &FhrpGroupResponse) -> FhrpGroupRecord {
    FhrpGroupRecord {
        id: response.id,
        protocol: response.protocol.clone(),
        group_id: response.group_id,
        virtual_addresses: response
            .ip_addresses
            .iter()
            .filter_map(|ip| parse_address(&ip.address, "fhrp-group"))
            .collect(),
    }
}

/// Assignments to anything other than a device interface (VM interfaces)
/// are not part of the physical topology and are dropped.
pub fn fhrp_assignment(response: &FhrpAssignmentResponse) -> Option<FhrpAssignmentRecord> {
    if response.interface_type != INTERFACE_TYPE {
        return None;
    }
    let device_name = response
        .interface
        .as_ref()
        .and_then(|i| i.device.as_ref())
        .map(ref_name)
        .unwrap_or_default();
    Some(FhrpAssignmentRecord {
        id: response.id,
        group_id: response.group.id,
        interface_id: response.interface_id,
        device_name,
        priority: response.priority,
    })
}

// ── Circuits ────────────────────────────────────────────────────────

pub fn circuit(response: &CircuitResponse) -> CircuitRecord {
    CircuitRecord {
        id: response.id,
        cid: response.cid.clone(),
        provider: ref_name(&response.provider),
        kind: response
            .kind
            .slug
            .as_deref()
            .map_or_else(|| CircuitKind::Other(ref_name(&response.kind)), CircuitKind::from_slug),
    }
}

pub fn termination(response: &CircuitTerminationResponse) -> CircuitTerminationRecord {
    CircuitTerminationRecord {
        id: response.id,
        circuit_id: response.circuit.id,
        term_side: response.term_side.clone(),
        link_peer: link_peer(&response.link_peers, response.link_peers_type.as_deref()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iface(value: serde_json::Value) -> InterfaceResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn interface_peer_and_connected_endpoint() {
        let record = interface(&iface(json!({
            "id": 10,
            "device": {"id": 1, "name": "cr1-eqiad"},
            "name": "et-0/0/0",
            "type": {"value": "100gbase-x-qsfp28"},
            "link_peers": [{"id": 20}],
            "link_peers_type": "dcim.interface",
            "connected_endpoints": [{"id": 20}],
            "connected_endpoints_type": "dcim.interface",
            "mode": {"value": "tagged"},
            "tagged_vlans": [{"id": 1, "vid": 100}, {"id": 2, "vid": 200}]
        })));
        assert_eq!(record.link_peer, Some(LinkPeer::Interface { id: 20 }));
        assert_eq!(record.connected_interface, Some(20));
        assert_eq!(record.mode, Some(VlanMode::Tagged));
        assert_eq!(record.tagged_vlans, vec![100, 200]);
        assert_eq!(record.device_name, "cr1-eqiad");
    }

    #[test]
    fn circuit_termination_peer_carries_circuit() {
        let record = interface(&iface(json!({
            "id": 10,
            "device": {"id": 1, "name": "cr1-eqiad"},
            "name": "xe-0/1/0",
            "type": {"value": "10gbase-x-sfpp"},
            "link_peers": [{"id": 5, "circuit": {"id": 77, "cid": "IC-1"}}],
            "link_peers_type": "circuits.circuittermination"
        })));
        assert_eq!(
            record.link_peer,
            Some(LinkPeer::CircuitTermination { id: 5, circuit_id: 77 })
        );
        assert_eq!(record.connected_interface, None);
    }

    #[test]
    fn unknown_peer_type_is_other() {
        let record = interface(&iface(json!({
            "id": 10,
            "device": {"id": 1, "name": "cr1"},
            "name": "xe-0/1/1",
            "type": {"value": "10gbase-x-sfpp"},
            "link_peers": [{"id": 5}],
            "link_peers_type": "dcim.powerport"
        })));
        assert_eq!(
            record.link_peer,
            Some(LinkPeer::Other {
                object_type: "dcim.powerport".into()
            })
        );
    }

    #[test]
    fn bad_address_is_dropped() {
        let response: IpAddressResponse = serde_json::from_value(json!({
            "id": 1,
            "address": "not-an-address"
        }))
        .unwrap();
        assert!(address(&response).is_none());
    }

    #[test]
    fn address_assignment_only_for_interfaces() {
        let on_interface: IpAddressResponse = serde_json::from_value(json!({
            "id": 1,
            "address": "192.0.2.1/31",
            "assigned_object_type": "dcim.interface",
            "assigned_object_id": 10,
            "role": {"value": "vip"}
        }))
        .unwrap();
        let on_vm: IpAddressResponse = serde_json::from_value(json!({
            "id": 2,
            "address": "192.0.2.9/31",
            "assigned_object_type": "virtualization.vminterface",
            "assigned_object_id": 10
        }))
        .unwrap();
        let record = address(&on_interface).unwrap();
        assert_eq!(record.interface_id, Some(10));
        assert_eq!(record.role.as_deref(), Some("vip"));
        assert_eq!(address(&on_vm).unwrap().interface_id, None);
    }

    #[test]
    fn fhrp_assignment_takes_device_name() {
        let response: FhrpAssignmentResponse = serde_json::from_value(json!({
            "id": 3,
            "group": {"id": 9},
            "interface_type": "dcim.interface",
            "interface_id": 10,
            "interface": {"id": 10, "name": "ae1.100", "device": {"id": 1, "name": "cr1-eqiad"}},
            "priority": 100
        }))
        .unwrap();
        let record = fhrp_assignment(&response).unwrap();
        assert_eq!(record.device_name, "cr1-eqiad");
        assert_eq!(record.group_id, 9);
    }

    #[test]
    fn device_uses_virtual_chassis_master() {
        let response: DeviceResponse = serde_json::from_value(json!({
            "id": 4,
            "name": "asw2-a-eqiad-2",
            "role": {"id": 1, "slug": "asw"},
            "status": {"value": "active"},
            "virtual_chassis": {"id": 2, "name": "asw2-a-eqiad.mgmt.eqiad.wmnet", "master": {"id": 3}},
            "primary_ip4": {"id": 8, "address": "10.0.0.1/32", "dns_name": ""}
        }))
        .unwrap();
        let record = device(&response);
        assert_eq!(record.interface_source(), 3);
        assert_eq!(record.primary_ip4_dns, None);
        assert_eq!(record.canonical_name(), "asw2-a-eqiad");
    }

    #[test]
    fn circuit_kind_from_type_slug() {
        let response: CircuitResponse = serde_json::from_value(json!({
            "id": 77,
            "cid": "IC-1",
            "provider": {"id": 1, "name": "Telia", "slug": "telia"},
            "type": {"id": 2, "name": "Transit", "slug": "transit"}
        }))
        .unwrap();
        let record = circuit(&response);
        assert_eq!(record.kind, CircuitKind::Transit);
        assert_eq!(record.provider, "Telia");
    }
}
