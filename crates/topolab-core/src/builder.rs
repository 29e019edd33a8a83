// ── Device / interface model builder ──
//
// Idempotent get-or-create of graph entities from inventory records,
// with device classification, switch port VLAN classification and
// first-hop redundancy address attribution.

use tracing::debug;

use crate::config::ResolveConfig;
use crate::inventory::{DeviceRecord, InterfaceRecord, Inventory, VlanMode};
use crate::model::{Address, Device, DeviceKind, DeviceSubType, Graph, VlanMembership};

pub struct ModelBuilder<'a> {
    inventory: &'a dyn Inventory,
    config: &'a ResolveConfig,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(inventory: &'a dyn Inventory, config: &'a ResolveConfig) -> Self {
        Self { inventory, config }
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Materialize a device once per canonical name. Returns the name.
    pub fn ensure_device(&self, graph: &mut Graph, record: &DeviceRecord) -> String {
        let name = record.canonical_name();
        graph.ensure_device(&name, || {
            let (kind, sub_type) = self
                .config
                .classification
                .classify(record, &self.config.l3_switches);
            debug!(device = %name, %kind, %sub_type, "adding device");
            Device::new(name.clone(), kind, sub_type, record.fqdn())
        });
        name
    }

    /// Materialize the device owning an interface. Devices that were
    /// never fetched are added under the interface's device name with the
    /// default classification.
    pub fn ensure_owner(&self, graph: &mut Graph, interface: &InterfaceRecord) -> String {
        if let Some(record) = self.inventory.device(interface.device_id) {
            return self.ensure_device(graph, record);
        }
        let name = interface.device_name.clone();
        graph.ensure_synthetic_device(&name, DeviceKind::RoutingNode, DeviceSubType::CoreRouter);
        name
    }

    // ── Interfaces ───────────────────────────────────────────────────

    /// Get-or-create the physical interface for an inventory interface,
    /// creating its device if needed. Returns the owning device name.
    ///
    /// VLAN classification runs only on creation: the first caller wins.
    pub fn ensure_physical_interface(
        &self,
        graph: &mut Graph,
        interface: &InterfaceRecord,
        addresses: Vec<Address>,
        description: &str,
    ) -> String {
        let device_name = self.ensure_owner(graph, interface);
        if let Some(device) = graph.device_mut(&device_name) {
            let sub_type = device.sub_type;
            let has_addresses = !addresses.is_empty();
            device.ensure_physical_interface(&interface.name, addresses, description, || {
                self.vlan_membership(sub_type, interface, has_addresses)
            });
        }
        device_name
    }

    /// Switch port classification. L3 switch ports carrying addresses,
    /// or acting as parents of addressed sub-interfaces, are routed ports
    /// and get no VLAN membership.
    pub fn vlan_membership(
        &self,
        sub_type: DeviceSubType,
        interface: &InterfaceRecord,
        has_addresses: bool,
    ) -> VlanMembership {
        match sub_type {
            DeviceSubType::L2Switch => membership_from_mode(interface),
            DeviceSubType::L3Switch
                if !has_addresses && !self.has_addressed_sub_interfaces(interface) =>
            {
                membership_from_mode(interface)
            }
            _ => VlanMembership::default(),
        }
    }

    fn has_addressed_sub_interfaces(&self, interface: &InterfaceRecord) -> bool {
        let prefix = format!("{}.", interface.name);
        self.inventory
            .chassis_interfaces(interface.device_id)
            .into_iter()
            .filter(|i| {
                i.parent.as_ref().is_some_and(|p| p.id == interface.id) || i.name.starts_with(&prefix)
            })
            .any(|i| i.address_count > 0)
    }

    // ── Addresses ────────────────────────────────────────────────────

    /// Addresses to place on an interface: redundancy-group virtual
    /// addresses (for the owning member only) followed by its own.
    pub fn interface_addresses(&self, interface: &InterfaceRecord) -> Vec<Address> {
        let own: Vec<Address> = self
            .inventory
            .addresses_of(interface.id)
            .into_iter()
            .map(|a| a.address)
            .collect();
        let mut addresses = self.redundancy_addresses(interface, &own);
        addresses.extend(own);
        addresses
    }

    /// Virtual addresses this interface owns.
    ///
    /// Only the group member on the lexicographically smallest device name
    /// gets them, and each is re-masked to the prefix length of the real
    /// address sharing its subnet. Virtual addresses with no matching real
    /// subnet are dropped.
    pub fn redundancy_addresses(
        &self,
        interface: &InterfaceRecord,
        real: &[Address],
    ) -> Vec<Address> {
        let mut out = Vec::new();

        for assignment in self.inventory.fhrp_assignments_of(interface.id) {
            let owner = self
                .inventory
                .fhrp_group_members(assignment.group_id)
                .into_iter()
                .map(|m| m.device_name.as_str())
                .min();
            if owner != Some(interface.device_name.as_str()) {
                continue;
            }
            let Some(group) = self.inventory.fhrp_group(assignment.group_id) else {
                continue;
            };

            for vip in &group.virtual_addresses {
                let remasked = real
                    .iter()
                    .find(|r| r.contains(vip.ip()))
                    .and_then(|r| vip.with_prefix_len(r.prefix_len()));
                if let Some(addr) = remasked {
                    if !out.contains(&addr) {
                        out.push(addr);
                    }
                }
            }
        }

        out
    }
}

fn membership_from_mode(interface: &InterfaceRecord) -> VlanMembership {
    match interface.mode {
        Some(VlanMode::Tagged | VlanMode::TaggedAll) => VlanMembership {
            allowed_vlans: interface.tagged_vlans.clone(),
            access_vlan: interface.untagged_vlan,
        },
        Some(VlanMode::Access) => VlanMembership {
            allowed_vlans: Vec::new(),
            access_vlan: interface.untagged_vlan,
        },
        None => VlanMembership::default(),
    }
}

/// VLAN id of a sub-interface: its untagged VLAN, else the numeric unit
/// after the last dot (`ae1.1001` -> 1001).
pub fn sub_interface_vlan(interface: &InterfaceRecord) -> Option<u16> {
    interface.untagged_vlan.or_else(|| {
        interface
            .name
            .rsplit_once('.')
            .and_then(|(_, unit)| unit.parse().ok())
    })
}

/// Bridge device name for a switch: Linux netdev names are limited to
/// 15 characters.
pub fn bridge_name(switch: &str) -> String {
    switch.replace("cloud", "c").chars().take(15).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::inventory::{
        AddressRecord, FhrpAssignmentRecord, FhrpGroupRecord, InterfaceKind, NamedRef, RecordId,
    };
    use crate::snapshot::InventorySnapshot;

    fn iface(id: RecordId, device_id: RecordId, device: &str, name: &str) -> InterfaceRecord {
        InterfaceRecord {
            id,
            device_id,
            device_name: device.into(),
            name: name.into(),
            kind: InterfaceKind::Physical("10gbase-x-sfpp".into()),
            enabled: true,
            mgmt_only: false,
            parent: None,
            lag: None,
            description: String::new(),
            mode: None,
            untagged_vlan: None,
            tagged_vlans: vec![],
            link_peer: None,
            connected_interface: None,
            address_count: 0,
            fhrp_group_count: 0,
        }
    }

    fn device(id: RecordId, name: &str, role: &str) -> DeviceRecord {
        DeviceRecord {
            id,
            name: name.into(),
            role: Some(role.into()),
            status: Some("active".into()),
            virtual_chassis: None,
            primary_ip4_dns: None,
            primary_ip6_dns: None,
        }
    }

    fn trunk(mut i: InterfaceRecord) -> InterfaceRecord {
        i.mode = Some(VlanMode::Tagged);
        i.tagged_vlans = vec![1001, 1002];
        i.untagged_vlan = Some(1000);
        i
    }

    #[test]
    fn ensure_device_is_idempotent() {
        let mut snap = InventorySnapshot::new();
        snap.insert_device(device(1, "cr1-eqiad", "cr"));
        let config = ResolveConfig::default();
        let builder = ModelBuilder::new(&snap, &config);
        let mut graph = Graph::new();

        let record = snap.device(1).unwrap();
        assert_eq!(builder.ensure_device(&mut graph, record), "cr1-eqiad");
        assert_eq!(builder.ensure_device(&mut graph, record), "cr1-eqiad");
        assert_eq!(graph.devices.len(), 1);
        assert_eq!(graph.devices["cr1-eqiad"].sub_type, DeviceSubType::CoreRouter);
    }

    #[test]
    fn l2_switch_trunk_is_classified() {
        let mut snap = InventorySnapshot::new();
        snap.insert_device(device(1, "asw1", "asw"));
        snap.insert_interface(trunk(iface(10, 1, "asw1", "xe-0/0/1")));
        let config = ResolveConfig::default();
        let builder = ModelBuilder::new(&snap, &config);
        let mut graph = Graph::new();

        builder.ensure_physical_interface(&mut graph, snap.interface(10).unwrap(), vec![], "");
        let port = &graph.devices["asw1"].physical_interfaces["xe-0/0/1"];
        assert_eq!(port.allowed_vlans, vec![1001, 1002]);
        assert_eq!(port.access_vlan, Some(1000));
    }

    #[test]
    fn l3_switch_skips_parents_of_addressed_sub_interfaces() {
        let mut snap = InventorySnapshot::new();
        snap.insert_device(device(1, "cloudsw1", "cloudsw"));
        snap.insert_interface(trunk(iface(10, 1, "cloudsw1", "xe-0/0/1")));
        snap.insert_interface(trunk(iface(11, 1, "cloudsw1", "xe-0/0/2")));
        let mut sub = iface(12, 1, "cloudsw1", "xe-0/0/1.100");
        sub.parent = Some(NamedRef {
            id: 10,
            name: "xe-0/0/1".into(),
        });
        sub.address_count = 1;
        snap.insert_interface(sub);

        let config = ResolveConfig::default();
        let builder = ModelBuilder::new(&snap, &config);
        let mut graph = Graph::new();
        builder.ensure_physical_interface(&mut graph, snap.interface(10).unwrap(), vec![], "");
        builder.ensure_physical_interface(&mut graph, snap.interface(11).unwrap(), vec![], "");

        let ports = &graph.devices["cloudsw1"].physical_interfaces;
        assert!(ports["xe-0/0/1"].allowed_vlans.is_empty());
        assert_eq!(ports["xe-0/0/2"].allowed_vlans, vec![1001, 1002]);
    }

    #[test]
    fn routers_get_no_vlans() {
        let mut snap = InventorySnapshot::new();
        snap.insert_device(device(1, "cr1", "cr"));
        snap.insert_interface(trunk(iface(10, 1, "cr1", "ae1")));
        let config = ResolveConfig::default();
        let builder = ModelBuilder::new(&snap, &config);
        let mut graph = Graph::new();

        builder.ensure_physical_interface(&mut graph, snap.interface(10).unwrap(), vec![], "");
        assert!(graph.devices["cr1"].physical_interfaces["ae1"]
            .allowed_vlans
            .is_empty());
    }

    fn vrrp_snapshot() -> InventorySnapshot {
        let mut snap = InventorySnapshot::new();
        snap.insert_interface(iface(10, 1, "device-b", "irb.100"));
        snap.insert_interface(iface(20, 2, "device-a", "irb.100"));
        snap.insert_address(AddressRecord {
            id: 100,
            address: "10.0.0.5/29".parse().unwrap(),
            interface_id: Some(10),
            role: None,
        });
        snap.insert_address(AddressRecord {
            id: 101,
            address: "10.0.0.4/29".parse().unwrap(),
            interface_id: Some(20),
            role: None,
        });
        snap.insert_fhrp_group(FhrpGroupRecord {
            id: 7,
            protocol: Some("vrrp3".into()),
            group_id: 100,
            virtual_addresses: vec!["10.0.0.1/32".parse().unwrap()],
        });
        for (id, interface_id, device_name) in [(1, 10, "device-b"), (2, 20, "device-a")] {
            snap.insert_fhrp_assignment(FhrpAssignmentRecord {
                id,
                group_id: 7,
                interface_id,
                device_name: device_name.into(),
                priority: 100,
            });
        }
        snap
    }

    #[test]
    fn vrrp_address_is_remasked_for_smallest_member() {
        let snap = vrrp_snapshot();
        let config = ResolveConfig::default();
        let builder = ModelBuilder::new(&snap, &config);

        let owner = builder.interface_addresses(snap.interface(20).unwrap());
        let expected: Vec<Address> = vec![
            "10.0.0.1/29".parse().unwrap(),
            "10.0.0.4/29".parse().unwrap(),
        ];
        assert_eq!(owner, expected);

        let other = builder.interface_addresses(snap.interface(10).unwrap());
        assert_eq!(other, vec!["10.0.0.5/29".parse::<Address>().unwrap()]);
    }

    #[test]
    fn vlan_from_untagged_or_suffix() {
        let mut sub = iface(1, 1, "cr1", "ae1.1001");
        assert_eq!(sub_interface_vlan(&sub), Some(1001));
        sub.untagged_vlan = Some(2001);
        assert_eq!(sub_interface_vlan(&sub), Some(2001));
        assert_eq!(sub_interface_vlan(&iface(2, 1, "cr1", "ae1")), None);
    }

    #[test]
    fn bridge_names_fit_netdev_limit() {
        assert_eq!(bridge_name("cloudsw1-c8-eqiad"), "csw1-c8-eqiad");
        assert_eq!(bridge_name("asw2-ulsfo-long-name"), "asw2-ulsfo-long");
    }
}
