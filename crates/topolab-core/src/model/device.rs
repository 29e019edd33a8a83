// ── Device domain types ──

use std::collections::BTreeMap;
use std::net::IpAddr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::address::Address;

/// Emulation node family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceKind {
    RoutingNode,
    LinuxSwitch,
    Bridge,
    Host,
    IspSimulation,
}

/// Role-level refinement of [`DeviceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceSubType {
    CoreRouter,
    L2Switch,
    L3Switch,
    Bridge,
    Host,
    Lvs,
    IspRouter,
}

/// VLAN membership of a switch port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanMembership {
    pub allowed_vlans: Vec<u16>,
    pub access_vlan: Option<u16>,
}

/// A physical (or LAG, or tunnel) port as it will exist in the lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalInterface {
    /// Inventory name, e.g. `et-0/0/1`.
    pub name: String,
    /// Backend-safe name, e.g. `et-0_0_1`.
    pub normalized_name: String,
    pub addresses: Vec<Address>,
    pub description: String,
    pub allowed_vlans: Vec<u16>,
    pub access_vlan: Option<u16>,
}

/// An 802.1Q sub-interface. The parent is referenced by normalized name
/// and looked up by key, never held by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubInterface {
    pub name: String,
    pub normalized_name: String,
    pub parent: String,
    pub vlan_id: u16,
    pub addresses: Vec<Address>,
}

/// Upstream provider session group on the ISP simulation device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedundancyGroup {
    pub provider_asn: u32,
    pub provider_name: String,
    pub peer_addresses: Vec<IpAddr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub kind: DeviceKind,
    pub sub_type: DeviceSubType,
    pub fqdn: Option<String>,
    pub loopback_addresses: Vec<Address>,
    pub physical_interfaces: IndexMap<String, PhysicalInterface>,
    pub sub_interfaces: IndexMap<String, SubInterface>,
    pub irb_interfaces: IndexMap<String, Vec<Address>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub redundancy_groups: BTreeMap<u32, RedundancyGroup>,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        kind: DeviceKind,
        sub_type: DeviceSubType,
        fqdn: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            sub_type,
            fqdn,
            loopback_addresses: Vec::new(),
            physical_interfaces: IndexMap::new(),
            sub_interfaces: IndexMap::new(),
            irb_interfaces: IndexMap::new(),
            redundancy_groups: BTreeMap::new(),
        }
    }

    /// Get-or-create a physical interface.
    ///
    /// `classify` runs only when the interface is created, so the first
    /// caller's VLAN membership sticks and later calls never overwrite it.
    pub fn ensure_physical_interface(
        &mut self,
        name: &str,
        addresses: Vec<Address>,
        description: &str,
        classify: impl FnOnce() -> VlanMembership,
    ) -> &mut PhysicalInterface {
        self.physical_interfaces
            .entry(name.to_owned())
            .or_insert_with(|| {
                let vlans = classify();
                PhysicalInterface {
                    name: name.to_owned(),
                    normalized_name: normalize_interface_name(name),
                    addresses,
                    description: description.to_owned(),
                    allowed_vlans: vlans.allowed_vlans,
                    access_vlan: vlans.access_vlan,
                }
            })
    }

    /// Get-or-create a sub-interface keyed by its inventory name.
    pub fn ensure_sub_interface(
        &mut self,
        name: &str,
        parent_name: &str,
        vlan_id: u16,
        addresses: Vec<Address>,
    ) -> &mut SubInterface {
        self.sub_interfaces
            .entry(name.to_owned())
            .or_insert_with(|| SubInterface {
                name: name.to_owned(),
                normalized_name: normalize_interface_name(name),
                parent: normalize_interface_name(parent_name),
                vlan_id,
                addresses,
            })
    }

    /// Normalized name of an existing interface of either flavour.
    pub fn normalized_interface(&self, name: &str) -> Option<&str> {
        self.physical_interfaces
            .get(name)
            .map(|i| i.normalized_name.as_str())
            .or_else(|| {
                self.sub_interfaces
                    .get(name)
                    .map(|i| i.normalized_name.as_str())
            })
    }

    /// Next free `ethN` name, counting the `eth*` ports already present.
    pub fn next_eth_name(&self) -> String {
        let used = self
            .physical_interfaces
            .keys()
            .filter(|name| name.starts_with("eth"))
            .count();
        format!("eth{}", used + 1)
    }
}

/// Replace characters the lab backend cannot use in link names.
pub fn normalize_interface_name(name: &str) -> String {
    name.replace(['/', ':'], "_")
}
