// ── Inventory records ──
//
// Validated, closed shapes of the inventory data the engine reads. The
// `convert` module builds these from raw API responses; everything past
// that boundary works with explicit `Option`s instead of loose JSON.

use serde::{Deserialize, Serialize};

use crate::model::Address;

/// Stable inventory record identifier.
pub type RecordId = u64;

/// A reference to another record that also carries its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    pub id: RecordId,
    pub name: String,
}

// ── Devices ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualChassisRef {
    pub id: RecordId,
    pub name: String,
    pub master_id: Option<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: RecordId,
    pub name: String,
    pub role: Option<String>,
    pub status: Option<String>,
    pub virtual_chassis: Option<VirtualChassisRef>,
    pub primary_ip4_dns: Option<String>,
    pub primary_ip6_dns: Option<String>,
}

impl DeviceRecord {
    /// Graph key: the virtual chassis name up to the first dot, else the
    /// device name.
    pub fn canonical_name(&self) -> String {
        match &self.virtual_chassis {
            Some(vc) => vc.name.split('.').next().unwrap_or(&vc.name).to_owned(),
            None => self.name.clone(),
        }
    }

    pub fn fqdn(&self) -> Option<String> {
        if let Some(vc) = &self.virtual_chassis {
            return Some(vc.name.clone());
        }
        self.primary_ip4_dns
            .iter()
            .chain(self.primary_ip6_dns.iter())
            .find(|dns| !dns.is_empty())
            .cloned()
    }

    /// Device whose interface list represents this one (the VC master for
    /// chassis members).
    pub fn interface_source(&self) -> RecordId {
        self.virtual_chassis
            .as_ref()
            .and_then(|vc| vc.master_id)
            .unwrap_or(self.id)
    }

    pub fn has_role(&self, roles: &[String]) -> bool {
        self.role
            .as_deref()
            .is_some_and(|role| roles.iter().any(|r| r == role))
    }
}

// ── Interfaces ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "type", rename_all = "snake_case")]
pub enum InterfaceKind {
    Virtual,
    Lag,
    Physical(String),
}

impl InterfaceKind {
    pub fn from_type(value: &str) -> Self {
        match value {
            "virtual" => Self::Virtual,
            "lag" => Self::Lag,
            other => Self::Physical(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VlanMode {
    Access,
    Tagged,
    TaggedAll,
}

impl VlanMode {
    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "access" => Some(Self::Access),
            "tagged" => Some(Self::Tagged),
            "tagged-all" => Some(Self::TaggedAll),
            _ => None,
        }
    }
}

/// What sits at the other end of an interface's cable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkPeer {
    Interface { id: RecordId },
    CircuitTermination { id: RecordId, circuit_id: RecordId },
    FrontPort { id: RecordId },
    Other { object_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub id: RecordId,
    pub device_id: RecordId,
    pub device_name: String,
    pub name: String,
    pub kind: InterfaceKind,
    pub enabled: bool,
    pub mgmt_only: bool,
    pub parent: Option<NamedRef>,
    pub lag: Option<NamedRef>,
    pub description: String,
    pub mode: Option<VlanMode>,
    pub untagged_vlan: Option<u16>,
    pub tagged_vlans: Vec<u16>,
    pub link_peer: Option<LinkPeer>,
    /// Traced interface at the end of the cable path, if any.
    pub connected_interface: Option<RecordId>,
    pub address_count: u32,
    pub fhrp_group_count: u32,
}

impl InterfaceRecord {
    pub fn is_lag(&self) -> bool {
        self.kind == InterfaceKind::Lag
    }

    pub fn is_loopback(&self) -> bool {
        self.kind == InterfaceKind::Virtual && self.name.starts_with("lo")
    }
}

// ── Addresses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: RecordId,
    pub address: Address,
    /// Set only when the address is assigned to a device interface.
    pub interface_id: Option<RecordId>,
    pub role: Option<String>,
}

// ── Circuits ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Transit,
    Transport,
    Peering,
    Other(String),
}

impl CircuitKind {
    pub fn from_slug(slug: &str) -> Self {
        match slug {
            "transit" => Self::Transit,
            "transport" => Self::Transport,
            "peering" => Self::Peering,
            other => Self::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitRecord {
    pub id: RecordId,
    pub cid: String,
    pub provider: String,
    pub kind: CircuitKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitTerminationRecord {
    pub id: RecordId,
    pub circuit_id: RecordId,
    pub term_side: String,
    pub link_peer: Option<LinkPeer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontPortRecord {
    pub id: RecordId,
    pub device_id: RecordId,
    pub name: String,
    pub rear_port_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RearPortRecord {
    pub id: RecordId,
    pub device_id: RecordId,
    pub name: String,
    pub link_peer: Option<LinkPeer>,
}

// ── First-hop redundancy ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FhrpGroupRecord {
    pub id: RecordId,
    pub protocol: Option<String>,
    pub group_id: u32,
    /// As reported by the inventory, usually /32 or /128.
    pub virtual_addresses: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FhrpAssignmentRecord {
    pub id: RecordId,
    pub group_id: RecordId,
    pub interface_id: RecordId,
    pub device_name: String,
    pub priority: u16,
}

// ── Lookup surface ──────────────────────────────────────────────────

/// Read-only view of the inventory consumed by the resolution engine.
///
/// Every list is returned in ascending record id order so a traversal
/// over the same data is always identical.
pub trait Inventory {
    fn devices(&self) -> Vec<&DeviceRecord>;
    fn device(&self, id: RecordId) -> Option<&DeviceRecord>;

    /// Interfaces whose owning device is `device_id`.
    fn interfaces_of(&self, device_id: RecordId) -> Vec<&InterfaceRecord>;
    fn interface(&self, id: RecordId) -> Option<&InterfaceRecord>;

    /// Interfaces of `device_id` and, for a virtual chassis, of every
    /// other member of the same chassis, in record id order.
    fn chassis_interfaces(&self, device_id: RecordId) -> Vec<&InterfaceRecord> {
        let Some(chassis) = self
            .device(device_id)
            .and_then(|d| d.virtual_chassis.as_ref())
        else {
            return self.interfaces_of(device_id);
        };
        let mut interfaces: Vec<&InterfaceRecord> = self
            .devices()
            .into_iter()
            .filter(|d| d.virtual_chassis.as_ref().is_some_and(|vc| vc.id == chassis.id))
            .flat_map(|d| self.interfaces_of(d.id))
            .collect();
        interfaces.sort_by_key(|i| i.id);
        interfaces
    }

    fn addresses_of(&self, interface_id: RecordId) -> Vec<&AddressRecord>;
    /// Every known address inside the subnet of `network`.
    fn addresses_in(&self, network: &Address) -> Vec<&AddressRecord>;

    fn circuit(&self, id: RecordId) -> Option<&CircuitRecord>;
    fn terminations_of(&self, circuit_id: RecordId) -> Vec<&CircuitTerminationRecord>;
    fn termination(&self, id: RecordId) -> Option<&CircuitTerminationRecord>;
    fn front_port(&self, id: RecordId) -> Option<&FrontPortRecord>;
    fn rear_port(&self, id: RecordId) -> Option<&RearPortRecord>;

    fn fhrp_group(&self, id: RecordId) -> Option<&FhrpGroupRecord>;
    fn fhrp_assignments_of(&self, interface_id: RecordId) -> Vec<&FhrpAssignmentRecord>;
    fn fhrp_group_members(&self, group_id: RecordId) -> Vec<&FhrpAssignmentRecord>;

    /// Device record owning an interface, falling back to the interface's
    /// own device name when the device was never fetched.
    fn canonical_device_name(&self, interface: &InterfaceRecord) -> String {
        self.device(interface.device_id)
            .map_or_else(|| interface.device_name.clone(), DeviceRecord::canonical_name)
    }
}
