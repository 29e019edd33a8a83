// ── Resolved topology model ──
//
// What the engine produces: devices, their interfaces and the links
// between them. Emitters read these types and nothing else.

pub mod address;
pub mod device;
pub mod graph;
pub mod link;

// ── Re-exports ──────────────────────────────────────────────────────

pub use address::{Address, AddressParseError};
pub use device::{
    Device, DeviceKind, DeviceSubType, PhysicalInterface, RedundancyGroup, SubInterface,
    VlanMembership, normalize_interface_name,
};
pub use graph::{Graph, LinkEnd};
pub use link::{Endpoint, Link, LinkId};
