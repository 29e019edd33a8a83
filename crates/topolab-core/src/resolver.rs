// ── Far-side resolution ──
//
// Given one interface, find the interface at the other end of its
// connection. Four strategies, tried by connection mechanism:
//
//   direct   cable peer (or traced endpoint) is an interface
//   lag      aggregate -> member -> member's peer -> peer's aggregate
//   circuit  peer is a circuit termination, possibly behind a front/rear
//            port pair; answer is the interface on the other termination
//   address  another interface holding an address in the same subnet
//
// Indirection through ports is an explicit bounded loop.

use strum::Display;
use tracing::trace;

use crate::diagnostics::DiagnosticKind;
use crate::inventory::{
    CircuitRecord, CircuitTerminationRecord, InterfaceRecord, Inventory, LinkPeer,
};
use crate::model::Address;

/// Front port -> rear port -> termination hops followed before giving up.
pub const MAX_INDIRECTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Strategy {
    Direct,
    Lag,
    Circuit,
    Address,
}

/// A resolved far side and how it was found.
#[derive(Debug, Clone, Copy)]
pub struct FarSide<'a> {
    pub interface: &'a InterfaceRecord,
    pub strategy: Strategy,
}

/// Why resolution stopped. Becomes a `Diagnostic` in the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub kind: DiagnosticKind,
    pub detail: String,
}

impl Gap {
    fn unresolved(detail: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedFarSide,
            detail: detail.into(),
        }
    }
}

/// A circuit found behind an interface, with the termination it lands on.
#[derive(Debug, Clone, Copy)]
pub struct CircuitHop<'a> {
    pub circuit: &'a CircuitRecord,
    pub termination: &'a CircuitTerminationRecord,
}

pub struct FarSideResolver<'a> {
    inventory: &'a dyn Inventory,
}

impl<'a> FarSideResolver<'a> {
    pub fn new(inventory: &'a dyn Inventory) -> Self {
        Self { inventory }
    }

    /// Resolve by whichever mechanism the interface uses.
    pub fn far_side(&self, interface: &'a InterfaceRecord) -> Result<FarSide<'a>, Gap> {
        if interface.is_lag() {
            return self.through_lag(interface).map(|far| FarSide {
                interface: far,
                strategy: Strategy::Lag,
            });
        }
        if let Ok(far) = self.direct(interface) {
            return Ok(FarSide {
                interface: far,
                strategy: Strategy::Direct,
            });
        }
        if self.circuit_of(interface).is_some() {
            return self.circuit_far_side(interface).map(|far| FarSide {
                interface: far,
                strategy: Strategy::Circuit,
            });
        }
        let addresses: Vec<Address> = self
            .inventory
            .addresses_of(interface.id)
            .into_iter()
            .map(|a| a.address)
            .collect();
        self.by_address(interface, &addresses).map(|far| FarSide {
            interface: far,
            strategy: Strategy::Address,
        })
    }

    /// Cable-level far side: LAG indirection for aggregates, else direct.
    pub fn link_far_side(&self, interface: &'a InterfaceRecord) -> Result<&'a InterfaceRecord, Gap> {
        if interface.is_lag() {
            self.through_lag(interface)
        } else {
            self.direct(interface)
        }
    }

    // ── Direct ───────────────────────────────────────────────────────

    pub fn direct(&self, interface: &InterfaceRecord) -> Result<&'a InterfaceRecord, Gap> {
        let far_id = match &interface.link_peer {
            Some(LinkPeer::Interface { id }) => Some(*id),
            _ => interface.connected_interface,
        }
        .ok_or_else(|| Gap::unresolved("no interface at the far end of the cable"))?;

        self.inventory
            .interface(far_id)
            .ok_or_else(|| Gap::unresolved(format!("far interface {far_id} is not in the inventory")))
    }

    // ── LAG ──────────────────────────────────────────────────────────

    /// First member (by id) whose LAG reference names this aggregate.
    pub fn lag_member(&self, lag: &InterfaceRecord) -> Result<&'a InterfaceRecord, Gap> {
        self.inventory
            .chassis_interfaces(lag.device_id)
            .into_iter()
            .find(|i| i.lag.as_ref().is_some_and(|l| l.name == lag.name))
            .ok_or_else(|| Gap {
                kind: DiagnosticKind::MissingLagMember,
                detail: format!("no member interface of {}", lag.name),
            })
    }

    /// The far aggregate of `lag`. When the far member is not itself in
    /// an aggregate the member is returned.
    pub fn through_lag(&self, lag: &InterfaceRecord) -> Result<&'a InterfaceRecord, Gap> {
        let member = self.lag_member(lag)?;
        let far_member = self.direct(member)?;
        trace!(lag = %lag.name, member = %member.name, far = %far_member.name, "lag member resolved");

        match &far_member.lag {
            Some(far_lag) => self.inventory.interface(far_lag.id).ok_or_else(|| {
                Gap::unresolved(format!("far aggregate {} is not in the inventory", far_lag.name))
            }),
            None => Ok(far_member),
        }
    }

    // ── Circuit ──────────────────────────────────────────────────────

    /// The circuit terminating on this interface, if any. Aggregates are
    /// checked through a member, since circuit data lives on members.
    pub fn circuit_of(&self, interface: &InterfaceRecord) -> Option<CircuitHop<'a>> {
        let port = if interface.is_lag() {
            self.lag_member(interface).ok()?
        } else {
            interface
        };
        let mut peer = port.link_peer.clone();

        for _ in 0..MAX_INDIRECTION {
            match peer {
                Some(LinkPeer::CircuitTermination { id, .. }) => {
                    let termination = self.inventory.termination(id)?;
                    let circuit = self.inventory.circuit(termination.circuit_id)?;
                    return Some(CircuitHop {
                        circuit,
                        termination,
                    });
                }
                Some(LinkPeer::FrontPort { id }) => {
                    let front = self.inventory.front_port(id)?;
                    let rear = self.inventory.rear_port(front.rear_port_id)?;
                    peer = rear.link_peer.clone();
                }
                _ => return None,
            }
        }
        None
    }

    /// Interface on the other termination of this interface's circuit.
    pub fn circuit_far_side(&self, interface: &InterfaceRecord) -> Result<&'a InterfaceRecord, Gap> {
        let hop = self
            .circuit_of(interface)
            .ok_or_else(|| Gap::unresolved("no circuit termination behind the interface"))?;

        let other = self
            .inventory
            .terminations_of(hop.circuit.id)
            .into_iter()
            .find(|t| t.id != hop.termination.id)
            .ok_or_else(|| {
                Gap::unresolved(format!("circuit {} has a single termination", hop.circuit.cid))
            })?;

        match &other.link_peer {
            Some(LinkPeer::Interface { id }) => self.inventory.interface(*id).ok_or_else(|| {
                Gap::unresolved(format!("far interface {id} is not in the inventory"))
            }),
            _ => Err(Gap::unresolved(format!(
                "far termination of circuit {} is not cabled to an interface",
                hop.circuit.cid
            ))),
        }
    }

    // ── Address inference ────────────────────────────────────────────

    /// First other interface holding an address in one of `addresses`'
    /// subnets. Scans addresses in the given order, subnet members by id.
    pub fn by_address(
        &self,
        interface: &InterfaceRecord,
        addresses: &[Address],
    ) -> Result<&'a InterfaceRecord, Gap> {
        for address in addresses {
            for candidate in self.inventory.addresses_in(&address.network()) {
                if candidate.address == *address {
                    continue;
                }
                let Some(owner) = candidate.interface_id else {
                    continue;
                };
                if owner == interface.id {
                    continue;
                }
                if let Some(far) = self.inventory.interface(owner) {
                    return Ok(far);
                }
            }
        }
        Err(Gap::unresolved(if addresses.is_empty() {
            "no addresses to infer a far side from".to_owned()
        } else {
            "no other interface in the same subnet".to_owned()
        }))
    }
}
