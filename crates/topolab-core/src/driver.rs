// ── Topology traversal driver ──
//
// One deterministic pass over the selected devices and their interfaces.
// Each candidate interface is dispatched, in fixed priority order, to
// exactly one handler:
//
//   loopback -> irb -> address-less L2 port -> tunnel -> sub-interface
//   -> circuit (transit / transport) -> switch-facing -> generic transport
//
// Hosts requested explicitly are attached afterwards. The graph is owned
// here and only handed out once the pass completes.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::builder::{ModelBuilder, bridge_name, sub_interface_vlan};
use crate::config::ResolveConfig;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Resolution};
use crate::error::CoreError;
use crate::inventory::{CircuitKind, DeviceRecord, InterfaceRecord, Inventory, RecordId};
use crate::model::{
    Address, DeviceKind, DeviceSubType, Graph, LinkEnd, RedundancyGroup, VlanMembership,
};
use crate::resolver::{CircuitHop, FarSideResolver, Gap};

/// Resolve the full topology of an inventory.
///
/// Only broken graph invariants are errors; every gap found along the way
/// is returned as a [`Diagnostic`].
pub fn resolve(inventory: &dyn Inventory, config: &ResolveConfig) -> Result<Resolution, CoreError> {
    let mut driver = Driver::new(inventory, config);
    driver.run()?;
    Ok(driver.finish())
}

struct Driver<'a> {
    inventory: &'a dyn Inventory,
    config: &'a ResolveConfig,
    resolver: FarSideResolver<'a>,
    builder: ModelBuilder<'a>,
    graph: Graph,
    diagnostics: Vec<Diagnostic>,
    traversed: HashSet<String>,
    visited: HashSet<RecordId>,
    diagnosed: HashSet<(RecordId, DiagnosticKind)>,
}

impl<'a> Driver<'a> {
    fn new(inventory: &'a dyn Inventory, config: &'a ResolveConfig) -> Self {
        Self {
            inventory,
            config,
            resolver: FarSideResolver::new(inventory),
            builder: ModelBuilder::new(inventory, config),
            graph: Graph::new(),
            diagnostics: Vec::new(),
            traversed: HashSet::new(),
            visited: HashSet::new(),
            diagnosed: HashSet::new(),
        }
    }

    fn finish(self) -> Resolution {
        info!(
            devices = self.graph.devices.len(),
            links = self.graph.links.len(),
            diagnostics = self.diagnostics.len(),
            "resolution complete"
        );
        Resolution {
            graph: self.graph,
            diagnostics: self.diagnostics,
        }
    }

    fn run(&mut self) -> Result<(), CoreError> {
        let (inventory, config) = (self.inventory, self.config);
        let selected: Vec<&'a DeviceRecord> = inventory
            .devices()
            .into_iter()
            .filter(|d| config.selects(d))
            .collect();
        info!(devices = selected.len(), "resolving topology");

        for device in selected {
            self.traverse_device(device)?;
        }
        self.hosts_pass()
    }

    fn traverse_device(&mut self, device: &'a DeviceRecord) -> Result<(), CoreError> {
        let name = self.builder.ensure_device(&mut self.graph, device);
        // Chassis members share one canonical device and one interface list.
        if !self.traversed.insert(name.clone()) {
            return Ok(());
        }
        info!(device = %name, "gathering interfaces");

        let inventory = self.inventory;
        for interface in inventory.chassis_interfaces(device.id) {
            if !self.is_candidate(interface) || !self.visited.insert(interface.id) {
                continue;
            }
            self.dispatch(&name, interface)?;
        }
        Ok(())
    }

    fn is_candidate(&self, interface: &InterfaceRecord) -> bool {
        interface.enabled
            && !interface.mgmt_only
            && interface.lag.is_none()
            && !self
                .config
                .mgmt_prefixes
                .iter()
                .any(|p| interface.name.starts_with(p.as_str()))
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    fn dispatch(&mut self, device: &str, interface: &'a InterfaceRecord) -> Result<(), CoreError> {
        let addresses = self.builder.interface_addresses(interface);
        debug!(device, interface = %interface.name, addresses = addresses.len(), "dispatching");

        if interface.is_loopback() {
            if let Some(dev) = self.graph.device_mut(device) {
                for address in addresses {
                    if !dev.loopback_addresses.contains(&address) {
                        dev.loopback_addresses.push(address);
                    }
                }
            }
            return Ok(());
        }

        if interface.name.starts_with("irb.") {
            if !addresses.is_empty() {
                if let Some(dev) = self.graph.device_mut(device) {
                    dev.irb_interfaces.insert(interface.name.clone(), addresses);
                }
            }
            return Ok(());
        }

        if addresses.is_empty() {
            return self.handle_layer2(device, interface);
        }

        if self.is_tunnel(interface) {
            return self.handle_generic_transport(device, interface, addresses);
        }

        if interface.parent.is_some() {
            if self.is_switch_facing(interface) {
                return self.handle_switch_facing(device, interface, addresses);
            }
            return self.handle_sub_interface(device, interface, addresses);
        }

        if let Some(hop) = self.resolver.circuit_of(interface) {
            return self.handle_circuit(device, interface, addresses, hop);
        }

        if self.is_switch_facing(interface) {
            return self.handle_switch_facing(device, interface, addresses);
        }

        self.handle_generic_transport(device, interface, addresses)
    }

    fn is_tunnel(&self, interface: &InterfaceRecord) -> bool {
        self.config
            .tunnel_prefixes
            .iter()
            .any(|p| interface.name.starts_with(p.as_str()))
    }

    fn is_switch_facing(&self, interface: &InterfaceRecord) -> bool {
        !self.config.switch_facing_prefix.is_empty()
            && interface
                .description
                .starts_with(self.config.switch_facing_prefix.as_str())
    }

    /// Whether a sub-interface of `interface` faces a switch. Such ports
    /// are linked to the bridge device, never to the switch itself.
    fn has_switch_facing_units(&self, interface: &InterfaceRecord) -> bool {
        self.inventory
            .chassis_interfaces(interface.device_id)
            .into_iter()
            .filter(|i| i.parent.as_ref().is_some_and(|p| p.id == interface.id))
            .any(|i| self.is_switch_facing(i))
    }

    // ── Handlers ─────────────────────────────────────────────────────

    /// Port with no addresses: an L2 trunk/access port or an aggregate
    /// parent. Links to whatever is cabled, except hosts, which only join
    /// through the hosts pass.
    fn handle_layer2(&mut self, device: &str, interface: &'a InterfaceRecord) -> Result<(), CoreError> {
        let cabled = interface.is_lag()
            || interface.link_peer.is_some()
            || interface.connected_interface.is_some();
        if !cabled {
            debug!(device, interface = %interface.name, "no cable, skipping");
            return Ok(());
        }
        if self.has_switch_facing_units(interface) {
            debug!(device, interface = %interface.name, "port is bridged through its units");
            return Ok(());
        }

        match self.resolver.link_far_side(interface) {
            Ok(far) => {
                if self.is_host(far) {
                    debug!(device, interface = %interface.name, "far side is a host, deferring");
                    return Ok(());
                }
                self.connect(interface, Vec::new(), &interface.description, far, None)
            }
            Err(gap) => {
                self.record(gap, device, interface);
                Ok(())
            }
        }
    }

    /// 802.1Q sub-interface: materialize the parent's link and record the
    /// sub-interface against the parent. Without a far side the
    /// sub-interface is treated as a routed transport (VPLS and similar).
    fn handle_sub_interface(
        &mut self,
        device: &str,
        interface: &'a InterfaceRecord,
        addresses: Vec<Address>,
    ) -> Result<(), CoreError> {
        let Some(parent) = self.parent_of(device, interface) else {
            return Ok(());
        };
        let Some(vlan) = sub_interface_vlan(interface) else {
            warn!(device, interface = %interface.name, "no VLAN id derivable, treating as transport");
            return self.handle_generic_transport(device, interface, addresses);
        };

        let far = match self.resolver.link_far_side(parent) {
            Ok(far) => far,
            Err(gap) => {
                if gap.kind != DiagnosticKind::UnresolvedFarSide {
                    self.record(gap, device, parent);
                }
                return self.handle_generic_transport(device, interface, addresses);
            }
        };

        if self.is_host(far) {
            self.builder
                .ensure_physical_interface(&mut self.graph, parent, Vec::new(), &parent.description);
        } else {
            self.connect(parent, Vec::new(), &parent.description, far, None)?;
        }

        if let Some(dev) = self.graph.device_mut(device) {
            dev.ensure_sub_interface(&interface.name, &parent.name, vlan, addresses);
        }
        Ok(())
    }

    fn handle_circuit(
        &mut self,
        device: &str,
        interface: &'a InterfaceRecord,
        addresses: Vec<Address>,
        hop: CircuitHop<'a>,
    ) -> Result<(), CoreError> {
        match hop.circuit.kind {
            CircuitKind::Transit => self.handle_transit(device, interface, addresses, hop),
            CircuitKind::Transport => match self.resolver.circuit_far_side(interface) {
                Ok(far) => self.connect(interface, addresses, &interface.description, far, None),
                Err(gap) => {
                    debug!(device, interface = %interface.name, reason = %gap.detail, "circuit far side unknown, inferring from addresses");
                    self.handle_generic_transport(device, interface, addresses)
                }
            },
            CircuitKind::Peering | CircuitKind::Other(_) => {
                self.record(
                    Gap {
                        kind: DiagnosticKind::UnsupportedCircuit,
                        detail: format!(
                            "{} circuit {} ({:?}) is not modelled",
                            hop.circuit.provider, hop.circuit.cid, hop.circuit.kind
                        ),
                    },
                    device,
                    interface,
                );
                Ok(())
            }
        }
    }

    /// Transit circuit: link to the simulated upstream device instead of
    /// the carrier, and record the provider session group keyed by ASN.
    fn handle_transit(
        &mut self,
        device: &str,
        interface: &'a InterfaceRecord,
        addresses: Vec<Address>,
        hop: CircuitHop<'a>,
    ) -> Result<(), CoreError> {
        let description = format!("{} Transit CCT {}", hop.circuit.provider, hop.circuit.cid);
        let local = self.builder.ensure_physical_interface(
            &mut self.graph,
            interface,
            addresses.clone(),
            &description,
        );

        let peers = self.config.transits.peers_for(device);
        let isp_name = self.config.isp_device.as_str();
        let isp = self.graph.ensure_synthetic_device(
            isp_name,
            DeviceKind::IspSimulation,
            DeviceSubType::IspRouter,
        );
        let isp_port = isp.next_eth_name();

        let mut isp_addresses = Vec::new();
        for address in &addresses {
            let Some(peer) = peers.iter().find(|p| address.contains(p.ip)) else {
                continue;
            };
            if let Some(peer_address) = Address::new(peer.ip, address.prefix_len()) {
                isp_addresses.push(peer_address);
            }
            isp.redundancy_groups
                .entry(peer.asn)
                .or_insert_with(|| RedundancyGroup {
                    provider_asn: peer.asn,
                    provider_name: peer.provider.clone(),
                    peer_addresses: Vec::new(),
                })
                .peer_addresses
                .push(address.ip());
        }
        if isp_addresses.is_empty() {
            warn!(device, interface = %interface.name, "no transit peer configured for this circuit's subnets");
        }

        isp.ensure_physical_interface(
            &isp_port,
            isp_addresses,
            &format!("Peering to {} {}", interface.device_name, interface.name),
            VlanMembership::default,
        );

        self.graph.add_link(
            LinkEnd {
                device: &local,
                interface: &interface.name,
                order_key: Some(interface.id),
            },
            LinkEnd {
                device: isp_name,
                interface: &isp_port,
                order_key: None,
            },
            None,
        )?;
        Ok(())
    }

    /// Gateway interface facing a switch the lab represents as a Linux
    /// bridge. The VLAN unit is added to the bridge port.
    fn handle_switch_facing(
        &mut self,
        device: &str,
        interface: &'a InterfaceRecord,
        addresses: Vec<Address>,
    ) -> Result<(), CoreError> {
        let (physical, vlan) = if interface.parent.is_some() {
            let Some(parent) = self.parent_of(device, interface) else {
                return Ok(());
            };
            (parent, sub_interface_vlan(interface))
        } else {
            (interface, None)
        };

        let far = match self.resolver.link_far_side(physical) {
            Ok(far) => far,
            Err(gap) => {
                self.record(gap, device, physical);
                return Ok(());
            }
        };

        let switch = self.inventory.canonical_device_name(far);
        let bridge = bridge_name(&switch);
        let physical_addresses = if physical.id == interface.id {
            addresses.clone()
        } else {
            Vec::new()
        };

        let local = self.builder.ensure_physical_interface(
            &mut self.graph,
            physical,
            physical_addresses,
            &format!("Link to {bridge}"),
        );

        let bridge_device =
            self.graph
                .ensure_synthetic_device(&bridge, DeviceKind::Bridge, DeviceSubType::Bridge);
        let owned_bridge = bridge_device.kind == DeviceKind::Bridge;
        let port = bridge_device.ensure_physical_interface(
            &far.name,
            Vec::new(),
            &format!("Link to {local}"),
            VlanMembership::default,
        );
        if let (true, Some(vlan)) = (owned_bridge, vlan) {
            if !port.allowed_vlans.contains(&vlan) {
                port.allowed_vlans.push(vlan);
            }
        }

        let description = format!("{local} {} to {bridge} {}", physical.name, far.name);
        self.graph.add_link(
            LinkEnd {
                device: &local,
                interface: &physical.name,
                order_key: Some(physical.id),
            },
            LinkEnd {
                device: &bridge,
                interface: &far.name,
                order_key: Some(far.id),
            },
            Some(&description),
        )?;

        if physical.id != interface.id {
            let vlan = vlan.unwrap_or_default();
            if let Some(dev) = self.graph.device_mut(device) {
                dev.ensure_sub_interface(&interface.name, &physical.name, vlan, addresses);
            }
        }
        Ok(())
    }

    /// Last resort: find the far side by subnet membership.
    fn handle_generic_transport(
        &mut self,
        device: &str,
        interface: &'a InterfaceRecord,
        addresses: Vec<Address>,
    ) -> Result<(), CoreError> {
        match self.resolver.by_address(interface, &addresses) {
            Ok(far) => self.connect(interface, addresses, &interface.description, far, None),
            Err(gap) => {
                self.record(gap, device, interface);
                Ok(())
            }
        }
    }

    // ── Hosts pass ───────────────────────────────────────────────────

    /// Attach requested hosts to switches already in the graph.
    fn hosts_pass(&mut self) -> Result<(), CoreError> {
        let (inventory, config) = (self.inventory, self.config);
        if config.hosts.is_empty() {
            return Ok(());
        }
        let devices = inventory.devices();

        for host_name in &config.hosts {
            let Some(host) = devices.iter().copied().find(|d| &d.name == host_name) else {
                warn!(host = %host_name, "requested host not found in inventory");
                continue;
            };
            info!(host = %host_name, "attaching host");

            for interface in inventory.chassis_interfaces(host.id) {
                if !interface.enabled || interface.mgmt_only || !self.visited.insert(interface.id) {
                    continue;
                }
                self.attach_host_interface(host, interface)?;
            }
        }
        Ok(())
    }

    fn attach_host_interface(
        &mut self,
        host: &'a DeviceRecord,
        interface: &'a InterfaceRecord,
    ) -> Result<(), CoreError> {
        if let Ok(far) = self.resolver.link_far_side(interface) {
            let switch = self.inventory.canonical_device_name(far);
            if far.enabled && self.graph.device(&switch).is_some() {
                let addresses = self.builder.interface_addresses(interface);
                self.connect(interface, addresses, &interface.description, far, None)?;
            }
        }

        if interface.parent.is_none() {
            return Ok(());
        }
        let name = host.canonical_name();
        if self.graph.device(&name).is_none() {
            return Ok(());
        }
        let Some(parent) = self.parent_of(&name, interface) else {
            return Ok(());
        };
        if self.resolver.link_far_side(parent).is_err() {
            return Ok(());
        }
        if let Some(vlan) = sub_interface_vlan(interface) {
            let addresses = self.builder.interface_addresses(interface);
            if let Some(dev) = self.graph.device_mut(&name) {
                dev.ensure_sub_interface(&interface.name, &parent.name, vlan, addresses);
            }
        }
        Ok(())
    }

    // ── Helpers ──────────────────────────────────────────────────────

    /// Materialize both ends and the link between them.
    fn connect(
        &mut self,
        local: &'a InterfaceRecord,
        local_addresses: Vec<Address>,
        local_description: &str,
        far: &'a InterfaceRecord,
        description: Option<&str>,
    ) -> Result<(), CoreError> {
        let local_device = self.builder.ensure_physical_interface(
            &mut self.graph,
            local,
            local_addresses,
            local_description,
        );
        let far_addresses = self.builder.interface_addresses(far);
        let far_device =
            self.builder
                .ensure_physical_interface(&mut self.graph, far, far_addresses, &far.description);

        let added = self.graph.add_link(
            LinkEnd {
                device: &local_device,
                interface: &local.name,
                order_key: Some(local.id),
            },
            LinkEnd {
                device: &far_device,
                interface: &far.name,
                order_key: Some(far.id),
            },
            description,
        )?;
        if added {
            debug!(a = %local_device, a_int = %local.name, b = %far_device, b_int = %far.name, "link added");
        }
        Ok(())
    }

    fn parent_of(&mut self, device: &str, interface: &'a InterfaceRecord) -> Option<&'a InterfaceRecord> {
        let inventory = self.inventory;
        let parent_ref = interface.parent.as_ref()?;
        let found = inventory
            .interface(parent_ref.id)
            .filter(|p| {
                inventory.canonical_device_name(p) == inventory.canonical_device_name(interface)
            })
            .or_else(|| {
                inventory
                    .chassis_interfaces(interface.device_id)
                    .into_iter()
                    .find(|p| p.name == parent_ref.name)
            });
        if found.is_none() {
            self.record(
                Gap {
                    kind: DiagnosticKind::MissingParentInterface,
                    detail: format!("parent {} not found", parent_ref.name),
                },
                device,
                interface,
            );
        }
        found
    }

    fn is_host(&self, interface: &InterfaceRecord) -> bool {
        self.inventory
            .device(interface.device_id)
            .is_some_and(|d| self.config.classification.is_host(d))
    }

    /// One diagnostic per interface and kind, however many units share
    /// the broken parent.
    fn record(&mut self, gap: Gap, device: &str, interface: &InterfaceRecord) {
        if !self.diagnosed.insert((interface.id, gap.kind)) {
            debug!(device, interface = %interface.name, kind = %gap.kind, "already diagnosed");
            return;
        }
        warn!(device, interface = %interface.name, kind = %gap.kind, "{}", gap.detail);
        self.diagnostics.push(Diagnostic {
            kind: gap.kind,
            device: device.to_owned(),
            interface: interface.name.clone(),
            detail: gap.detail,
        });
    }
}
