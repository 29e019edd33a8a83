// ── Resolved topology graph ──
//
// The single value the driver builds and hands to emitters. Devices are
// keyed by canonical name, links by their canonical composite id.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use super::device::{Device, DeviceKind, DeviceSubType};
use super::link::{Endpoint, Link, LinkId};
use crate::error::CoreError;

/// A link endpoint as seen by the caller, before canonical ordering.
#[derive(Debug, Clone, Copy)]
pub struct LinkEnd<'a> {
    pub device: &'a str,
    /// Inventory (raw) interface name; the interface must already exist.
    pub interface: &'a str,
    /// Stable tie-break key, the inventory interface id. Synthetic
    /// interfaces have none and sort after inventory ones.
    pub order_key: Option<u64>,
}

impl LinkEnd<'_> {
    fn sort_key(&self) -> (bool, u64, &str, &str) {
        (
            self.order_key.is_none(),
            self.order_key.unwrap_or_default(),
            self.device,
            self.interface,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    pub devices: IndexMap<String, Device>,
    #[serde(serialize_with = "links_as_list")]
    pub links: IndexMap<LinkId, Link>,
}

fn links_as_list<S: Serializer>(
    links: &IndexMap<LinkId, Link>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(links.values())
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create a device by canonical name. `make` runs only on the
    /// first call for a name; later calls return the existing device.
    pub fn ensure_device(&mut self, name: &str, make: impl FnOnce() -> Device) -> &mut Device {
        self.devices.entry(name.to_owned()).or_insert_with(make)
    }

    /// Shorthand for engine-owned devices (ISP simulation, bridges).
    pub fn ensure_synthetic_device(
        &mut self,
        name: &str,
        kind: DeviceKind,
        sub_type: DeviceSubType,
    ) -> &mut Device {
        self.ensure_device(name, || Device::new(name, kind, sub_type, None))
    }

    pub fn device(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn device_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.devices.get_mut(name)
    }

    /// Add the link between two existing interfaces.
    ///
    /// Endpoints are put in canonical order (lower inventory interface id
    /// first) before the id is built, so rediscovering the same connection
    /// from the far side is a no-op. Returns `true` if a new link was added.
    pub fn add_link(
        &mut self,
        x: LinkEnd<'_>,
        y: LinkEnd<'_>,
        description: Option<&str>,
    ) -> Result<bool, CoreError> {
        let (first, second) = if x.sort_key() <= y.sort_key() {
            (x, y)
        } else {
            (y, x)
        };

        let a = self.endpoint(first)?;
        let b = self.endpoint(second)?;
        let id = LinkId::new(&a, &b);

        if self.links.contains_key(&id) {
            return Ok(false);
        }

        let description = match description {
            Some(d) if !d.is_empty() => d.to_owned(),
            _ => format!(
                "{} {} to {} {}",
                first.device, first.interface, second.device, second.interface
            ),
        };

        self.links.insert(id, Link { a, b, description });
        Ok(true)
    }

    fn endpoint(&self, end: LinkEnd<'_>) -> Result<Endpoint, CoreError> {
        let interface = self
            .devices
            .get(end.device)
            .and_then(|d| d.normalized_interface(end.interface))
            .ok_or_else(|| CoreError::MissingEndpoint {
                device: end.device.to_owned(),
                interface: end.interface.to_owned(),
            })?;
        Ok(Endpoint {
            device: end.device.to_owned(),
            interface: interface.to_owned(),
        })
    }

    /// Device name to FQDN, for devices that have one.
    pub fn fqdn_map(&self) -> IndexMap<String, String> {
        self.devices
            .values()
            .filter_map(|d| d.fqdn.clone().map(|fqdn| (d.name.clone(), fqdn)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::device::VlanMembership;

    fn graph_with_ports() -> Graph {
        let mut graph = Graph::new();
        for (dev, port) in [("r1", "et-0/0/0"), ("r2", "et-0/0/1")] {
            graph
                .ensure_synthetic_device(dev, DeviceKind::RoutingNode, DeviceSubType::CoreRouter)
                .ensure_physical_interface(port, vec![], "", VlanMembership::default);
        }
        graph
    }

    fn end<'a>(device: &'a str, interface: &'a str, id: u64) -> LinkEnd<'a> {
        LinkEnd {
            device,
            interface,
            order_key: Some(id),
        }
    }

    #[test]
    fn ensure_device_is_idempotent() {
        let mut graph = Graph::new();
        graph.ensure_synthetic_device("r1", DeviceKind::RoutingNode, DeviceSubType::CoreRouter);
        graph.ensure_synthetic_device("r1", DeviceKind::Bridge, DeviceSubType::Bridge);
        assert_eq!(graph.devices.len(), 1);
        assert_eq!(graph.devices["r1"].kind, DeviceKind::RoutingNode);
    }

    #[test]
    fn link_is_symmetric() {
        let mut graph = graph_with_ports();
        assert!(graph
            .add_link(end("r2", "et-0/0/1", 20), end("r1", "et-0/0/0", 10), None)
            .unwrap());
        assert!(!graph
            .add_link(end("r1", "et-0/0/0", 10), end("r2", "et-0/0/1", 20), None)
            .unwrap());

        assert_eq!(graph.links.len(), 1);
        let link = graph.links.values().next().unwrap();
        assert_eq!(link.a.device, "r1");
        assert_eq!(link.a.interface, "et-0_0_0");
        assert_eq!(link.description, "r1 et-0/0/0 to r2 et-0/0/1");
    }

    #[test]
    fn order_follows_interface_id_not_name() {
        let mut graph = graph_with_ports();
        graph
            .add_link(end("r1", "et-0/0/0", 99), end("r2", "et-0/0/1", 5), None)
            .unwrap();
        let link = graph.links.values().next().unwrap();
        assert_eq!(link.a.device, "r2");
    }

    #[test]
    fn synthetic_endpoint_sorts_last() {
        let mut graph = graph_with_ports();
        let isp = LinkEnd {
            device: "r2",
            interface: "et-0/0/1",
            order_key: None,
        };
        graph
            .add_link(isp, end("r1", "et-0/0/0", 1_000), Some("transit"))
            .unwrap();
        let link = graph.links.values().next().unwrap();
        assert_eq!(link.a.device, "r1");
        assert_eq!(link.description, "transit");
    }

    #[test]
    fn missing_interface_is_an_error() {
        let mut graph = graph_with_ports();
        let err = graph
            .add_link(end("r1", "et-0/0/9", 1), end("r2", "et-0/0/1", 2), None)
            .unwrap_err();
        assert!(matches!(err, CoreError::MissingEndpoint { .. }));
    }

    #[test]
    fn links_serialize_as_list() {
        let mut graph = graph_with_ports();
        graph
            .add_link(end("r1", "et-0/0/0", 1), end("r2", "et-0/0/1", 2), None)
            .unwrap();
        let json = serde_json::to_value(&graph).unwrap();
        assert!(json["links"].is_array());
        assert_eq!(json["links"][0]["b"]["interface"], "et-0_0_1");
    }
}
