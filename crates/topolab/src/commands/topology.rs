//! Topology command: the container-lab descriptor for a resolved graph.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;

use topolab_config::TopologySection;
use topolab_core::{DeviceKind, Graph};

use crate::cli::{GlobalOpts, TopologyArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output;

// ── Descriptor document ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct Descriptor {
    pub name: String,
    pub mgmt: Mgmt,
    pub topology: Topology,
}

#[derive(Debug, Serialize)]
pub struct Mgmt {
    pub network: String,
    pub bridge: String,
    #[serde(rename = "external-access")]
    pub external_access: bool,
}

#[derive(Debug, Serialize)]
pub struct Topology {
    pub nodes: IndexMap<String, Node>,
    pub links: Vec<LinkEntry>,
}

#[derive(Debug, Serialize)]
pub struct Node {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub binds: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkEntry {
    pub endpoints: [String; 2],
}

/// Build the descriptor. Node kind and image follow the device family.
pub fn descriptor(graph: &Graph, name: &str, section: &TopologySection) -> Descriptor {
    let nodes = graph
        .devices
        .values()
        .map(|device| {
            let node = match device.kind {
                DeviceKind::RoutingNode | DeviceKind::IspSimulation => Node {
                    kind: "crpd",
                    image: Some(section.routing_image.clone()),
                    license: section.license.clone(),
                    binds: section.binds.clone(),
                },
                DeviceKind::Bridge => Node {
                    kind: "bridge",
                    image: None,
                    license: None,
                    binds: Vec::new(),
                },
                DeviceKind::LinuxSwitch | DeviceKind::Host => Node {
                    kind: "linux",
                    image: Some(section.linux_image.clone()),
                    license: None,
                    binds: section.binds.clone(),
                },
            };
            (device.name.clone(), node)
        })
        .collect();

    let links = graph
        .links
        .values()
        .map(|link| LinkEntry {
            endpoints: [link.a.to_string(), link.b.to_string()],
        })
        .collect();

    Descriptor {
        name: name.to_owned(),
        mgmt: Mgmt {
            network: section.mgmt_network.clone(),
            bridge: section.mgmt_network.clone(),
            external_access: false,
        },
        topology: Topology { nodes, links },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: TopologyArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let resolution = super::resolve_graph(cfg, global).await?;
    let name = args.name.as_deref().unwrap_or(&cfg.resolve.name);
    let doc = descriptor(&resolution.graph, name, &cfg.topology);

    if let Some(path) = args.write {
        std::fs::write(&path, output::render_yaml(&doc)?)?;
        if !global.quiet {
            eprintln!("Wrote {}", path.display());
        }
        return Ok(());
    }

    let out = output::render_single(&global.output, &doc, output::render_yaml)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use topolab_core::DeviceSubType;
    use topolab_core::model::LinkEnd;

    fn lab_graph() -> Graph {
        let mut graph = Graph::new();
        for (name, kind, sub_type, port) in [
            ("cr1-eqiad", DeviceKind::RoutingNode, DeviceSubType::CoreRouter, "et-0/0/0"),
            ("asw1-b12-eqiad", DeviceKind::LinuxSwitch, DeviceSubType::L2Switch, "ge-0/0/1"),
            ("isp_router", DeviceKind::IspSimulation, DeviceSubType::IspRouter, "eth1"),
        ] {
            graph
                .ensure_synthetic_device(name, kind, sub_type)
                .ensure_physical_interface(port, vec![], "", Default::default);
        }
        graph
            .add_link(
                LinkEnd {
                    device: "cr1-eqiad",
                    interface: "et-0/0/0",
                    order_key: Some(1),
                },
                LinkEnd {
                    device: "asw1-b12-eqiad",
                    interface: "ge-0/0/1",
                    order_key: Some(2),
                },
                Some("uplink"),
            )
            .unwrap();
        graph
    }

    #[test]
    fn kinds_and_images_follow_device_family() {
        let section = TopologySection {
            license: Some("crpd.lic".into()),
            ..TopologySection::default()
        };
        let doc = descriptor(&lab_graph(), "eqiad-lab", &section);

        let cr = &doc.topology.nodes["cr1-eqiad"];
        assert_eq!(cr.kind, "crpd");
        assert_eq!(cr.image.as_deref(), Some("crpd"));
        assert!(cr.license.is_some());

        let asw = &doc.topology.nodes["asw1-b12-eqiad"];
        assert_eq!(asw.kind, "linux");
        assert_eq!(asw.image.as_deref(), Some("debian:latest"));
        assert!(asw.license.is_none());

        assert_eq!(doc.topology.nodes["isp_router"].kind, "crpd");
    }

    #[test]
    fn yaml_shape_matches_lab_format() {
        let doc = descriptor(&lab_graph(), "eqiad-lab", &TopologySection::default());
        let yaml = serde_yaml::to_string(&doc).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(value["name"].as_str(), Some("eqiad-lab"));
        assert_eq!(value["mgmt"]["external-access"].as_bool(), Some(false));
        let endpoints = &value["topology"]["links"][0]["endpoints"];
        assert_eq!(endpoints[0].as_str(), Some("cr1-eqiad:et-0_0_0"));
        assert_eq!(endpoints[1].as_str(), Some("asw1-b12-eqiad:ge-0_0_1"));
    }
}
