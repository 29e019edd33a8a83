// ── Engine configuration ──
//
// Plain values the engine needs; loading them from files and the
// environment is the job of `topolab-config`.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::inventory::DeviceRecord;
use crate::model::{DeviceKind, DeviceSubType};

// ── Role classification ─────────────────────────────────────────────

/// Role slugs mapped to each device class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub core_router_roles: Vec<String>,
    pub l3_switch_roles: Vec<String>,
    pub access_switch_roles: Vec<String>,
    pub host_roles: Vec<String>,
    pub lvs_roles: Vec<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            core_router_roles: vec!["cr".into()],
            l3_switch_roles: vec!["cloudsw".into()],
            access_switch_roles: vec!["asw".into()],
            host_roles: vec!["server".into()],
            lvs_roles: vec!["lvs".into()],
        }
    }
}

impl Classification {
    /// Kind and sub-type for a device. Core-router roles are checked
    /// first. Access switches are routed only when their FQDN is listed in
    /// `l3_switches`; unknown roles are treated as core routers.
    pub fn classify(
        &self,
        device: &DeviceRecord,
        l3_switches: &BTreeSet<String>,
    ) -> (DeviceKind, DeviceSubType) {
        if device.has_role(&self.core_router_roles) {
            (DeviceKind::RoutingNode, DeviceSubType::CoreRouter)
        } else if device.has_role(&self.l3_switch_roles) {
            (DeviceKind::RoutingNode, DeviceSubType::L3Switch)
        } else if device.has_role(&self.access_switch_roles) {
            let routed = device
                .fqdn()
                .is_some_and(|fqdn| l3_switches.contains(&fqdn));
            if routed {
                (DeviceKind::RoutingNode, DeviceSubType::L3Switch)
            } else {
                (DeviceKind::LinuxSwitch, DeviceSubType::L2Switch)
            }
        } else if device.has_role(&self.host_roles) {
            (DeviceKind::Host, DeviceSubType::Host)
        } else if device.has_role(&self.lvs_roles) {
            (DeviceKind::Host, DeviceSubType::Lvs)
        } else {
            (DeviceKind::RoutingNode, DeviceSubType::CoreRouter)
        }
    }

    /// Roles whose devices only join the graph through the hosts pass.
    pub fn is_host(&self, device: &DeviceRecord) -> bool {
        device.has_role(&self.host_roles) || device.has_role(&self.lvs_roles)
    }
}

// ── Transit peers ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitPeer {
    pub ip: IpAddr,
    pub asn: u32,
    pub provider: String,
}

/// Per-device transit peers, keyed by canonical (short) device name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitTable {
    peers: BTreeMap<String, Vec<TransitPeer>>,
}

impl TransitTable {
    /// Build and validate the table.
    ///
    /// `devices` yields `(device fqdn, [(peer ip, provider name)])`;
    /// `provider_asns` maps provider names to their ASN. A peer whose IP
    /// does not parse or whose provider has no ASN is fatal.
    pub fn build<'a, D, P>(
        devices: D,
        provider_asns: &BTreeMap<String, u32>,
    ) -> Result<Self, CoreError>
    where
        D: IntoIterator<Item = (&'a str, P)>,
        P: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut peers: BTreeMap<String, Vec<TransitPeer>> = BTreeMap::new();

        for (fqdn, device_peers) in devices {
            let short = fqdn.split('.').next().unwrap_or(fqdn).to_owned();
            for (peer, provider) in device_peers {
                let malformed = |reason: String| CoreError::MalformedTransitTable {
                    device: fqdn.to_owned(),
                    peer: peer.to_owned(),
                    reason,
                };
                let ip: IpAddr = peer
                    .parse()
                    .map_err(|_| malformed("peer is not an IP address".into()))?;
                let asn = *provider_asns
                    .get(provider)
                    .ok_or_else(|| malformed(format!("provider {provider:?} has no ASN")))?;
                peers.entry(short.clone()).or_default().push(TransitPeer {
                    ip,
                    asn,
                    provider: provider.to_owned(),
                });
            }
        }

        for list in peers.values_mut() {
            list.sort_by_key(|p| p.ip);
        }
        Ok(Self { peers })
    }

    pub fn peers_for(&self, device: &str) -> &[TransitPeer] {
        self.peers.get(device).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ── Resolution settings ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Device roles traversed in the main pass.
    pub roles: Vec<String>,
    /// Device statuses traversed in the main pass.
    pub statuses: Vec<String>,
    /// Host names added after the main pass.
    pub hosts: Vec<String>,
    /// Name of the simulated upstream device.
    pub isp_device: String,
    /// Description prefix marking switch-facing gateway interfaces.
    pub switch_facing_prefix: String,
    /// Interface name prefixes treated as management ports.
    pub mgmt_prefixes: Vec<String>,
    /// Interface name prefixes for tunnels resolved only by address.
    pub tunnel_prefixes: Vec<String>,
    pub classification: Classification,
    /// FQDNs of access switches that route (`l3_switch = true`).
    pub l3_switches: BTreeSet<String>,
    pub transits: TransitTable,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            roles: vec!["cr".into(), "cloudsw".into()],
            statuses: vec!["active".into()],
            hosts: Vec::new(),
            isp_device: "isp_router".into(),
            switch_facing_prefix: "Subnet".into(),
            mgmt_prefixes: vec!["fxp".into()],
            tunnel_prefixes: vec!["gr-".into()],
            classification: Classification::default(),
            l3_switches: BTreeSet::new(),
            transits: TransitTable::default(),
        }
    }
}

impl ResolveConfig {
    /// Whether a device is part of the main traversal.
    pub fn selects(&self, device: &DeviceRecord) -> bool {
        let status_ok = self.statuses.is_empty()
            || device
                .status
                .as_deref()
                .is_some_and(|s| self.statuses.iter().any(|want| want == s));
        device.has_role(&self.roles) && status_ok
    }
}

// ── Fetch settings ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    pub roles: Vec<String>,
    pub statuses: Vec<String>,
    pub hosts: Vec<String>,
    /// Concurrent in-flight device bundle fetches.
    pub concurrency: usize,
    /// Rounds of reference following after the seed devices.
    pub max_waves: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            roles: vec!["cr".into(), "cloudsw".into()],
            statuses: vec!["active".into()],
            hosts: Vec::new(),
            concurrency: 8,
            max_waves: 3,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn device(role: &str, dns: Option<&str>) -> DeviceRecord {
        DeviceRecord {
            id: 1,
            name: "dev1".into(),
            role: Some(role.into()),
            status: Some("active".into()),
            virtual_chassis: None,
            primary_ip4_dns: dns.map(Into::into),
            primary_ip6_dns: None,
        }
    }

    #[test]
    fn classifies_roles() {
        let c = Classification::default();
        let none = BTreeSet::new();
        assert_eq!(
            c.classify(&device("cr", None), &none),
            (DeviceKind::RoutingNode, DeviceSubType::CoreRouter)
        );
        assert_eq!(
            c.classify(&device("cloudsw", None), &none),
            (DeviceKind::RoutingNode, DeviceSubType::L3Switch)
        );
        assert_eq!(
            c.classify(&device("asw", None), &none),
            (DeviceKind::LinuxSwitch, DeviceSubType::L2Switch)
        );
        assert_eq!(
            c.classify(&device("server", None), &none),
            (DeviceKind::Host, DeviceSubType::Host)
        );
        assert_eq!(
            c.classify(&device("mystery", None), &none),
            (DeviceKind::RoutingNode, DeviceSubType::CoreRouter)
        );
    }

    #[test]
    fn core_router_roles_take_precedence() {
        let c = Classification {
            core_router_roles: vec!["cr".into(), "cloudsw".into()],
            ..Classification::default()
        };
        assert_eq!(
            c.classify(&device("cloudsw", None), &BTreeSet::new()),
            (DeviceKind::RoutingNode, DeviceSubType::CoreRouter)
        );
    }

    #[test]
    fn routed_access_switch_by_fqdn() {
        let c = Classification::default();
        let l3: BTreeSet<String> = ["asw1.eqiad.wmnet".to_owned()].into();
        assert_eq!(
            c.classify(&device("asw", Some("asw1.eqiad.wmnet")), &l3),
            (DeviceKind::RoutingNode, DeviceSubType::L3Switch)
        );
    }

    #[test]
    fn transit_table_keys_by_short_name() {
        let asns: BTreeMap<String, u32> = [("telia".to_owned(), 1299)].into();
        let table = TransitTable::build(
            [("cr1-eqiad.wikimedia.org", vec![("80.239.192.101", "telia")])],
            &asns,
        )
        .unwrap();
        let peers = table.peers_for("cr1-eqiad");
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].asn, 1299);
        assert!(table.peers_for("cr2-eqiad").is_empty());
    }

    #[test]
    fn transit_without_asn_is_malformed() {
        let asns = BTreeMap::new();
        let err = TransitTable::build(
            [("cr1-eqiad.wikimedia.org", vec![("80.239.192.101", "telia")])],
            &asns,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::MalformedTransitTable { .. }));
    }

    #[test]
    fn transit_with_bad_ip_is_malformed() {
        let asns: BTreeMap<String, u32> = [("telia".to_owned(), 1299)].into();
        let err = TransitTable::build([("cr1", vec![("not-an-ip", "telia")])], &asns).unwrap_err();
        assert!(err.to_string().contains("not an IP"));
    }

    #[test]
    fn selection_uses_role_and_status() {
        let config = ResolveConfig::default();
        assert!(config.selects(&device("cr", None)));
        assert!(!config.selects(&device("asw", None)));
        let mut planned = device("cr", None);
        planned.status = Some("planned".into());
        assert!(!config.selects(&planned));
    }
}
