// ── Upstream route plan for the simulated ISP ──
//
// For each transit provider peering with the isp-simulation device, the
// AS paths it should announce. Path lengths are varied by a seeded hash so
// a lab run is reproducible but providers do not all look identical.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::model::{DeviceKind, Graph};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrependPolicy {
    pub seed: u64,
    /// Upper bound (inclusive) on prepends per path.
    pub max_prepends: u32,
}

impl Default for PrependPolicy {
    fn default() -> Self {
        Self {
            seed: 0,
            max_prepends: 2,
        }
    }
}

impl PrependPolicy {
    /// Number of times `asn` is prepended to `path`. Stable for a seed.
    pub fn prepends(&self, path: &[u32], asn: u32) -> u32 {
        let mut hash = FNV_OFFSET;
        let mut feed = |bytes: &[u8]| {
            for byte in bytes {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        };
        feed(&self.seed.to_be_bytes());
        for hop in path {
            feed(&hop.to_be_bytes());
        }
        feed(&asn.to_be_bytes());

        let buckets = u64::from(self.max_prepends) + 1;
        u32::try_from(hash % buckets).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandedPath {
    pub path: Vec<u32>,
    pub prepends: u32,
    /// What the provider announces: its ASN `prepends` times, then `path`
    /// with the provider's own ASN removed.
    pub as_path: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderPlan {
    pub asn: u32,
    pub provider: String,
    /// Export policy name on the simulated ISP, e.g. `TELIA-OUT`.
    pub policy: String,
    pub peers: Vec<IpAddr>,
    pub paths: Vec<ExpandedPath>,
}

/// Build the plan from every redundancy group in the graph, ordered by ASN.
pub fn plan(graph: &Graph, paths: &[Vec<u32>], policy: &PrependPolicy) -> Vec<ProviderPlan> {
    graph
        .devices
        .values()
        .filter(|d| d.kind == DeviceKind::IspSimulation)
        .flat_map(|d| d.redundancy_groups.values())
        .map(|group| {
            let asn = group.provider_asn;
            let paths = paths
                .iter()
                .map(|path| {
                    let prepends = policy.prepends(path, asn);
                    let as_path = std::iter::repeat_n(asn, usize::try_from(prepends).unwrap_or(0))
                        .chain(path.iter().copied().filter(|hop| *hop != asn))
                        .collect();
                    ExpandedPath {
                        path: path.clone(),
                        prepends,
                        as_path,
                    }
                })
                .collect();
            ProviderPlan {
                asn,
                provider: group.provider_name.clone(),
                policy: format!("{}-OUT", group.provider_name.to_uppercase()),
                peers: group.peer_addresses.clone(),
                paths,
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Device, DeviceSubType, RedundancyGroup};

    fn isp_graph() -> Graph {
        let mut graph = Graph::default();
        let isp = graph.ensure_synthetic_device(
            "isp_router",
            DeviceKind::IspSimulation,
            DeviceSubType::IspRouter,
        );
        isp.redundancy_groups.insert(
            1299,
            RedundancyGroup {
                provider_asn: 1299,
                provider_name: "telia".into(),
                peer_addresses: vec!["80.239.192.102".parse().unwrap()],
            },
        );
        graph
    }

    #[test]
    fn prepends_are_stable_and_bounded() {
        let policy = PrependPolicy { seed: 7, max_prepends: 2 };
        let path = [1299, 3356, 64496];
        let first = policy.prepends(&path, 1299);
        assert_eq!(first, policy.prepends(&path, 1299));
        assert!(first <= 2);
        for asn in 1..200 {
            assert!(policy.prepends(&path, asn) <= 2);
        }
    }

    #[test]
    fn zero_max_never_prepends() {
        let policy = PrependPolicy { seed: 1, max_prepends: 0 };
        assert_eq!(policy.prepends(&[1, 2, 3], 1299), 0);
    }

    #[test]
    fn plan_strips_own_asn_and_prepends() {
        let policy = PrependPolicy::default();
        let path = vec![1299, 3356, 64496];
        let plans = plan(&isp_graph(), std::slice::from_ref(&path), &policy);
        assert_eq!(plans.len(), 1);

        let telia = &plans[0];
        assert_eq!(telia.policy, "TELIA-OUT");
        let expanded = &telia.paths[0];
        let n = policy.prepends(&path, 1299) as usize;
        assert_eq!(expanded.as_path.len(), n + 2);
        assert!(expanded.as_path[..n].iter().all(|hop| *hop == 1299));
        assert_eq!(&expanded.as_path[n..], &[3356, 64496]);
    }

    #[test]
    fn no_isp_device_means_empty_plan() {
        let mut graph = Graph::default();
        graph.ensure_device("cr1", || {
            Device::new("cr1", DeviceKind::RoutingNode, DeviceSubType::CoreRouter, None)
        });
        assert!(plan(&graph, &[vec![64496]], &PrependPolicy::default()).is_empty());
    }
}
