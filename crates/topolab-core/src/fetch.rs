// ── Concurrent inventory prefetch ──
//
// Builds an `InventorySnapshot` before any resolution starts, so the
// engine itself never blocks on the network. Device bundles (interfaces +
// addresses) are fetched in bounded waves; references found in one wave
// (cable peers, circuits, subnet neighbours) schedule the next.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use futures_util::future::try_join;
use futures_util::{StreamExt, TryStreamExt, stream};
use tracing::{debug, info};

use topolab_api::NetboxClient;
use topolab_api::types::DeviceFilter;

use crate::config::FetchConfig;
use crate::convert;
use crate::error::CoreError;
use crate::inventory::{LinkPeer, RecordId};
use crate::model::Address;
use crate::snapshot::InventorySnapshot;

/// Fetch everything a resolution over `config`'s devices needs.
///
/// Any adapter failure aborts the whole fetch.
pub async fn fetch_snapshot(
    client: &NetboxClient,
    config: &FetchConfig,
) -> Result<InventorySnapshot, CoreError> {
    let mut fetcher = Fetcher::new(client, config.concurrency);
    fetcher.snapshot.source = Some(client.base_url().to_string());

    fetcher.seed(config).await?;
    fetcher.fetch_fhrp().await?;

    let mut wave = 0;
    loop {
        let pending = fetcher.unbundled();
        if pending.is_empty() {
            break;
        }
        info!(wave, devices = pending.len(), "fetching device bundles");
        fetcher.fetch_bundles(pending).await?;
        fetcher.follow_references().await?;

        wave += 1;
        if wave > config.max_waves {
            debug!(wave, "wave limit reached");
            break;
        }
    }

    let snapshot = fetcher.snapshot;
    info!(
        devices = snapshot.devices.len(),
        interfaces = snapshot.interfaces.len(),
        addresses = snapshot.addresses.len(),
        circuits = snapshot.circuits.len(),
        "inventory fetched"
    );
    Ok(snapshot)
}

/// Run `fetch` for every id with at most `concurrency` requests in flight.
async fn fetch_each<T, F, Fut>(
    ids: Vec<RecordId>,
    concurrency: usize,
    fetch: F,
) -> Result<Vec<T>, topolab_api::Error>
where
    F: FnMut(RecordId) -> Fut,
    Fut: Future<Output = Result<T, topolab_api::Error>>,
{
    stream::iter(ids)
        .map(fetch)
        .buffer_unordered(concurrency.max(1))
        .try_collect()
        .await
}

/// Ids not yet present in `known`, deduplicated and ascending.
fn missing<V>(ids: impl IntoIterator<Item = RecordId>, known: &BTreeMap<RecordId, V>) -> Vec<RecordId> {
    ids.into_iter()
        .filter(|id| !known.contains_key(id))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn peer_interface(peer: Option<&LinkPeer>) -> Option<RecordId> {
    match peer {
        Some(LinkPeer::Interface { id }) => Some(*id),
        _ => None,
    }
}

fn peer_circuit(peer: Option<&LinkPeer>) -> Option<RecordId> {
    match peer {
        Some(LinkPeer::CircuitTermination { circuit_id, .. }) => Some(*circuit_id),
        _ => None,
    }
}

struct Fetcher<'a> {
    client: &'a NetboxClient,
    concurrency: usize,
    snapshot: InventorySnapshot,
    /// Devices whose interfaces and addresses have been listed.
    bundled: BTreeSet<RecordId>,
    /// Subnets already queried for neighbours.
    subnets: BTreeSet<Address>,
}

impl<'a> Fetcher<'a> {
    fn new(client: &'a NetboxClient, concurrency: usize) -> Self {
        Self {
            client,
            concurrency,
            snapshot: InventorySnapshot::new(),
            bundled: BTreeSet::new(),
            subnets: BTreeSet::new(),
        }
    }

    // ── Seeds ────────────────────────────────────────────────────────

    async fn seed(&mut self, config: &FetchConfig) -> Result<(), CoreError> {
        let filter = DeviceFilter {
            roles: config.roles.clone(),
            statuses: config.statuses.clone(),
            names: Vec::new(),
        };
        for device in self.client.list_devices(&filter).await? {
            self.snapshot.insert_device(convert::device(&device));
        }

        if !config.hosts.is_empty() {
            let hosts = DeviceFilter {
                names: config.hosts.clone(),
                ..DeviceFilter::default()
            };
            for device in self.client.list_devices(&hosts).await? {
                self.snapshot.insert_device(convert::device(&device));
            }
        }

        info!(devices = self.snapshot.devices.len(), "seed devices listed");
        self.follow_devices().await
    }

    async fn fetch_fhrp(&mut self) -> Result<(), CoreError> {
        let (groups, assignments) = try_join(
            self.client.list_fhrp_groups(),
            self.client.list_fhrp_group_assignments(),
        )
        .await?;
        for group in &groups {
            self.snapshot.insert_fhrp_group(convert::fhrp_group(group));
        }
        for record in assignments.iter().filter_map(convert::fhrp_assignment) {
            self.snapshot.insert_fhrp_assignment(record);
        }
        debug!(groups = groups.len(), "fhrp groups fetched");
        Ok(())
    }

    // ── Device bundles ───────────────────────────────────────────────

    /// Interface sources of known devices that have not been bundled yet.
    fn unbundled(&self) -> Vec<RecordId> {
        self.snapshot
            .devices
            .values()
            .map(|d| d.interface_source())
            .filter(|id| !self.bundled.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    async fn fetch_bundles(&mut self, ids: Vec<RecordId>) -> Result<(), CoreError> {
        self.bundled.extend(ids.iter().copied());
        let client = self.client;
        let bundles = fetch_each(ids, self.concurrency, |id| async move {
            let (interfaces, addresses) = try_join(
                client.list_interfaces(id),
                client.list_ip_addresses_for_device(id),
            )
            .await?;
            Ok((id, interfaces, addresses))
        })
        .await?;

        for (id, interfaces, addresses) in bundles {
            debug!(device_id = id, interfaces = interfaces.len(), addresses = addresses.len(), "bundle");
            for interface in &interfaces {
                self.snapshot.insert_interface(convert::interface(interface));
            }
            for record in addresses.iter().filter_map(convert::address) {
                self.snapshot.insert_address(record);
            }
        }
        Ok(())
    }

    // ── Reference following ──────────────────────────────────────────

    async fn follow_references(&mut self) -> Result<(), CoreError> {
        self.follow_ports().await?;
        self.follow_circuits().await?;
        self.follow_subnets().await?;
        self.follow_interfaces().await?;
        self.follow_devices().await
    }

    /// Patch-panel hops: front port → rear port.
    async fn follow_ports(&mut self) -> Result<(), CoreError> {
        let client = self.client;
        let front_ids = missing(
            self.snapshot
                .interfaces
                .values()
                .filter_map(|i| match i.link_peer {
                    Some(LinkPeer::FrontPort { id }) => Some(id),
                    _ => None,
                }),
            &self.snapshot.front_ports,
        );
        for port in &fetch_each(front_ids, self.concurrency, |id| client.get_front_port(id)).await? {
            self.snapshot.insert_front_port(convert::front_port(port));
        }

        let rear_ids = missing(
            self.snapshot.front_ports.values().map(|p| p.rear_port_id),
            &self.snapshot.rear_ports,
        );
        for port in &fetch_each(rear_ids, self.concurrency, |id| client.get_rear_port(id)).await? {
            self.snapshot.insert_rear_port(convert::rear_port(port));
        }
        Ok(())
    }

    async fn follow_circuits(&mut self) -> Result<(), CoreError> {
        let client = self.client;
        let from_interfaces = self
            .snapshot
            .interfaces
            .values()
            .filter_map(|i| peer_circuit(i.link_peer.as_ref()));
        let from_rear_ports = self
            .snapshot
            .rear_ports
            .values()
            .filter_map(|p| peer_circuit(p.link_peer.as_ref()));
        let ids = missing(from_interfaces.chain(from_rear_ports), &self.snapshot.circuits);
        if ids.is_empty() {
            return Ok(());
        }

        debug!(circuits = ids.len(), "fetching circuits");
        let circuits = fetch_each(ids, self.concurrency, |id| {
            try_join(client.get_circuit(id), client.list_circuit_terminations(id))
        })
        .await?;
        for (circuit, terminations) in &circuits {
            self.snapshot.insert_circuit(convert::circuit(circuit));
            for termination in terminations {
                self.snapshot.insert_termination(convert::termination(termination));
            }
        }
        Ok(())
    }

    /// Neighbours in the subnets of interfaces with no cable metadata,
    /// which can only be resolved by address.
    async fn follow_subnets(&mut self) -> Result<(), CoreError> {
        let client = self.client;
        let uncabled: BTreeSet<RecordId> = self
            .snapshot
            .interfaces
            .values()
            .filter(|i| !i.is_loopback() && i.connected_interface.is_none())
            .filter(|i| {
                matches!(
                    i.link_peer,
                    None | Some(LinkPeer::CircuitTermination { .. })
                )
            })
            .map(|i| i.id)
            .collect();

        let networks: BTreeSet<Address> = self
            .snapshot
            .addresses
            .values()
            .filter(|a| a.interface_id.is_some_and(|id| uncabled.contains(&id)))
            .filter(|a| {
                let host_len = if a.address.is_ipv4() { 32 } else { 128 };
                a.address.prefix_len() < host_len
            })
            .map(|a| a.address.network())
            .filter(|n| !self.subnets.contains(n))
            .collect();
        if networks.is_empty() {
            return Ok(());
        }

        debug!(subnets = networks.len(), "fetching subnet neighbours");
        self.subnets.extend(networks.iter().copied());
        let prefixes: Vec<String> = networks.iter().map(ToString::to_string).collect();
        let neighbours: Vec<_> = stream::iter(prefixes)
            .map(|prefix| async move { client.list_ip_addresses_in(&prefix).await })
            .buffer_unordered(self.concurrency.max(1))
            .try_collect()
            .await?;
        for record in neighbours.iter().flatten().filter_map(convert::address) {
            self.snapshot.insert_address(record);
        }
        Ok(())
    }

    /// Interfaces referenced by cables, circuits or addresses that belong
    /// to devices not bundled yet.
    async fn follow_interfaces(&mut self) -> Result<(), CoreError> {
        let client = self.client;
        let snapshot = &self.snapshot;
        let referenced = snapshot
            .interfaces
            .values()
            .flat_map(|i| [peer_interface(i.link_peer.as_ref()), i.connected_interface])
            .chain(
                snapshot
                    .terminations
                    .values()
                    .map(|t| peer_interface(t.link_peer.as_ref())),
            )
            .chain(
                snapshot
                    .rear_ports
                    .values()
                    .map(|p| peer_interface(p.link_peer.as_ref())),
            )
            .chain(snapshot.addresses.values().map(|a| a.interface_id))
            .flatten();
        let ids = missing(referenced, &snapshot.interfaces);
        if ids.is_empty() {
            return Ok(());
        }

        debug!(interfaces = ids.len(), "fetching referenced interfaces");
        for interface in &fetch_each(ids, self.concurrency, |id| client.get_interface(id)).await? {
            self.snapshot.insert_interface(convert::interface(interface));
        }
        Ok(())
    }

    /// Owners of known interfaces, and virtual-chassis masters.
    async fn follow_devices(&mut self) -> Result<(), CoreError> {
        let client = self.client;
        // Two rounds: a newly found chassis member may name an unknown master.
        for _ in 0..2 {
            let owners = self.snapshot.interfaces.values().map(|i| i.device_id);
            let masters = self
                .snapshot
                .devices
                .values()
                .filter_map(|d| d.virtual_chassis.as_ref().and_then(|vc| vc.master_id));
            let ids = missing(owners.chain(masters), &self.snapshot.devices);
            if ids.is_empty() {
                break;
            }
            debug!(devices = ids.len(), "fetching referenced devices");
            for device in &fetch_each(ids, self.concurrency, |id| client.get_device(id)).await? {
                self.snapshot.insert_device(convert::device(device));
            }
        }
        Ok(())
    }
}
