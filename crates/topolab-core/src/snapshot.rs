// ── In-memory inventory snapshot ──
//
// Everything fetched for one run, keyed by record id. Serializable so a
// fetch can be saved and resolved again offline.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::inventory::{
    AddressRecord, CircuitRecord, CircuitTerminationRecord, DeviceRecord, FhrpAssignmentRecord,
    FhrpGroupRecord, FrontPortRecord, InterfaceRecord, Inventory, RearPortRecord, RecordId,
};
use crate::model::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub fetched_at: DateTime<Utc>,
    /// Inventory the snapshot was taken from, informational only.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub devices: BTreeMap<RecordId, DeviceRecord>,
    #[serde(default)]
    pub interfaces: BTreeMap<RecordId, InterfaceRecord>,
    #[serde(default)]
    pub addresses: BTreeMap<RecordId, AddressRecord>,
    #[serde(default)]
    pub circuits: BTreeMap<RecordId, CircuitRecord>,
    #[serde(default)]
    pub terminations: BTreeMap<RecordId, CircuitTerminationRecord>,
    #[serde(default)]
    pub front_ports: BTreeMap<RecordId, FrontPortRecord>,
    #[serde(default)]
    pub rear_ports: BTreeMap<RecordId, RearPortRecord>,
    #[serde(default)]
    pub fhrp_groups: BTreeMap<RecordId, FhrpGroupRecord>,
    #[serde(default)]
    pub fhrp_assignments: BTreeMap<RecordId, FhrpAssignmentRecord>,
}

impl Default for InventorySnapshot {
    fn default() -> Self {
        Self {
            fetched_at: Utc::now(),
            source: None,
            devices: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            addresses: BTreeMap::new(),
            circuits: BTreeMap::new(),
            terminations: BTreeMap::new(),
            front_ports: BTreeMap::new(),
            rear_ports: BTreeMap::new(),
            fhrp_groups: BTreeMap::new(),
            fhrp_assignments: BTreeMap::new(),
        }
    }
}

impl InventorySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Builders ─────────────────────────────────────────────────────
    // Inserts overwrite: a later fetch of the same record is at least as
    // fresh as an earlier one.

    pub fn insert_device(&mut self, record: DeviceRecord) {
        self.devices.insert(record.id, record);
    }

    pub fn insert_interface(&mut self, record: InterfaceRecord) {
        self.interfaces.insert(record.id, record);
    }

    pub fn insert_address(&mut self, record: AddressRecord) {
        self.addresses.insert(record.id, record);
    }

    pub fn insert_circuit(&mut self, record: CircuitRecord) {
        self.circuits.insert(record.id, record);
    }

    pub fn insert_termination(&mut self, record: CircuitTerminationRecord) {
        self.terminations.insert(record.id, record);
    }

    pub fn insert_front_port(&mut self, record: FrontPortRecord) {
        self.front_ports.insert(record.id, record);
    }

    pub fn insert_rear_port(&mut self, record: RearPortRecord) {
        self.rear_ports.insert(record.id, record);
    }

    pub fn insert_fhrp_group(&mut self, record: FhrpGroupRecord) {
        self.fhrp_groups.insert(record.id, record);
    }

    pub fn insert_fhrp_assignment(&mut self, record: FhrpAssignmentRecord) {
        self.fhrp_assignments.insert(record.id, record);
    }

    // ── Persistence ──────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let body = self.to_json()?;
        std::fs::write(path, body).map_err(|source| CoreError::SnapshotIo {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), devices = self.devices.len(), "snapshot saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::SnapshotIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

impl Inventory for InventorySnapshot {
    fn devices(&self) -> Vec<&DeviceRecord> {
        self.devices.values().collect()
    }

    fn device(&self, id: RecordId) -> Option<&DeviceRecord> {
        self.devices.get(&id)
    }

    fn interfaces_of(&self, device_id: RecordId) -> Vec<&InterfaceRecord> {
        self.interfaces
            .values()
            .filter(|i| i.device_id == device_id)
            .collect()
    }

    fn interface(&self, id: RecordId) -> Option<&InterfaceRecord> {
        self.interfaces.get(&id)
    }

    fn addresses_of(&self, interface_id: RecordId) -> Vec<&AddressRecord> {
        self.addresses
            .values()
            .filter(|a| a.interface_id == Some(interface_id))
            .collect()
    }

    fn addresses_in(&self, network: &Address) -> Vec<&AddressRecord> {
        self.addresses
            .values()
            .filter(|a| network.contains(a.address.ip()))
            .collect()
    }

    fn circuit(&self, id: RecordId) -> Option<&CircuitRecord> {
        self.circuits.get(&id)
    }

    fn terminations_of(&self, circuit_id: RecordId) -> Vec<&CircuitTerminationRecord> {
        self.terminations
            .values()
            .filter(|t| t.circuit_id == circuit_id)
            .collect()
    }

    fn termination(&self, id: RecordId) -> Option<&CircuitTerminationRecord> {
        self.terminations.get(&id)
    }

    fn front_port(&self, id: RecordId) -> Option<&FrontPortRecord> {
        self.front_ports.get(&id)
    }

    fn rear_port(&self, id: RecordId) -> Option<&RearPortRecord> {
        self.rear_ports.get(&id)
    }

    fn fhrp_group(&self, id: RecordId) -> Option<&FhrpGroupRecord> {
        self.fhrp_groups.get(&id)
    }

    fn fhrp_assignments_of(&self, interface_id: RecordId) -> Vec<&FhrpAssignmentRecord> {
        self.fhrp_assignments
            .values()
            .filter(|a| a.interface_id == interface_id)
            .collect()
    }

    fn fhrp_group_members(&self, group_id: RecordId) -> Vec<&FhrpAssignmentRecord> {
        self.fhrp_assignments
            .values()
            .filter(|a| a.group_id == group_id)
            .collect()
    }
}
