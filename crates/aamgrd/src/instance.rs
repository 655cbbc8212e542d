//! Per-port Auto-Attach protocol instance.
//!
//! An instance owns the dual-indexed mapping table for one port, the queue of
//! VLAN provisioning operations derived from it, the transmit timer, and the
//! engine's per-port hardware handle. Instances are only ever touched through
//! [`AutoAttach`](crate::AutoAttach), under its lock.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use aa_engine::{
    Engine, EnginePort, PortConfig, StatusUpdate, ETH_HEADER_LEN, ETH_TYPE_LLDP,
    LLDP_MULTICAST_ADDR, MIN_ETH_FRAME_LEN,
};

use crate::types::{MappingEntry, OwnerKey, ProvisioningOp, Status, VlanOp};

/// Default transmit interval.
pub const DEFAULT_TX_INTERVAL: Duration = Duration::from_millis(5000);

/// Transmit timer for one instance.
///
/// Two states: idle (deadline in the future) and due (deadline reached).
/// Checking never resets; the timer is re-armed when a frame is produced.
#[derive(Debug, Clone, Copy)]
pub struct TxTimer {
    deadline: Instant,
    interval: Duration,
}

impl TxTimer {
    /// Creates a timer that is already due, so the first poll transmits.
    pub fn new(interval: Duration) -> Self {
        Self {
            deadline: Instant::now(),
            interval,
        }
    }

    /// Returns true if the deadline has been reached.
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Re-arms the timer one interval from now.
    pub fn reset(&mut self) {
        self.deadline = Instant::now() + self.interval;
    }

    /// Changes the interval and re-arms.
    pub fn arm(&mut self, interval: Duration) {
        self.interval = interval;
        self.reset();
    }

    /// Returns the absolute time of the next expiry.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Allocates engine port state, aborting the process on failure.
///
/// Resource exhaustion for core per-port state is unrecoverable by
/// convention; no partial instance is left behind.
pub(crate) fn alloc_port_or_die(engine: &dyn Engine, cfg: &PortConfig) -> Box<dyn EnginePort> {
    match engine.create_port(cfg) {
        Ok(port) => port,
        Err(e) => {
            tracing::error!("Unable to allocate space for {}: {}", cfg.name, e);
            std::process::abort();
        }
    }
}

/// Auto-Attach state for one port.
pub struct Instance {
    name: String,
    ref_count: u32,
    timer: TxTimer,
    /// Owning index: every entry lives here exactly once.
    by_isid: HashMap<u64, MappingEntry>,
    /// Secondary index: owner key to the isid key in `by_isid`.
    by_owner: HashMap<OwnerKey, u64>,
    queue: VecDeque<ProvisioningOp>,
    port: Box<dyn EnginePort>,
}

impl Instance {
    pub(crate) fn new(name: impl Into<String>, port: Box<dyn EnginePort>) -> Self {
        Self {
            name: name.into(),
            ref_count: 1,
            timer: TxTimer::new(DEFAULT_TX_INTERVAL),
            by_isid: HashMap::new(),
            by_owner: HashMap::new(),
            queue: VecDeque::new(),
            port,
        }
    }

    /// Creates a detached instance with no device or config coupling.
    ///
    /// Skips template seeding and registry insertion; intended for testing
    /// and bootstrap contexts.
    pub fn dummy(engine: &dyn Engine) -> Self {
        let cfg = PortConfig::new("dummy-port", [0; 6], 1500);
        Self::new("dummy-lldp", alloc_port_or_die(engine, &cfg))
    }

    /// Returns the instance (port) name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of tracked mapping entries.
    pub fn entry_count(&self) -> usize {
        self.by_isid.len()
    }

    pub(crate) fn acquire(&mut self) {
        self.ref_count += 1;
    }

    /// Decrements the reference count, returning the new value.
    pub(crate) fn release(&mut self) -> u32 {
        self.ref_count -= 1;
        self.ref_count
    }

    pub(crate) fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Inserts a mapping into both indices, materializes it on the engine
    /// port, and queues an `Add` operation.
    ///
    /// Returns false without side effects if the isid is already tracked
    /// (first write wins).
    pub(crate) fn insert_entry(&mut self, entry: MappingEntry) -> bool {
        if self.by_isid.contains_key(&entry.isid) {
            return false;
        }
        self.port.add_mapping_tlv(entry.isid, entry.vlan);
        self.queue
            .push_back(ProvisioningOp::new(&self.name, entry.vlan, VlanOp::Add));
        self.by_owner.insert(entry.owner, entry.isid);
        self.by_isid.insert(entry.isid, entry);
        true
    }

    /// Removes the mapping owned by `owner` from both indices and the engine
    /// port, queueing a `Remove` operation carrying the entry's VLAN.
    pub(crate) fn remove_by_owner(&mut self, owner: OwnerKey) -> Option<MappingEntry> {
        let isid = self.by_owner.remove(&owner)?;
        let entry = self
            .by_isid
            .remove(&isid)
            .unwrap_or_else(|| unreachable!("indices out of sync for isid {isid}"));
        self.port.remove_mapping_tlv(isid);
        self.queue
            .push_back(ProvisioningOp::new(&self.name, entry.vlan, VlanOp::Remove));
        Some(entry)
    }

    /// Looks up a mapping by I-SID.
    pub fn entry_by_isid(&self, isid: u64) -> Option<&MappingEntry> {
        self.by_isid.get(&isid)
    }

    /// Looks up a mapping by owner key.
    pub fn entry_by_owner(&self, owner: OwnerKey) -> Option<&MappingEntry> {
        self.by_owner.get(&owner).and_then(|i| self.by_isid.get(i))
    }

    /// Returns all entries ordered by I-SID.
    pub fn entries_sorted(&self) -> Vec<MappingEntry> {
        let mut entries: Vec<_> = self.by_isid.values().cloned().collect();
        entries.sort_by_key(|e| e.isid);
        entries
    }

    /// Verifies that the two indices describe the same entry set.
    pub fn indices_consistent(&self) -> bool {
        self.by_isid.len() == self.by_owner.len()
            && self.by_owner.iter().all(|(owner, isid)| {
                self.by_isid
                    .get(isid)
                    .is_some_and(|e| e.owner == *owner && e.isid == *isid)
            })
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn drain_queue(&mut self, out: &mut Vec<ProvisioningOp>) {
        out.extend(std::mem::take(&mut self.queue));
    }

    pub(crate) fn set_chassis(&mut self, system_name: &str, system_description: &str) {
        self.port.set_chassis(system_name, system_description);
    }

    pub(crate) fn timer(&self) -> &TxTimer {
        &self.timer
    }

    pub(crate) fn arm_tx(&mut self, interval: Duration) {
        self.timer.arm(interval);
    }

    /// Produces a full Ethernet frame from the engine's current state,
    /// padded to the minimum frame size, and re-arms the transmit timer.
    pub(crate) fn produce(&mut self, src_mac: [u8; 6]) -> Vec<u8> {
        let payload = self.port.send();
        let mut frame = Vec::with_capacity(MIN_ETH_FRAME_LEN.max(ETH_HEADER_LEN + payload.len()));
        frame.extend_from_slice(&LLDP_MULTICAST_ADDR);
        frame.extend_from_slice(&src_mac);
        frame.extend_from_slice(&ETH_TYPE_LLDP.to_be_bytes());
        frame.extend_from_slice(&payload);
        if frame.len() < MIN_ETH_FRAME_LEN {
            frame.resize(MIN_ETH_FRAME_LEN, 0);
        }
        self.timer.reset();
        frame
    }

    /// Feeds a received frame to the engine and applies the status updates it
    /// carried to the mapping table.
    pub(crate) fn consume(&mut self, raw: &[u8]) {
        for update in self.port.receive(raw) {
            self.apply_status(&update);
        }
    }

    fn apply_status(&mut self, update: &StatusUpdate) {
        match self.by_isid.get_mut(&update.isid) {
            Some(entry) => {
                info!(
                    "Setting status for ISID={} to {} on {}",
                    update.isid, update.status_code, self.name
                );
                entry.status = Status::from_code(update.status_code);
            }
            None => {
                // The server is reporting on an I-SID this port never
                // requested. Advisory, not an error.
                warn!("Couldn't find mapping for I-SID={} on {}", update.isid, self.name);
            }
        }
    }

    pub(crate) fn counters(&self) -> aa_engine::PortCounters {
        self.port.counters()
    }

    pub(crate) fn servers(&self) -> Vec<aa_engine::ServerInfo> {
        self.port.servers()
    }
}
