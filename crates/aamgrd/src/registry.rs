//! Auto-Attach registry façade.
//!
//! One [`AutoAttach`] object owns every piece of shared state: the instance
//! registry, the global mapping template store, and through them each
//! instance's indices, provisioning queue, and transmit timer. A single
//! `parking_lot::Mutex` serializes all access; no operation blocks or
//! suspends while holding it, and engine calls made under it are synchronous
//! and bounded.
//!
//! Callers are the bridge control plane (mapping register/unregister,
//! instance create/destroy), the receive path ([`AutoAttach::consume_frame`]),
//! the transmit scheduler ([`AutoAttach::should_transmit`] /
//! [`AutoAttach::produce_frame`]), and the forwarding subsystem polling
//! [`AutoAttach::drain_all`].

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use aa_engine::{Engine, PortConfig, ETH_TYPE_LLDP};

use crate::instance::{alloc_port_or_die, Instance, DEFAULT_TX_INTERVAL};
use crate::types::{AaConfig, MappingEntry, OwnerKey, ProvisioningOp};

/// Chassis description advertised when the operator configures an empty one.
const PACKAGE_STRING: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Returns true if a received frame with this EtherType belongs to the LLDP
/// stack and should be fed to [`AutoAttach::consume_frame`].
pub fn should_process_frame(ethertype: u16) -> bool {
    ethertype == ETH_TYPE_LLDP
}

/// Everything guarded by the one lock.
pub(crate) struct Shared {
    /// Live instances keyed by port name, in creation order. Drain output
    /// follows this order across instances.
    pub(crate) instances: IndexMap<String, Instance>,
    /// Registered mappings keyed by I-SID, independent of any instance.
    /// Seeds newly created instances and records that a mapping exists at
    /// all. Global across bridges for now.
    templates: HashMap<u64, MappingEntry>,
}

/// The Auto-Attach control-plane registry.
pub struct AutoAttach {
    engine: Arc<dyn Engine>,
    pub(crate) shared: Mutex<Shared>,
}

impl AutoAttach {
    /// Creates an empty registry backed by the given protocol engine.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            shared: Mutex::new(Shared {
                instances: IndexMap::new(),
                templates: HashMap::new(),
            }),
        }
    }

    /// Creates a protocol instance for one port.
    ///
    /// Returns `None` when the options leave Auto-Attach disabled. Otherwise
    /// allocates engine port state (aborting the process if that fails),
    /// seeds the new instance with a copy of every registered template
    /// (queueing one `Add` per template), registers the instance under its
    /// port name with a reference count of 1, and returns the name.
    pub fn create_instance(&self, port: &PortConfig, cfg: &AaConfig) -> Option<String> {
        if !cfg.enable {
            return None;
        }

        // Engine allocation happens before taking the lock; it is the only
        // potentially slow step and it touches no shared state.
        let handle = alloc_port_or_die(self.engine.as_ref(), port);
        let mut inst = Instance::new(&port.name, handle);

        let mut shared = self.shared.lock();
        if shared.instances.contains_key(&port.name) {
            drop(shared);
            // Drops the freshly allocated handle outside the lock.
            warn!("Auto-Attach instance '{}' already exists", port.name);
            return Some(port.name.clone());
        }

        // Install every configured mapping on the new port.
        let templates: Vec<MappingEntry> = shared.templates.values().cloned().collect();
        for template in templates {
            inst.insert_entry(template);
        }

        info!(
            "Created Auto-Attach instance '{}' with {} seeded mappings",
            port.name,
            inst.entry_count()
        );
        shared.instances.insert(port.name.clone(), inst);
        Some(port.name.clone())
    }

    /// Takes an additional reference on an instance. Returns false if no
    /// instance by that name is live.
    pub fn ref_instance(&self, name: &str) -> bool {
        let mut shared = self.shared.lock();
        match shared.instances.get_mut(name) {
            Some(inst) => {
                inst.acquire();
                debug!("Instance '{}' refcount now {}", name, inst.ref_count());
                true
            }
            None => false,
        }
    }

    /// Releases one reference on an instance. When the count reaches zero
    /// the instance is removed from the registry under the lock and its
    /// engine state is torn down after the lock is released.
    ///
    /// Callers must not release more references than they hold.
    pub fn unref_instance(&self, name: &str) {
        let removed;
        {
            let mut shared = self.shared.lock();
            let Some(inst) = shared.instances.get_mut(name) else {
                warn!("unref of unknown Auto-Attach instance '{}'", name);
                return;
            };
            if inst.release() > 0 {
                return;
            }
            removed = shared.instances.shift_remove(name);
        }
        // Engine teardown outside the critical section.
        drop(removed);
        info!("Destroyed Auto-Attach instance '{}'", name);
    }

    /// Updates the chassis system name and description on every live
    /// instance. An empty description falls back to the package string.
    pub fn configure(&self, system_name: &str, system_description: &str) {
        let description = if system_description.is_empty() {
            PACKAGE_STRING
        } else {
            system_description
        };
        let mut shared = self.shared.lock();
        for inst in shared.instances.values_mut() {
            inst.set_chassis(system_name, description);
        }
    }

    /// Registers an I-SID/VLAN mapping.
    ///
    /// Records the mapping in the template store with status `Pending`, then
    /// installs it on every live instance that does not already track the
    /// I-SID, materializing it on each port and queueing an `Add` operation.
    /// Per-instance installation is idempotent.
    pub fn register_mapping(&self, owner: OwnerKey, isid: u64, vlan: u64) {
        info!("Adding mapping ISID={}, VLAN={}, owner={}", isid, vlan, owner);

        let mut shared = self.shared.lock();
        shared
            .templates
            .insert(isid, MappingEntry::new(owner, isid, vlan));

        for inst in shared.instances.values_mut() {
            if !inst.insert_entry(MappingEntry::new(owner, isid, vlan)) {
                debug!("Instance '{}' already tracks ISID={}", inst.name(), isid);
            }
        }
    }

    /// Unregisters the mapping identified by `owner`.
    ///
    /// On every instance that tracks it, removes the entry from both indices
    /// and the port's TLV list and queues a `Remove` carrying the entry's
    /// VLAN. The matching template is removed by owner key, using the values
    /// held in the template itself rather than anything derived from a
    /// removed per-instance entry. Unknown owners are a logged no-op.
    pub fn unregister_mapping(&self, owner: OwnerKey) {
        info!("Removing mapping owner={}", owner);

        let mut shared = self.shared.lock();
        let mut found = false;

        for inst in shared.instances.values_mut() {
            if let Some(entry) = inst.remove_by_owner(owner) {
                found = true;
                info!(
                    "\t Removing mapping ISID={}, VLAN={} (instance '{}')",
                    entry.isid,
                    entry.vlan,
                    inst.name()
                );
            }
        }

        let template_isid = shared
            .templates
            .iter()
            .find(|(_, t)| t.owner == owner)
            .map(|(isid, _)| *isid);
        if let Some(isid) = template_isid {
            shared.templates.remove(&isid);
            found = true;
        }

        if !found {
            info!("No mapping registered for owner={}", owner);
        }
    }

    /// Looks up the mapping for `isid` on one instance. Absence is normal.
    pub fn find_by_isid(&self, name: &str, isid: u64) -> Option<MappingEntry> {
        let shared = self.shared.lock();
        shared
            .instances
            .get(name)
            .and_then(|i| i.entry_by_isid(isid).cloned())
    }

    /// Looks up the mapping for `owner` on one instance. Absence is normal.
    pub fn find_by_owner(&self, name: &str, owner: OwnerKey) -> Option<MappingEntry> {
        let shared = self.shared.lock();
        shared
            .instances
            .get(name)
            .and_then(|i| i.entry_by_owner(owner).cloned())
    }

    /// Returns the template entry for `isid`, if registered.
    pub fn template(&self, isid: u64) -> Option<MappingEntry> {
        self.shared.lock().templates.get(&isid).cloned()
    }

    /// Returns the number of registered templates.
    pub fn template_count(&self) -> usize {
        self.shared.lock().templates.len()
    }

    /// Moves every pending provisioning operation across all instances into
    /// one sequence, emptying each per-instance queue.
    ///
    /// Atomic with respect to every other registry operation: an operation
    /// appears in exactly one drain. Per-instance order is preserved;
    /// instances appear in their registry insertion order.
    pub fn drain_all(&self) -> Vec<ProvisioningOp> {
        let mut shared = self.shared.lock();
        let mut ops = Vec::new();
        for inst in shared.instances.values_mut() {
            inst.drain_queue(&mut ops);
        }
        ops
    }

    /// Sum of pending provisioning operations across all instances. Does not
    /// drain.
    pub fn queue_depth(&self) -> usize {
        let shared = self.shared.lock();
        shared.instances.values().map(|i| i.queue_len()).sum()
    }

    /// Returns true if the instance's transmit timer has expired. Does not
    /// reset the timer.
    pub fn should_transmit(&self, name: &str) -> bool {
        let shared = self.shared.lock();
        shared
            .instances
            .get(name)
            .is_some_and(|i| i.timer().expired())
    }

    /// Returns the absolute time the instance's timer next expires, or
    /// `None` (wait forever) when the handle is absent. Callers fold this
    /// into a global minimum-wait computation.
    pub fn next_wake_time(&self, name: Option<&str>) -> Option<Instant> {
        let name = name?;
        let shared = self.shared.lock();
        shared.instances.get(name).map(|i| i.timer().deadline())
    }

    /// Re-arms an instance's transmit timer to the default interval.
    pub fn configure_tx(&self, name: &str) {
        let mut shared = self.shared.lock();
        if let Some(inst) = shared.instances.get_mut(name) {
            inst.arm_tx(DEFAULT_TX_INTERVAL);
        }
    }

    /// Produces the next frame for an instance: delegates serialization to
    /// the engine, wraps the payload in an Ethernet header, pads it to the
    /// minimum frame size, and resets the transmit timer. The entire
    /// operation runs under the lock since it reads mapping state and
    /// mutates the timer.
    pub fn produce_frame(&self, name: &str, src_mac: [u8; 6]) -> Option<Vec<u8>> {
        let mut shared = self.shared.lock();
        shared.instances.get_mut(name).map(|i| i.produce(src_mac))
    }

    /// Feeds a received frame to an instance's engine state. Status updates
    /// the frame carries overwrite the matching per-instance entries;
    /// updates for untracked I-SIDs are dropped and logged.
    pub fn consume_frame(&self, name: &str, raw: &[u8]) {
        let mut shared = self.shared.lock();
        match shared.instances.get_mut(name) {
            Some(inst) => inst.consume(raw),
            None => warn!("Received frame for unknown instance '{}'", name),
        }
    }

    /// Returns the names of all live instances in registry order.
    pub fn instance_names(&self) -> Vec<String> {
        self.shared.lock().instances.keys().cloned().collect()
    }

    /// Returns the number of live instances.
    pub fn instance_count(&self) -> usize {
        self.shared.lock().instances.len()
    }
}
