//! In-memory protocol engine.
//!
//! Stands in for a real LLDP stack in tests and in the demo daemon loop. The
//! frame layout is private to this engine: an Ethernet header followed by a
//! record count and fixed-size I-SID/VLAN/status records. It exists so the
//! manager's produce/consume paths can be exercised end to end without a wire
//! codec.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EngineError;
use crate::types::{PortConfig, PortCounters, ServerInfo, StatusUpdate};
use crate::{Engine, EnginePort, ETH_HEADER_LEN, ETH_TYPE_LLDP, LLDP_MULTICAST_ADDR};

/// Bytes per status record: isid (8) + vlan (8) + status (1).
const RECORD_LEN: usize = 17;

/// In-memory engine factory.
///
/// Port allocation always succeeds unless a failure has been scripted with
/// [`MemoryEngine::fail_next_alloc`].
#[derive(Debug, Default)]
pub struct MemoryEngine {
    fail_next: AtomicBool,
}

impl MemoryEngine {
    /// Creates a new in-memory engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `create_port` call fail.
    pub fn fail_next_alloc(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

impl Engine for MemoryEngine {
    fn create_port(&self, cfg: &PortConfig) -> Result<Box<dyn EnginePort>, EngineError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EngineError::port_alloc(&cfg.name, "scripted failure"));
        }
        Ok(Box::new(MemoryPort::new(cfg)))
    }
}

/// Per-port state held by the in-memory engine.
#[derive(Debug)]
pub struct MemoryPort {
    name: String,
    mac: [u8; 6],
    mtu: u32,
    system_name: String,
    system_description: String,
    tlvs: Vec<(u64, u64)>,
    counters: PortCounters,
    servers: Vec<ServerInfo>,
}

impl MemoryPort {
    fn new(cfg: &PortConfig) -> Self {
        Self {
            name: cfg.name.clone(),
            mac: cfg.mac,
            mtu: cfg.mtu,
            system_name: String::new(),
            system_description: String::new(),
            tlvs: Vec::new(),
            counters: PortCounters::default(),
            servers: Vec::new(),
        }
    }

    /// Returns the MTU the port was created with.
    pub fn mtu(&self) -> u32 {
        self.mtu
    }

    /// Returns the hardware address the port was created with.
    pub fn mac(&self) -> [u8; 6] {
        self.mac
    }

    /// Returns the configured chassis system name and description.
    pub fn chassis(&self) -> (&str, &str) {
        (&self.system_name, &self.system_description)
    }

    /// Returns the currently advertised I-SID/VLAN TLV list.
    pub fn tlvs(&self) -> &[(u64, u64)] {
        &self.tlvs
    }
}

impl EnginePort for MemoryPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_chassis(&mut self, system_name: &str, system_description: &str) {
        self.system_name = system_name.to_string();
        self.system_description = system_description.to_string();
    }

    fn add_mapping_tlv(&mut self, isid: u64, vlan: u64) {
        self.tlvs.push((isid, vlan));
    }

    fn remove_mapping_tlv(&mut self, isid: u64) -> Option<u64> {
        let pos = self.tlvs.iter().position(|(i, _)| *i == isid)?;
        let (_, vlan) = self.tlvs.remove(pos);
        Some(vlan)
    }

    fn send(&mut self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(2 + self.tlvs.len() * 16);
        payload.extend_from_slice(&(self.tlvs.len() as u16).to_be_bytes());
        for (isid, vlan) in &self.tlvs {
            payload.extend_from_slice(&isid.to_be_bytes());
            payload.extend_from_slice(&vlan.to_be_bytes());
        }
        self.counters.tx += 1;
        payload
    }

    fn receive(&mut self, raw: &[u8]) -> Vec<StatusUpdate> {
        if raw.len() < ETH_HEADER_LEN + 2
            || u16::from_be_bytes([raw[12], raw[13]]) != ETH_TYPE_LLDP
        {
            self.counters.drop += 1;
            return Vec::new();
        }

        let count = u16::from_be_bytes([raw[14], raw[15]]) as usize;
        let records = &raw[ETH_HEADER_LEN + 2..];
        if records.len() < count * RECORD_LEN {
            self.counters.rx_discarded += 1;
            return Vec::new();
        }

        let src: Vec<u8> = raw[6..12].to_vec();
        if !self.servers.iter().any(|s| s.chassis_id == src) {
            self.servers.push(ServerInfo {
                chassis_id: src.clone(),
                description: None,
                system_id: src,
            });
            self.counters.insert += 1;
        }

        let mut updates = Vec::with_capacity(count);
        for chunk in records.chunks_exact(RECORD_LEN).take(count) {
            updates.push(StatusUpdate {
                isid: u64::from_be_bytes(chunk[0..8].try_into().unwrap()),
                vlan: u64::from_be_bytes(chunk[8..16].try_into().unwrap()),
                status_code: chunk[16],
            });
        }
        self.counters.rx += 1;
        updates
    }

    fn counters(&self) -> PortCounters {
        self.counters
    }

    fn servers(&self) -> Vec<ServerInfo> {
        self.servers.clone()
    }
}

/// Builds a frame carrying status records, as an Auto-Attach server using the
/// in-memory engine's layout would send it.
pub fn status_frame(src_mac: [u8; 6], updates: &[StatusUpdate]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(ETH_HEADER_LEN + 2 + updates.len() * RECORD_LEN);
    frame.extend_from_slice(&LLDP_MULTICAST_ADDR);
    frame.extend_from_slice(&src_mac);
    frame.extend_from_slice(&ETH_TYPE_LLDP.to_be_bytes());
    frame.extend_from_slice(&(updates.len() as u16).to_be_bytes());
    for u in updates {
        frame.extend_from_slice(&u.isid.to_be_bytes());
        frame.extend_from_slice(&u.vlan.to_be_bytes());
        frame.push(u.status_code);
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port() -> MemoryPort {
        MemoryPort::new(&PortConfig::new("sw0p1", [0xaa, 0, 0, 0, 0, 1], 1500))
    }

    #[test]
    fn test_create_port() {
        let engine = MemoryEngine::new();
        let port = engine
            .create_port(&PortConfig::new("sw0p1", [0; 6], 1500))
            .unwrap();
        assert_eq!(port.name(), "sw0p1");
    }

    #[test]
    fn test_scripted_alloc_failure() {
        let engine = MemoryEngine::new();
        engine.fail_next_alloc();
        assert!(engine
            .create_port(&PortConfig::new("sw0p1", [0; 6], 1500))
            .is_err());
        // Only the next allocation fails.
        assert!(engine
            .create_port(&PortConfig::new("sw0p2", [0; 6], 1500))
            .is_ok());
    }

    #[test]
    fn test_set_chassis() {
        let mut p = port();
        p.set_chassis("edge-1", "aamgrd 0.1.0");
        assert_eq!(p.chassis(), ("edge-1", "aamgrd 0.1.0"));
        assert_eq!(p.mac(), [0xaa, 0, 0, 0, 0, 1]);
        assert_eq!(p.mtu(), 1500);
    }

    #[test]
    fn test_tlv_add_remove() {
        let mut p = port();
        p.add_mapping_tlv(100, 5);
        p.add_mapping_tlv(200, 6);
        assert_eq!(p.tlvs(), &[(100, 5), (200, 6)]);
        assert_eq!(p.remove_mapping_tlv(100), Some(5));
        assert_eq!(p.remove_mapping_tlv(100), None);
        assert_eq!(p.tlvs(), &[(200, 6)]);
    }

    #[test]
    fn test_send_counts_and_encodes() {
        let mut p = port();
        p.add_mapping_tlv(100, 5);
        let payload = p.send();
        assert_eq!(&payload[0..2], &1u16.to_be_bytes());
        assert_eq!(payload.len(), 2 + 16);
        assert_eq!(p.counters().tx, 1);
    }

    #[test]
    fn test_receive_status_frame() {
        let mut p = port();
        let updates = [StatusUpdate {
            isid: 100,
            vlan: 5,
            status_code: 2,
        }];
        let frame = status_frame([0xbb, 0, 0, 0, 0, 2], &updates);

        let parsed = p.receive(&frame);
        assert_eq!(parsed, updates.to_vec());
        assert_eq!(p.counters().rx, 1);
        assert_eq!(p.servers().len(), 1);
        assert_eq!(p.servers()[0].chassis_id, vec![0xbb, 0, 0, 0, 0, 2]);

        // Same server again is not duplicated.
        p.receive(&frame);
        assert_eq!(p.servers().len(), 1);
        assert_eq!(p.counters().insert, 1);
    }

    #[test]
    fn test_receive_rejects_wrong_ethertype() {
        let mut p = port();
        let mut frame = status_frame([0xbb, 0, 0, 0, 0, 2], &[]);
        frame[12] = 0x08;
        frame[13] = 0x00;
        assert!(p.receive(&frame).is_empty());
        assert_eq!(p.counters().drop, 1);
    }

    #[test]
    fn test_receive_rejects_truncated_records() {
        let mut p = port();
        let mut frame = status_frame(
            [0xbb, 0, 0, 0, 0, 2],
            &[StatusUpdate {
                isid: 1,
                vlan: 2,
                status_code: 2,
            }],
        );
        frame.truncate(frame.len() - 1);
        assert!(p.receive(&frame).is_empty());
        assert_eq!(p.counters().rx_discarded, 1);
    }
}
