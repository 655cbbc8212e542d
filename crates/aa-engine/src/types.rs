//! Data types exchanged across the engine boundary.

use serde::{Deserialize, Serialize};

/// Port parameters the engine needs at allocation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Interface name (also the Auto-Attach instance name).
    pub name: String,
    /// Hardware address advertised as the chassis ID.
    pub mac: [u8; 6],
    /// Interface MTU.
    pub mtu: u32,
}

impl PortConfig {
    /// Creates a new port configuration.
    pub fn new(name: impl Into<String>, mac: [u8; 6], mtu: u32) -> Self {
        Self {
            name: name.into(),
            mac,
            mtu,
        }
    }
}

/// A per-I-SID status report parsed from an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Service instance identifier the server is reporting on.
    pub isid: u64,
    /// VLAN carried alongside the I-SID.
    pub vlan: u64,
    /// Raw Auto-Attach status code.
    pub status_code: u8,
}

/// Transmit/receive counters for one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCounters {
    /// Frames transmitted.
    pub tx: u64,
    /// Frames received.
    pub rx: u64,
    /// Received frames discarded as malformed.
    pub rx_discarded: u64,
    /// Received frames with unrecognized TLVs.
    pub rx_unrecognized: u64,
    /// Remote entries aged out.
    pub ageout: u64,
    /// Remote entries inserted.
    pub insert: u64,
    /// Remote entries deleted.
    pub delete: u64,
    /// Frames dropped before parsing.
    pub drop: u64,
}

/// An Auto-Attach server discovered on a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Remote chassis identifier.
    pub chassis_id: Vec<u8>,
    /// Remote chassis description, when advertised.
    pub description: Option<String>,
    /// Auto-Attach element system identifier.
    pub system_id: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_port_config_new() {
        let cfg = PortConfig::new("sw0p1", [0, 1, 2, 3, 4, 5], 1500);
        assert_eq!(cfg.name, "sw0p1");
        assert_eq!(cfg.mtu, 1500);
    }

    #[test]
    fn test_counters_default() {
        let c = PortCounters::default();
        assert_eq!(c.tx, 0);
        assert_eq!(c.rx, 0);
    }
}
