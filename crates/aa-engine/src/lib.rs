//! Protocol engine boundary for the Auto-Attach manager.
//!
//! The Auto-Attach control plane does not encode or decode LLDP TLVs itself;
//! it delegates frame production and consumption to an underlying protocol
//! engine. This crate defines that seam:
//!
//! - [`Engine`]: allocates per-port protocol state
//! - [`EnginePort`]: the exclusive per-port hardware handle (chassis fields,
//!   I-SID/VLAN TLV list, frame send/receive, counters, discovered servers)
//! - [`MemoryEngine`]: an in-memory engine used by tests and the demo daemon
//!
//! Engine calls are synchronous and must be bounded in latency: the manager
//! invokes them while holding its global lock.

mod error;
mod memory;
mod types;

pub use error::EngineError;
pub use memory::{status_frame, MemoryEngine, MemoryPort};
pub use types::{PortConfig, PortCounters, ServerInfo, StatusUpdate};

/// EtherType carried by LLDP frames.
pub const ETH_TYPE_LLDP: u16 = 0x88cc;

/// Length of an Ethernet header (no 802.1Q tag).
pub const ETH_HEADER_LEN: usize = 14;

/// Frames shorter than this are padded before transmission.
pub const MIN_ETH_FRAME_LEN: usize = 68;

/// Destination address for LLDP frames (nearest non-TPMR bridge).
pub const LLDP_MULTICAST_ADDR: [u8; 6] = [0x01, 0x80, 0xc2, 0x00, 0x00, 0x0e];

/// Per-port protocol state owned by exactly one Auto-Attach instance.
///
/// The handle is created once at instance creation and destroyed with the
/// instance. All mutation happens under the manager's lock, so implementations
/// need `Send` but no internal synchronization.
pub trait EnginePort: Send {
    /// Returns the port name this handle was created for.
    fn name(&self) -> &str;

    /// Updates the chassis descriptive fields advertised in outgoing frames.
    fn set_chassis(&mut self, system_name: &str, system_description: &str);

    /// Appends an I-SID/VLAN mapping TLV to the local port state.
    fn add_mapping_tlv(&mut self, isid: u64, vlan: u64);

    /// Removes the mapping TLV for `isid`, returning its VLAN if present.
    fn remove_mapping_tlv(&mut self, isid: u64) -> Option<u64>;

    /// Serializes the current chassis/port/mapping state into an LLDPDU
    /// payload (Ethernet header excluded).
    fn send(&mut self) -> Vec<u8>;

    /// Feeds a raw received frame into the engine. Updates discovered-server
    /// state and returns the per-I-SID status updates the frame carried.
    fn receive(&mut self, raw: &[u8]) -> Vec<StatusUpdate>;

    /// Returns a snapshot of the port's transmit/receive counters.
    fn counters(&self) -> PortCounters;

    /// Returns the Auto-Attach servers discovered on this port.
    fn servers(&self) -> Vec<ServerInfo>;
}

/// Factory for per-port protocol state.
pub trait Engine: Send + Sync {
    /// Allocates engine state for one port.
    ///
    /// The Auto-Attach manager treats failure here as unrecoverable for the
    /// calling process.
    fn create_port(&self, cfg: &PortConfig) -> Result<Box<dyn EnginePort>, EngineError>;
}
