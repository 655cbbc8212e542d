//! aamgrd - Auto-Attach mapping manager
//!
//! Control-plane registry and synchronization layer for an Auto-Attach
//! (802.1Qbg-style) extension riding on an LLDP protocol engine. Maintains,
//! per switch port, the I-SID/VLAN mappings advertised to an upstream
//! Auto-Attach server, keeps them consistent across independently created
//! per-port protocol instances, and hands VLAN provisioning decisions to the
//! forwarding subsystem through a polled queue.
//!
//! The Auto-Attach accept/reject state machine is not implemented: mappings
//! are tracked and exchanged, not driven through a formal protocol state
//! machine. The registry is global across bridges.

mod diag;
mod instance;
mod registry;
mod types;

pub use diag::{chassis_id_to_string, DiagKind, DiagRequest};
pub use instance::{Instance, TxTimer, DEFAULT_TX_INTERVAL};
pub use registry::{should_process_frame, AutoAttach};
pub use types::*;
