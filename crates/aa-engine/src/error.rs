//! Error types for engine operations.

use thiserror::Error;

/// Errors surfaced by a protocol engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Failed to allocate per-port protocol state.
    #[error("Unable to allocate port state for '{port}': {message}")]
    PortAlloc {
        /// The port the allocation was for.
        port: String,
        /// Engine-specific detail.
        message: String,
    },
}

impl EngineError {
    /// Creates a port allocation error.
    pub fn port_alloc(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PortAlloc {
            port: port.into(),
            message: message.into(),
        }
    }
}
