//! Register Link Error Types
//!
//! `TransportError` is what a transport primitive reports; `LinkError` is what
//! session operations return to callers.

use plc_codec::CodecError;
use thiserror::Error;

/// Result type for plc-link operations
pub type Result<T> = std::result::Result<T, LinkError>;

/// Failure reported by the underlying Modbus transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket level failure (refused, reset, timeout)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with a Modbus exception response
    #[error("Modbus exception: {0}")]
    Exception(String),

    /// Malformed or unexpected response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Fewer (or more) registers than requested
    #[error("Short response: expected {expected} registers, got {actual}")]
    ShortResponse { expected: usize, actual: usize },
}

impl TransportError {
    pub fn exception(msg: impl Into<String>) -> Self {
        TransportError::Exception(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        TransportError::Protocol(msg.into())
    }
}

/// Register session errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// I/O attempted without an active transport handle
    #[error("Not connected")]
    NotConnected,

    /// Read holding registers failed at the transport
    #[error("Read of {count} holding registers at {address} failed: {source}")]
    TransportReadFailed {
        address: u16,
        count: usize,
        source: TransportError,
    },

    /// Write holding registers failed at the transport
    #[error("Write of {count} holding registers at {address} failed: {source}")]
    TransportWriteFailed {
        address: u16,
        count: usize,
        source: TransportError,
    },

    /// Request rejected before reaching the transport
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value encoding/decoding errors
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

// Helper methods for creating errors
impl LinkError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        LinkError::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        LinkError::Config(msg.into())
    }

    /// Check if the error came from the transport (as opposed to bad input)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LinkError::TransportReadFailed { .. } | LinkError::TransportWriteFailed { .. }
        )
    }
}
