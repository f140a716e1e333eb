//! Transport seam between the session and the Modbus wire
//!
//! A [`Connector`] opens handles; a [`TransportHandle`] moves holding
//! registers for one open connection. The session never talks to sockets
//! directly, so tests can swap in a scripted connector.

use std::fmt;
use std::time::Duration;

use crate::error::TransportError;

/// Transport result type
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Remote PLC address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens transport handles
pub trait Connector: Send + Sync {
    type Handle: TransportHandle;

    /// Open a new connection to `endpoint`
    fn open(&self, endpoint: &Endpoint) -> TransportResult<Self::Handle>;
}

/// One open Modbus connection
///
/// Register words are plain big-endian 16-bit values; byte order
/// interpretation belongs to the codec.
pub trait TransportHandle: Send {
    /// Timeout applied to every subsequent request
    fn set_timeout(&mut self, timeout: Duration);

    /// Function code 0x03
    fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> TransportResult<Vec<u16>>;

    /// Function code 0x10
    fn write_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        values: &[u16],
    ) -> TransportResult<()>;

    /// Release the connection. Calling it twice is harmless.
    fn close(&mut self);
}
