//! Modbus TCP transport on top of `tokio_modbus::client::sync`
//!
//! The sync client drives its own single threaded runtime, so the blocking
//! session API needs no async executor from the caller.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use tokio_modbus::client::sync;
use tokio_modbus::prelude::{Slave, SlaveContext, SyncReader, SyncWriter};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::{Connector, Endpoint, TransportHandle, TransportResult};

/// Opens Modbus TCP connections
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    /// Bound on the TCP handshake, `None` leaves it to the OS
    connect_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// Resolve `host:port`, taking the first address the resolver returns
fn resolve(endpoint: &Endpoint) -> TransportResult<SocketAddr> {
    (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            TransportError::Io(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no address found for {endpoint}"),
            ))
        })
}

/// Flatten the nested tokio-modbus result: outer layer is transport, inner
/// layer is the device's exception response
fn map_modbus_result<T>(result: tokio_modbus::Result<T>) -> TransportResult<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(TransportError::exception(exception.to_string())),
        Err(err) => Err(map_modbus_error(err)),
    }
}

fn map_modbus_error(err: tokio_modbus::Error) -> TransportError {
    match err {
        tokio_modbus::Error::Transport(io_err) => TransportError::Io(io_err),
        other => TransportError::protocol(other.to_string()),
    }
}

impl Connector for TcpConnector {
    type Handle = TcpHandle;

    fn open(&self, endpoint: &Endpoint) -> TransportResult<TcpHandle> {
        let peer = resolve(endpoint)?;
        debug!("Opening Modbus TCP connection to {}", peer);
        let ctx = sync::tcp::connect_with_timeout(peer, self.connect_timeout)?;
        Ok(TcpHandle {
            ctx: Some(ctx),
            peer,
        })
    }
}

/// Open Modbus TCP connection
pub struct TcpHandle {
    ctx: Option<sync::Context>,
    peer: SocketAddr,
}

impl TcpHandle {
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn context(&mut self, slave: u8) -> TransportResult<&mut sync::Context> {
        let ctx = self.ctx.as_mut().ok_or_else(|| {
            TransportError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection already closed",
            ))
        })?;
        ctx.set_slave(Slave(slave));
        Ok(ctx)
    }
}

impl std::fmt::Debug for TcpHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpHandle")
            .field("peer", &self.peer)
            .field("open", &self.ctx.is_some())
            .finish()
    }
}

impl TransportHandle for TcpHandle {
    fn set_timeout(&mut self, timeout: Duration) {
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.set_timeout(Some(timeout));
        }
    }

    fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> TransportResult<Vec<u16>> {
        let ctx = self.context(slave)?;
        map_modbus_result(ctx.read_holding_registers(address, count))
    }

    fn write_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        values: &[u16],
    ) -> TransportResult<()> {
        let ctx = self.context(slave)?;
        map_modbus_result(ctx.write_multiple_registers(address, values))
    }

    fn close(&mut self) {
        // Dropping the context shuts down the socket and its runtime
        if self.ctx.take().is_some() {
            debug!("Closed Modbus TCP connection to {}", self.peer);
        }
    }
}
