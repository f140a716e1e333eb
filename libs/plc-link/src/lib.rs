//! # plc-link
//!
//! Modbus TCP master session for exchanging process values with a PLC over
//! holding registers.
//!
//! - [`RegisterSession`]: bounded-retry connect with a heartbeat probe,
//!   serialized raw register I/O, and typed value read/write through
//!   [`plc_codec`]
//! - [`Connector`] / [`TransportHandle`]: the seam to the Modbus wire
//! - [`TcpConnector`]: `tokio-modbus` sync TCP client (feature `tcp`)
//! - [`LinkConfig`]: figment-loaded session settings
//!
//! ```no_run
//! use plc_codec::{ByteOrder, Number, RegisterFormat};
//! use plc_link::{LinkConfig, RegisterSession};
//!
//! # fn main() -> plc_link::Result<()> {
//! let config = LinkConfig::default().with_host("192.168.0.10").with_max_retries(3);
//! let session = RegisterSession::tcp(&config)?;
//! if session.connect() {
//!     session.write_values(
//!         100,
//!         &[Number::Float(21.5)],
//!         RegisterFormat::Float,
//!         ByteOrder::LittleEndianRegisterSwap,
//!     )?;
//!     session.close();
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod transport;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::LinkConfig;
pub use error::{LinkError, Result, TransportError};
pub use session::{RegisterSession, HEARTBEAT_ADDRESS, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};
pub use state::ConnectionState;
pub use transport::{Connector, Endpoint, TransportHandle, TransportResult};

#[cfg(feature = "tcp")]
pub use tcp::{TcpConnector, TcpHandle};

// Re-export the codec so callers need a single dependency
pub use plc_codec;
