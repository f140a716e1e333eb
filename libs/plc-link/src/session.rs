//! Holding register session
//!
//! A [`RegisterSession`] owns at most one transport handle. Every register
//! call locks the session guard for the duration of the transport call, so
//! register I/O on one session is strictly serialized across threads.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use plc_codec::{ByteOrder, Number, RegisterFormat};
use tracing::{debug, error, info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result, TransportError};
use crate::state::ConnectionState;
use crate::transport::{Connector, Endpoint, TransportHandle, TransportResult};

/// Register read right after opening a connection to prove the link works
pub const HEARTBEAT_ADDRESS: u16 = 0;

/// Modbus limit for one read holding registers request (0x03)
pub const MAX_READ_REGISTERS: usize = 125;

/// Modbus limit for one write multiple registers request (0x10)
pub const MAX_WRITE_REGISTERS: usize = 123;

/// Handle plus state, only ever touched under the session guard
struct Link<H> {
    handle: Option<H>,
    state: ConnectionState,
}

impl<H: TransportHandle> Link<H> {
    fn handle_mut(&mut self) -> Result<&mut H> {
        match (self.state, self.handle.as_mut()) {
            (ConnectionState::Connected, Some(handle)) => Ok(handle),
            _ => Err(LinkError::NotConnected),
        }
    }

    /// Close and drop the handle if any. Returns whether one was open.
    fn release(&mut self) -> bool {
        self.state = ConnectionState::Disconnected;
        match self.handle.take() {
            Some(mut handle) => {
                handle.close();
                true
            },
            None => false,
        }
    }
}

/// Modbus TCP master session for one PLC endpoint
pub struct RegisterSession<C: Connector> {
    connector: C,
    endpoint: Endpoint,
    timeout: Duration,
    max_retries: u32,
    slave_id: AtomicU8,
    signed: AtomicBool,
    link: Mutex<Link<C::Handle>>,
}

#[cfg(feature = "tcp")]
impl RegisterSession<crate::tcp::TcpConnector> {
    /// Session over Modbus TCP. The TCP handshake is bounded by the request timeout.
    pub fn tcp(config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        let connector = crate::tcp::TcpConnector::new().with_connect_timeout(config.timeout());
        Self::new(connector, config)
    }
}

impl<C: Connector> RegisterSession<C> {
    /// Create a disconnected session. Nothing is opened until [`connect`](Self::connect).
    pub fn new(connector: C, config: &LinkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            connector,
            endpoint: config.endpoint(),
            timeout: config.timeout(),
            max_retries: config.max_retries,
            slave_id: AtomicU8::new(config.slave_id),
            signed: AtomicBool::new(config.signed),
            link: Mutex::new(Link {
                handle: None,
                state: ConnectionState::Disconnected,
            }),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id.load(Ordering::Relaxed)
    }

    /// Unit id used by subsequent requests
    pub fn set_slave_id(&self, slave_id: u8) {
        self.slave_id.store(slave_id, Ordering::Relaxed);
    }

    pub fn signed(&self) -> bool {
        self.signed.load(Ordering::Relaxed)
    }

    /// Default signedness for [`write_words`](Self::write_words) and [`read_words`](Self::read_words)
    pub fn set_signed(&self, signed: bool) {
        self.signed.store(signed, Ordering::Relaxed);
    }

    pub fn state(&self) -> ConnectionState {
        self.link.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Open the transport and prove it with a probe read
    ///
    /// Makes up to `max_retries` attempts, pausing `timeout` between them.
    /// Returns `true` once an attempt's probe read succeeds and `false` when
    /// every attempt failed, leaving the session disconnected. An existing
    /// connection is closed first.
    pub fn connect(&self) -> bool {
        for attempt in 1..=self.max_retries {
            match self.try_connect() {
                Ok(()) => {
                    info!(
                        "Connected to {} (slave {}) on attempt {}/{}",
                        self.endpoint,
                        self.slave_id(),
                        attempt,
                        self.max_retries
                    );
                    return true;
                },
                Err(e) => {
                    warn!(
                        "Connect attempt {}/{} to {} failed: {}",
                        attempt, self.max_retries, self.endpoint, e
                    );
                },
            }

            if attempt < self.max_retries {
                thread::sleep(self.timeout);
            }
        }

        error!(
            "Could not connect to {} after {} attempts",
            self.endpoint, self.max_retries
        );
        false
    }

    /// One open + probe attempt, holding the guard throughout
    ///
    /// Any handle stored since the previous attempt (including one opened by
    /// a concurrent `connect`) is closed before the new one replaces it.
    fn try_connect(&self) -> TransportResult<()> {
        let mut link = self.link.lock();
        if link.release() {
            debug!("Closed previous connection to {} before reconnecting", self.endpoint);
        }
        link.state = ConnectionState::Connecting;

        let result = self.open_and_probe();
        match result {
            Ok(handle) => {
                link.handle = Some(handle);
                link.state = ConnectionState::Connected;
                Ok(())
            },
            Err(e) => {
                link.state = ConnectionState::Disconnected;
                Err(e)
            },
        }
    }

    fn open_and_probe(&self) -> TransportResult<C::Handle> {
        let mut handle = self.connector.open(&self.endpoint)?;
        handle.set_timeout(self.timeout);

        let probe = handle.read_holding_registers(self.slave_id(), HEARTBEAT_ADDRESS, 1);
        match probe {
            Ok(regs) if regs.len() == 1 => Ok(handle),
            Ok(regs) => {
                handle.close();
                Err(TransportError::ShortResponse {
                    expected: 1,
                    actual: regs.len(),
                })
            },
            Err(e) => {
                handle.close();
                Err(e)
            },
        }
    }

    /// Write raw register words starting at `address`
    pub fn write_holding_registers(&self, address: u16, values: &[u16]) -> Result<()> {
        let count = values.len();
        check_span(address, count, MAX_WRITE_REGISTERS)?;

        let mut link = self.link.lock();
        let handle = link.handle_mut()?;
        let slave = self.slave_id();

        debug!("Writing {} holding registers at {} (slave {})", count, address, slave);
        handle
            .write_holding_registers(slave, address, values)
            .map_err(|source| {
                error!("Write of {} registers at {} failed: {}", count, address, source);
                LinkError::TransportWriteFailed {
                    address,
                    count,
                    source,
                }
            })
    }

    /// Read `count` raw register words starting at `address`
    pub fn read_holding_registers(&self, address: u16, count: usize) -> Result<Vec<u16>> {
        let quantity = check_span(address, count, MAX_READ_REGISTERS)?;

        let mut link = self.link.lock();
        let handle = link.handle_mut()?;
        let slave = self.slave_id();

        debug!("Reading {} holding registers at {} (slave {})", count, address, slave);
        handle
            .read_holding_registers(slave, address, quantity)
            .and_then(|regs| {
                if regs.len() == count {
                    Ok(regs)
                } else {
                    Err(TransportError::ShortResponse {
                        expected: count,
                        actual: regs.len(),
                    })
                }
            })
            .map_err(|source| {
                error!("Read of {} registers at {} failed: {}", count, address, source);
                LinkError::TransportReadFailed {
                    address,
                    count,
                    source,
                }
            })
    }

    /// Encode `values` and write them as one contiguous block
    pub fn write_values(
        &self,
        address: u16,
        values: &[Number],
        format: RegisterFormat,
        order: ByteOrder,
    ) -> Result<()> {
        let registers = plc_codec::encode(values, format, order)?;
        self.write_holding_registers(address, &registers)
    }

    /// Read `value_count` values of `format` starting at `address`
    pub fn read_values(
        &self,
        address: u16,
        value_count: usize,
        format: RegisterFormat,
        order: ByteOrder,
    ) -> Result<Vec<Number>> {
        let count = value_count.checked_mul(format.word_count()).ok_or_else(|| {
            LinkError::invalid_request(format!("{value_count} values of {format} overflow"))
        })?;
        let registers = self.read_holding_registers(address, count)?;
        Ok(plc_codec::decode(&registers, format, order)?)
    }

    /// Write single register words using the session's signedness
    pub fn write_words(&self, address: u16, values: &[Number]) -> Result<()> {
        self.write_values(address, values, self.word_format(), ByteOrder::BigEndian)
    }

    /// Read single register words using the session's signedness
    pub fn read_words(&self, address: u16, count: usize) -> Result<Vec<Number>> {
        self.read_values(address, count, self.word_format(), ByteOrder::BigEndian)
    }

    fn word_format(&self) -> RegisterFormat {
        RegisterFormat::word(self.signed())
    }

    /// Release the transport handle. Safe to call when already closed.
    pub fn close(&self) {
        if self.link.lock().release() {
            info!("Closed connection to {}", self.endpoint);
        }
    }
}

impl<C: Connector> Drop for RegisterSession<C> {
    fn drop(&mut self) {
        self.link.get_mut().release();
    }
}

impl<C: Connector> std::fmt::Debug for RegisterSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterSession")
            .field("endpoint", &self.endpoint)
            .field("slave_id", &self.slave_id())
            .field("signed", &self.signed())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Validate a request span and return its Modbus quantity
fn check_span(address: u16, count: usize, limit: usize) -> Result<u16> {
    if count == 0 {
        return Err(LinkError::invalid_request("register count must be at least 1"));
    }
    if count > limit {
        return Err(LinkError::invalid_request(format!(
            "{count} registers exceed the {limit} register limit of one request"
        )));
    }
    if usize::from(address) + count > usize::from(u16::MAX) + 1 {
        return Err(LinkError::invalid_request(format!(
            "{count} registers at {address} run past the end of the address space"
        )));
    }
    // count <= limit <= 125
    Ok(count as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockConnector, MockPlc};
    use std::sync::Arc;
    use std::time::Instant;
    use tracing_test::traced_test;

    fn config(max_retries: u32) -> LinkConfig {
        LinkConfig::default()
            .with_timeout(Duration::from_millis(5))
            .with_max_retries(max_retries)
    }

    fn session(plc: &MockPlc, max_retries: u32) -> RegisterSession<MockConnector> {
        RegisterSession::new(plc.connector(), &config(max_retries)).unwrap()
    }

    fn connected(plc: &MockPlc) -> RegisterSession<MockConnector> {
        let session = session(plc, 1);
        assert!(session.connect());
        session
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let plc = MockPlc::new();
        let session = session(&plc, 3);

        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert_eq!(session.endpoint().to_string(), "127.0.0.1:502");
        assert_eq!(session.slave_id(), 1);
        assert!(session.signed());
        assert_eq!(plc.opens(), 0);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = RegisterSession::new(MockPlc::new().connector(), &config(0));
        assert!(matches!(result, Err(LinkError::Config(_))));
    }

    #[test]
    fn test_connect_first_attempt() {
        let plc = MockPlc::new();
        let session = session(&plc, 3);

        assert!(session.connect());
        assert!(session.is_connected());
        assert_eq!(plc.opens(), 1);
        assert_eq!(plc.last_timeout(), Some(Duration::from_millis(5)));
        assert_eq!(plc.last_slave(), Some(1));
    }

    #[test]
    fn test_connect_retries_until_probe_succeeds() {
        let plc = MockPlc::new();
        plc.fail_next_reads(2);
        let session = session(&plc, 3);

        assert!(session.connect());
        assert_eq!(plc.opens(), 3);
        // Handles whose probe failed are closed
        assert_eq!(plc.closes(), 2);
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_connect_gives_up_after_max_retries() {
        let plc = MockPlc::new();
        plc.fail_next_opens(u32::MAX);
        let session = session(&plc, 4);

        assert!(!session.connect());
        assert_eq!(plc.opens(), 4);
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(matches!(
            session.read_holding_registers(0, 1),
            Err(LinkError::NotConnected)
        ));
    }

    #[test]
    fn test_connect_rejects_short_probe() {
        let plc = MockPlc::new();
        plc.set_short_reads(true);
        let session = session(&plc, 2);

        assert!(!session.connect());
        assert_eq!(plc.opens(), 2);
        assert_eq!(plc.closes(), 2);
    }

    #[test]
    fn test_reconnect_closes_previous_handle() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        assert!(session.connect());
        assert_eq!(plc.opens(), 2);
        assert_eq!(plc.closes(), 1);
        assert!(session.is_connected());
    }

    #[test]
    fn test_connect_pauses_between_attempts_only() {
        let plc = MockPlc::new();
        plc.fail_next_opens(u32::MAX);
        let timeout = Duration::from_millis(100);
        let config = LinkConfig::default()
            .with_timeout(timeout)
            .with_max_retries(3);
        let session = RegisterSession::new(plc.connector(), &config).unwrap();

        let started = Instant::now();
        assert!(!session.connect());
        let elapsed = started.elapsed();

        assert_eq!(plc.opens(), 3);
        // Two pauses for three attempts, none after the last
        assert!(elapsed >= timeout * 2, "{elapsed:?}");
        assert!(elapsed < timeout * 3, "{elapsed:?}");
    }

    #[test]
    fn test_overlapping_connects_close_replaced_handle() {
        let plc = MockPlc::new();
        plc.fail_next_opens(1);
        let config = LinkConfig::default()
            .with_timeout(Duration::from_millis(200))
            .with_max_retries(2);
        let session = RegisterSession::new(plc.connector(), &config).unwrap();

        thread::scope(|s| {
            // First attempt fails, then sleeps while the main thread connects
            let retrying = s.spawn(|| session.connect());
            thread::sleep(Duration::from_millis(50));
            assert!(session.connect());
            assert!(retrying.join().unwrap());
        });

        assert_eq!(plc.opens(), 3);
        assert_eq!(plc.closes(), 1);
        assert!(session.is_connected());

        session.close();
        // Every successfully opened handle was closed exactly once
        assert_eq!(plc.closes(), plc.opens() - 1);
    }

    #[test]
    #[traced_test]
    fn test_connect_failures_are_logged() {
        let plc = MockPlc::new();
        plc.fail_next_opens(u32::MAX);
        let session = session(&plc, 2);

        assert!(!session.connect());
        assert!(logs_contain("Connect attempt 1/2 to 127.0.0.1:502 failed"));
        assert!(logs_contain("Connect attempt 2/2 to 127.0.0.1:502 failed"));
        assert!(logs_contain("Could not connect to 127.0.0.1:502 after 2 attempts"));
    }

    #[test]
    fn test_io_requires_connection() {
        let plc = MockPlc::new();
        let session = session(&plc, 1);

        assert!(matches!(
            session.write_holding_registers(10, &[1, 2]),
            Err(LinkError::NotConnected)
        ));
        assert!(matches!(
            session.read_values(10, 1, RegisterFormat::Float, ByteOrder::BigEndian),
            Err(LinkError::NotConnected)
        ));
        assert!(plc.writes().is_empty());
    }

    #[test]
    fn test_write_then_read_registers() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        session.write_holding_registers(100, &[0xFFFF, 0x8000, 0, 0x7FFF]).unwrap();
        assert_eq!(plc.registers(100, 4), vec![0xFFFF, 0x8000, 0, 0x7FFF]);
        assert_eq!(plc.writes(), vec![(100, vec![0xFFFF, 0x8000, 0, 0x7FFF])]);

        let regs = session.read_holding_registers(100, 4).unwrap();
        assert_eq!(regs, vec![0xFFFF, 0x8000, 0, 0x7FFF]);
    }

    #[test]
    fn test_slave_id_applies_to_next_request() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        session.set_slave_id(17);
        session.read_holding_registers(0, 1).unwrap();
        assert_eq!(plc.last_slave(), Some(17));
    }

    #[test]
    fn test_write_failure_is_wrapped() {
        let plc = MockPlc::new();
        let session = connected(&plc);
        plc.set_fail_writes(true);

        let err = session.write_holding_registers(40, &[1, 2]).unwrap_err();
        assert!(matches!(
            err,
            LinkError::TransportWriteFailed {
                address: 40,
                count: 2,
                source: TransportError::Exception(_)
            }
        ));
        // Transport failures leave the connection in place
        assert!(session.is_connected());
    }

    #[test]
    fn test_read_failure_is_wrapped() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        plc.fail_next_reads(1);
        let err = session.read_holding_registers(8, 3).unwrap_err();
        assert!(matches!(
            err,
            LinkError::TransportReadFailed {
                address: 8,
                count: 3,
                source: TransportError::Io(_)
            }
        ));

        plc.set_short_reads(true);
        let err = session.read_holding_registers(8, 3).unwrap_err();
        assert!(matches!(
            err,
            LinkError::TransportReadFailed {
                source: TransportError::ShortResponse {
                    expected: 3,
                    actual: 2
                },
                ..
            }
        ));
    }

    #[test]
    fn test_span_limits() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        assert!(matches!(
            session.read_holding_registers(0, 0),
            Err(LinkError::InvalidRequest(_))
        ));
        assert!(matches!(
            session.read_holding_registers(0, MAX_READ_REGISTERS + 1),
            Err(LinkError::InvalidRequest(_))
        ));
        assert!(matches!(
            session.write_holding_registers(0, &[0; MAX_WRITE_REGISTERS + 1]),
            Err(LinkError::InvalidRequest(_))
        ));
        assert!(matches!(
            session.write_holding_registers(u16::MAX, &[1, 2]),
            Err(LinkError::InvalidRequest(_))
        ));
        assert!(matches!(
            session.write_holding_registers(0, &[]),
            Err(LinkError::InvalidRequest(_))
        ));

        session.read_holding_registers(0, MAX_READ_REGISTERS).unwrap();
        session.write_holding_registers(u16::MAX, &[7]).unwrap();
        assert_eq!(plc.registers(u16::MAX, 1), vec![7]);
    }

    #[test]
    fn test_values_round_trip() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        let values = [Number::Int(-123_456_789), Number::Int(360_123)];
        session
            .write_values(
                200,
                &values,
                RegisterFormat::SignedDWord,
                ByteOrder::LittleEndianRegisterSwap,
            )
            .unwrap();
        assert_eq!(plc.registers(200, 2), vec![0x32EB, 0xF8A4]);

        let back = session
            .read_values(
                200,
                2,
                RegisterFormat::SignedDWord,
                ByteOrder::LittleEndianRegisterSwap,
            )
            .unwrap();
        assert_eq!(back, values);

        session
            .write_values(300, &[Number::Float(1.5)], RegisterFormat::Float, ByteOrder::BigEndianByteSwap)
            .unwrap();
        let back = session
            .read_values(300, 1, RegisterFormat::Float, ByteOrder::BigEndianByteSwap)
            .unwrap();
        assert_eq!(back, vec![Number::Float(1.5)]);
    }

    #[test]
    fn test_write_values_rejects_before_transport() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        let err = session
            .write_values(0, &[Number::Int(70_000)], RegisterFormat::SignedWord, ByteOrder::BigEndian)
            .unwrap_err();
        assert!(matches!(err, LinkError::Codec(_)));
        assert!(plc.writes().is_empty());
    }

    #[test]
    fn test_words_follow_session_signedness() {
        let plc = MockPlc::new();
        let session = connected(&plc);
        plc.set_registers(0, &[0xFFFF]);

        assert_eq!(session.read_words(0, 1).unwrap(), vec![Number::Int(-1)]);

        session.set_signed(false);
        assert_eq!(session.read_words(0, 1).unwrap(), vec![Number::UInt(65535)]);

        session.write_words(5, &[Number::UInt(40_000)]).unwrap();
        assert_eq!(plc.registers(5, 1), vec![40_000]);
        assert!(matches!(
            session.write_words(5, &[Number::Int(-1)]),
            Err(LinkError::Codec(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let plc = MockPlc::new();
        let session = connected(&plc);

        session.close();
        session.close();
        assert_eq!(plc.closes(), 1);
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(matches!(
            session.write_holding_registers(0, &[1]),
            Err(LinkError::NotConnected)
        ));
    }

    #[test]
    fn test_drop_closes_handle() {
        let plc = MockPlc::new();
        drop(connected(&plc));
        assert_eq!(plc.closes(), 1);
    }

    #[test]
    fn test_concurrent_calls_never_overlap() {
        let plc = MockPlc::new().with_call_delay(Duration::from_millis(2));
        let session = Arc::new(connected(&plc));

        thread::scope(|s| {
            for worker in 0..8u16 {
                let session = Arc::clone(&session);
                s.spawn(move || {
                    for i in 0..5u16 {
                        let address = worker * 10 + i;
                        session.write_holding_registers(address, &[worker, i]).unwrap();
                        session.read_holding_registers(address, 2).unwrap();
                    }
                });
            }
        });

        assert_eq!(plc.overlaps(), 0);
        assert_eq!(plc.writes().len(), 40);
    }
}
