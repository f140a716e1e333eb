//! Scripted in-memory PLC for exercising sessions without a network
//!
//! [`MockPlc`] is a cloneable handle to shared state: register memory,
//! failure scripts and counters. [`MockConnector`] hands out [`MockHandle`]s
//! bound to it.

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::TransportError;
use crate::transport::{Connector, Endpoint, TransportHandle, TransportResult};

const ADDRESS_SPACE: usize = u16::MAX as usize + 1;

#[derive(Debug)]
struct PlcState {
    memory: Vec<u16>,
    fail_opens: u32,
    fail_reads: u32,
    fail_writes: bool,
    short_reads: bool,
    opens: u32,
    closes: u32,
    last_slave: Option<u8>,
    last_timeout: Option<Duration>,
    writes: Vec<(u16, Vec<u16>)>,
}

impl Default for PlcState {
    fn default() -> Self {
        Self {
            memory: vec![0; ADDRESS_SPACE],
            fail_opens: 0,
            fail_reads: 0,
            fail_writes: false,
            short_reads: false,
            opens: 0,
            closes: 0,
            last_slave: None,
            last_timeout: None,
            writes: Vec::new(),
        }
    }
}

/// Shared state of a fake PLC
#[derive(Debug, Clone, Default)]
pub struct MockPlc {
    state: Arc<Mutex<PlcState>>,
    in_flight: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
    call_delay: Duration,
}

impl MockPlc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every register call for `delay`, widening any overlap window
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = delay;
        self
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector { plc: self.clone() }
    }

    /// The next `n` opens fail with connection refused
    pub fn fail_next_opens(&self, n: u32) {
        self.state.lock().fail_opens = n;
    }

    /// The next `n` register reads fail with a timeout, probe reads included
    pub fn fail_next_reads(&self, n: u32) {
        self.state.lock().fail_reads = n;
    }

    /// Every write answers with an exception while set
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Reads return one register less than requested while set
    pub fn set_short_reads(&self, short: bool) {
        self.state.lock().short_reads = short;
    }

    pub fn set_registers(&self, address: u16, values: &[u16]) {
        let start = usize::from(address);
        self.state.lock().memory[start..start + values.len()].copy_from_slice(values);
    }

    pub fn registers(&self, address: u16, count: usize) -> Vec<u16> {
        let start = usize::from(address);
        self.state.lock().memory[start..start + count].to_vec()
    }

    pub fn opens(&self) -> u32 {
        self.state.lock().opens
    }

    pub fn closes(&self) -> u32 {
        self.state.lock().closes
    }

    pub fn last_slave(&self) -> Option<u8> {
        self.state.lock().last_slave
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        self.state.lock().last_timeout
    }

    /// Successful writes in arrival order
    pub fn writes(&self) -> Vec<(u16, Vec<u16>)> {
        self.state.lock().writes.clone()
    }

    /// Register calls that started while another was still running
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn enter(&self) -> CallGuard<'_> {
        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.call_delay.is_zero() {
            thread::sleep(self.call_delay);
        }
        CallGuard { plc: self }
    }
}

struct CallGuard<'a> {
    plc: &'a MockPlc,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.plc.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Connector for a [`MockPlc`]
#[derive(Debug, Clone)]
pub struct MockConnector {
    plc: MockPlc,
}

impl Connector for MockConnector {
    type Handle = MockHandle;

    fn open(&self, _endpoint: &Endpoint) -> TransportResult<MockHandle> {
        let mut state = self.plc.state.lock();
        state.opens += 1;
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused").into());
        }
        Ok(MockHandle {
            plc: self.plc.clone(),
            open: true,
        })
    }
}

/// Open connection to a [`MockPlc`]
#[derive(Debug)]
pub struct MockHandle {
    plc: MockPlc,
    open: bool,
}

impl MockHandle {
    fn check_open(&self) -> TransportResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotConnected, "handle closed").into())
        }
    }
}

impl TransportHandle for MockHandle {
    fn set_timeout(&mut self, timeout: Duration) {
        self.plc.state.lock().last_timeout = Some(timeout);
    }

    fn read_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        count: u16,
    ) -> TransportResult<Vec<u16>> {
        self.check_open()?;
        let _call = self.plc.enter();

        let mut state = self.plc.state.lock();
        state.last_slave = Some(slave);
        if state.fail_reads > 0 {
            state.fail_reads -= 1;
            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out").into());
        }

        let start = usize::from(address);
        let end = (start + usize::from(count)).min(ADDRESS_SPACE);
        let mut values = state.memory[start..end].to_vec();
        if state.short_reads {
            values.pop();
        }
        Ok(values)
    }

    fn write_holding_registers(
        &mut self,
        slave: u8,
        address: u16,
        values: &[u16],
    ) -> TransportResult<()> {
        self.check_open()?;
        let _call = self.plc.enter();

        let mut state = self.plc.state.lock();
        state.last_slave = Some(slave);
        if state.fail_writes {
            return Err(TransportError::exception("Illegal data address"));
        }

        let start = usize::from(address);
        let end = start + values.len();
        if end > ADDRESS_SPACE {
            return Err(TransportError::exception("Illegal data address"));
        }
        state.memory[start..end].copy_from_slice(values);
        state.writes.push((address, values.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.plc.state.lock().closes += 1;
        }
    }
}
