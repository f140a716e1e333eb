//! Write/read-back self test against a live PLC
//!
//! Writes a list of signed words and a list of signed double words, reads
//! each back and compares. A passing run proves the link, the slave id and
//! the chosen byte order end to end.

use anyhow::Result;
use plc_codec::{ByteOrder, Number, RegisterFormat};
use plc_link::{Connector, RegisterSession};
use tracing::{info, warn};

pub const SIGNED_WORDS: [i64; 9] = [-1, -32768, -1567, 0, 32766, 16524, 32767, 1, 4567];

pub const SIGNED_DWORDS: [i64; 12] = [
    -1,
    -123_456_789,
    -1567,
    0,
    123_456_789,
    16524,
    360_123,
    -1_456_789,
    0,
    1,
    45_678_912,
    -45_678_912,
];

/// Offset of the float register pair reported after the round trips
pub const FLOAT_OFFSET: u16 = 40;

/// Outcome of one write/read-back pass
#[derive(Debug, Clone, PartialEq)]
pub struct CaseReport {
    pub format: RegisterFormat,
    pub written: Vec<Number>,
    pub read: Vec<Number>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.written == self.read
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestReport {
    pub cases: Vec<CaseReport>,
    /// Float found at `address + FLOAT_OFFSET`, for a visual sanity check
    pub float_probe: Option<Number>,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(CaseReport::passed)
    }
}

fn round_trip<C: Connector>(
    session: &RegisterSession<C>,
    address: u16,
    format: RegisterFormat,
    order: ByteOrder,
    values: &[i64],
) -> Result<CaseReport> {
    let written: Vec<Number> = values.iter().copied().map(Number::Int).collect();
    session.write_values(address, &written, format, order)?;
    let read = session.read_values(address, written.len(), format, order)?;

    let report = CaseReport {
        format,
        written,
        read,
    };
    if report.passed() {
        info!("Self test {} ok", format);
    } else {
        warn!("Self test {} failed", format);
    }
    Ok(report)
}

/// Run both round trips at `address` on a connected session
pub fn run<C: Connector>(
    session: &RegisterSession<C>,
    address: u16,
    order: ByteOrder,
) -> Result<SelfTestReport> {
    let cases = vec![
        round_trip(session, address, RegisterFormat::SignedWord, order, &SIGNED_WORDS)?,
        round_trip(session, address, RegisterFormat::SignedDWord, order, &SIGNED_DWORDS)?,
    ];

    // Informational only; the slot may legitimately hold anything
    let float_probe = address
        .checked_add(FLOAT_OFFSET)
        .and_then(|float_address| {
            session
                .read_values(float_address, 1, RegisterFormat::Float, order)
                .ok()
        })
        .and_then(|values| values.first().copied());

    Ok(SelfTestReport { cases, float_probe })
}
