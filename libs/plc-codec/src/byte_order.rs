//! Byte and register order of multi-register values
//!
//! PLC vendors disagree on two independent axes:
//! - **Byte order**: which byte comes first inside one 16-bit register
//! - **Register order**: which register comes first inside a 32/64-bit value
//!
//! # Naming Convention
//! Uses ABCD notation where:
//! - A = Most significant byte (MSB)
//! - B = Second byte
//! - C = Third byte
//! - D = Least significant byte (LSB)
//!
//! For the 32-bit value `0x12345678` written to two holding registers:
//! - `BigEndian (ABCD)`: [0x1234, 0x5678]
//! - `LittleEndian (DCBA)`: [0x7856, 0x3412]
//! - `BigEndianByteSwap (BADC)`: [0x3412, 0x7856]
//! - `LittleEndianRegisterSwap (CDAB)`: [0x5678, 0x1234]

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One of the four supported byte/register orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ByteOrder {
    /// Big-endian: ABCD (natural order at both levels)
    ///
    /// Siemens-style, the "read friendly" reference layout.
    /// Example: 0x12345678 → [0x1234, 0x5678]
    #[default]
    BigEndian,

    /// Little-endian: DCBA (bytes and registers both reversed)
    ///
    /// Example: 0x12345678 → [0x7856, 0x3412]
    LittleEndian,

    /// Big-endian with bytes swapped inside each register: BADC
    ///
    /// Example: 0x12345678 → [0x3412, 0x7856]
    BigEndianByteSwap,

    /// Little-endian register order, natural bytes: CDAB
    ///
    /// Common in Modbus devices that store the low word first.
    /// Example: 0x12345678 → [0x5678, 0x1234]
    LittleEndianRegisterSwap,
}

impl ByteOrder {
    /// All supported orders
    pub const ALL: [ByteOrder; 4] = [
        Self::BigEndian,
        Self::LittleEndian,
        Self::BigEndianByteSwap,
        Self::LittleEndianRegisterSwap,
    ];

    /// ABCD pattern of a 32-bit value in this order
    pub fn code(&self) -> &'static str {
        match self {
            Self::BigEndian => "ABCD",
            Self::LittleEndian => "DCBA",
            Self::BigEndianByteSwap => "BADC",
            Self::LittleEndianRegisterSwap => "CDAB",
        }
    }

    /// Get descriptive name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BigEndian => "ABCD (Big-Endian)",
            Self::LittleEndian => "DCBA (Little-Endian)",
            Self::BigEndianByteSwap => "BADC (Big-Endian Byte Swap)",
            Self::LittleEndianRegisterSwap => "CDAB (Little-Endian Register Swap)",
        }
    }

    /// Check if the two bytes inside each register are swapped
    pub fn swaps_bytes(&self) -> bool {
        matches!(self, Self::LittleEndian | Self::BigEndianByteSwap)
    }

    /// Check if register order inside a multi-register value is reversed
    pub fn swaps_registers(&self) -> bool {
        matches!(self, Self::LittleEndian | Self::LittleEndianRegisterSwap)
    }
}

impl FromStr for ByteOrder {
    type Err = CodecError;

    /// Parse the common spellings:
    /// - "ABCD", "AB-CD", "ABCDEFGH", "BE", "BIG_ENDIAN" → BigEndian
    /// - "DCBA", "DC-BA", "HGFEDCBA", "LE", "LITTLE_ENDIAN" → LittleEndian
    /// - "BADC", "BA-DC", "BADCFEHG", "BIG_ENDIAN_BYTE_SWAP" → BigEndianByteSwap
    /// - "CDAB", "CD-AB", "GHEFCDAB", "LITTLE_ENDIAN_REGISTER_SWAP" → LittleEndianRegisterSwap
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "");
        match normalized.as_str() {
            "ABCD" | "ABCDEFGH" | "BE" | "BIG_ENDIAN" | "BIGENDIAN" => Ok(Self::BigEndian),
            "DCBA" | "HGFEDCBA" | "LE" | "LITTLE_ENDIAN" | "LITTLEENDIAN" => {
                Ok(Self::LittleEndian)
            },
            "BADC" | "BADCFEHG" | "BIG_ENDIAN_BYTE_SWAP" | "BIGENDIANBYTESWAP" => {
                Ok(Self::BigEndianByteSwap)
            },
            "CDAB" | "GHEFCDAB" | "LITTLE_ENDIAN_REGISTER_SWAP" | "LITTLEENDIANREGISTERSWAP" => {
                Ok(Self::LittleEndianRegisterSwap)
            },
            _ => Err(CodecError::UnsupportedByteOrder(s.to_string())),
        }
    }
}

impl TryFrom<String> for ByteOrder {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ByteOrder> for String {
    fn from(order: ByteOrder) -> Self {
        order.code().to_string()
    }
}

impl std::fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
