//! Register formats
//!
//! A `RegisterFormat` says how one native value maps onto consecutive holding
//! registers: how many registers it spans and how its bits are interpreted.

use crate::error::CodecError;
use crate::value::Number;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of 16-bit registers one value occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordWidth {
    /// 1 register, 2 bytes
    Word,
    /// 2 registers, 4 bytes
    DWord,
    /// 4 registers, 8 bytes
    QWord,
}

impl WordWidth {
    pub const fn word_count(self) -> usize {
        match self {
            Self::Word => 1,
            Self::DWord => 2,
            Self::QWord => 4,
        }
    }

    pub const fn byte_width(self) -> usize {
        self.word_count() * 2
    }
}

/// Numeric interpretation of a value's bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Two's complement integer
    SignedInt,
    /// Raw unsigned integer
    UnsignedInt,
    /// IEEE-754 float
    Float,
}

/// The eight supported value layouts
///
/// | Variant         | Registers | Native |
/// |-----------------|-----------|--------|
/// | `SignedWord`    | 1         | i16    |
/// | `UnsignedWord`  | 1         | u16    |
/// | `SignedDWord`   | 2         | i32    |
/// | `UnsignedDWord` | 2         | u32    |
/// | `Float`         | 2         | f32    |
/// | `SignedQWord`   | 4         | i64    |
/// | `UnsignedQWord` | 4         | u64    |
/// | `Double`        | 4         | f64    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RegisterFormat {
    SignedWord,
    UnsignedWord,
    SignedDWord,
    UnsignedDWord,
    Float,
    SignedQWord,
    UnsignedQWord,
    Double,
}

impl RegisterFormat {
    /// All supported formats
    pub const ALL: [RegisterFormat; 8] = [
        Self::SignedWord,
        Self::UnsignedWord,
        Self::SignedDWord,
        Self::UnsignedDWord,
        Self::Float,
        Self::SignedQWord,
        Self::UnsignedQWord,
        Self::Double,
    ];

    /// Single-register format for the given signedness
    pub const fn word(signed: bool) -> Self {
        if signed {
            Self::SignedWord
        } else {
            Self::UnsignedWord
        }
    }

    pub const fn width(self) -> WordWidth {
        match self {
            Self::SignedWord | Self::UnsignedWord => WordWidth::Word,
            Self::SignedDWord | Self::UnsignedDWord | Self::Float => WordWidth::DWord,
            Self::SignedQWord | Self::UnsignedQWord | Self::Double => WordWidth::QWord,
        }
    }

    /// Registers consumed by one value
    pub const fn word_count(self) -> usize {
        self.width().word_count()
    }

    /// Bytes consumed by one value
    pub const fn byte_width(self) -> usize {
        self.width().byte_width()
    }

    pub const fn kind(self) -> ValueKind {
        match self {
            Self::SignedWord | Self::SignedDWord | Self::SignedQWord => ValueKind::SignedInt,
            Self::UnsignedWord | Self::UnsignedDWord | Self::UnsignedQWord => {
                ValueKind::UnsignedInt
            },
            Self::Float | Self::Double => ValueKind::Float,
        }
    }

    /// Whether the format can represent negative values
    pub const fn is_signed(self) -> bool {
        !matches!(self.kind(), ValueKind::UnsignedInt)
    }

    /// Short type name ("i16", "f32", ...)
    pub fn code(&self) -> &'static str {
        match self {
            Self::SignedWord => "i16",
            Self::UnsignedWord => "u16",
            Self::SignedDWord => "i32",
            Self::UnsignedDWord => "u32",
            Self::Float => "f32",
            Self::SignedQWord => "i64",
            Self::UnsignedQWord => "u64",
            Self::Double => "f64",
        }
    }

    /// Get descriptive name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignedWord => "signed word",
            Self::UnsignedWord => "unsigned word",
            Self::SignedDWord => "signed dword",
            Self::UnsignedDWord => "unsigned dword",
            Self::Float => "float",
            Self::SignedQWord => "signed 64 bit",
            Self::UnsignedQWord => "unsigned 64 bit",
            Self::Double => "double",
        }
    }

    /// Parse user text into a value of this format's kind
    ///
    /// Range is not checked here; `encode` rejects values that do not fit.
    pub fn parse_value(&self, text: &str) -> Result<Number, CodecError> {
        let text = text.trim();
        let invalid = || CodecError::InvalidValue {
            text: text.to_string(),
            format: *self,
        };
        match self.kind() {
            ValueKind::SignedInt => text.parse::<i64>().map(Number::Int).map_err(|_| invalid()),
            ValueKind::UnsignedInt => text.parse::<u64>().map(Number::UInt).map_err(|_| invalid()),
            ValueKind::Float => text.parse::<f64>().map(Number::Float).map_err(|_| invalid()),
        }
    }
}

impl FromStr for RegisterFormat {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "i16" | "int16" | "signed word" | "word" => Ok(Self::SignedWord),
            "u16" | "uint16" | "unsigned word" => Ok(Self::UnsignedWord),
            "i32" | "int32" | "signed dword" | "dword" => Ok(Self::SignedDWord),
            "u32" | "uint32" | "unsigned dword" => Ok(Self::UnsignedDWord),
            "f32" | "float" | "float32" | "real" => Ok(Self::Float),
            "i64" | "int64" | "signed qword" | "signed 64 bit" | "qword" => Ok(Self::SignedQWord),
            "u64" | "uint64" | "unsigned qword" | "unsigned 64 bit" => Ok(Self::UnsignedQWord),
            "f64" | "double" | "float64" | "lreal" => Ok(Self::Double),
            _ => Err(CodecError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for RegisterFormat {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RegisterFormat> for String {
    fn from(format: RegisterFormat) -> Self {
        format.code().to_string()
    }
}

impl std::fmt::Display for RegisterFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
