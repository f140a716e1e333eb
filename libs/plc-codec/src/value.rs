//! Native values exchanged with the codec

use serde::{Deserialize, Serialize};

/// A native numeric value
///
/// Decoding yields `Int` for signed formats, `UInt` for unsigned formats and
/// `Float` for `Float`/`Double` (float32 is widened exactly).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    /// Bit-exact equality: `-0.0` differs from `0.0`, identical NaNs match
    pub fn same_bits(&self, other: &Number) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (Number::UInt(a), Number::UInt(b)) => a == b,
            (Number::Float(a), Number::Float(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }

    /// Lossy view as f64, for display and scaling
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(v) => v as f64,
            Number::UInt(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::UInt(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $wide:ty: $($ty:ty),+) => {
        $(
            impl From<$ty> for Number {
                fn from(value: $ty) -> Self {
                    Number::$variant(<$wide>::from(value))
                }
            }
        )+
    };
}

impl_from!(Int, i64: i8, i16, i32, i64);
impl_from!(UInt, u64: u8, u16, u32, u64);
impl_from!(Float, f64: f32, f64);
