//! PLC Register Codec
//!
//! Bit-exact conversion between native numeric values and 16-bit Modbus
//! holding registers.
//!
//! # Architecture
//!
//! This library provides:
//! - **Formats**: `RegisterFormat`, the eight supported value layouts (1, 2 or 4 registers)
//! - **Byte orders**: `ByteOrder`, the four vendor conventions (ABCD, DCBA, BADC, CDAB)
//! - **Permutations**: fixed byte permutation tables per (width, order)
//! - **Codec**: `encode` / `decode` between `Number` slices and register slices
//!
//! The codec is pure and stateless. It performs no I/O and can be called from
//! any number of threads without synchronization.
//!
//! # Example
//!
//! ```
//! use plc_codec::{decode, encode, ByteOrder, Number, RegisterFormat};
//!
//! let values = [Number::from(-123_456_789i32)];
//! let regs = encode(&values, RegisterFormat::SignedDWord, ByteOrder::LittleEndianRegisterSwap)?;
//! assert_eq!(regs.len(), 2);
//!
//! let back = decode(&regs, RegisterFormat::SignedDWord, ByteOrder::LittleEndianRegisterSwap)?;
//! assert_eq!(back, values);
//! # Ok::<(), plc_codec::CodecError>(())
//! ```

pub mod byte_order;
pub mod codec;
pub mod error;
pub mod format;
pub mod permute;
pub mod value;

// Re-export core types
pub use byte_order::ByteOrder;
pub use codec::{decode, decode_one, encode, encode_one};
pub use error::{CodecError, Result};
pub use format::{RegisterFormat, ValueKind, WordWidth};
pub use value::Number;
