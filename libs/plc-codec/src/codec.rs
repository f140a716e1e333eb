//! Register value codec
//!
//! Converts between native values and holding registers in three steps:
//! 1. serialize each value to its canonical big-endian bytes
//! 2. permute the bytes for the requested byte order (see [`crate::permute`])
//! 3. read the permuted bytes as big-endian 16-bit registers (the wire convention)
//!
//! Decoding runs the same steps backwards with the same (self-inverse) table.

use crate::byte_order::ByteOrder;
use crate::error::{CodecError, Result};
use crate::format::RegisterFormat;
use crate::permute;
use crate::value::Number;

/// Widest supported value in bytes (QWord)
const MAX_VALUE_BYTES: usize = 8;

// ============================================================================
// Public API
// ============================================================================

/// Encode values into holding registers
///
/// All values share one format and order. The result holds
/// `values.len() * format.word_count()` registers.
pub fn encode(values: &[Number], format: RegisterFormat, order: ByteOrder) -> Result<Vec<u16>> {
    let table = permute::table(format.width(), order);
    let width = format.byte_width();
    let mut registers = Vec::with_capacity(values.len() * format.word_count());
    let mut wire = [0u8; MAX_VALUE_BYTES];

    for value in values {
        let canonical = to_canonical(*value, format)?;
        permute::apply(table, &canonical[..width], &mut wire[..width]);
        registers.extend(
            wire[..width]
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]])),
        );
    }

    Ok(registers)
}

/// Decode holding registers into values
///
/// Fails with `InvalidRegisterCount` unless `registers.len()` is a multiple of
/// `format.word_count()`.
pub fn decode(registers: &[u16], format: RegisterFormat, order: ByteOrder) -> Result<Vec<Number>> {
    let word_count = format.word_count();
    if registers.len() % word_count != 0 {
        return Err(CodecError::InvalidRegisterCount {
            count: registers.len(),
            format,
            word_count,
        });
    }

    let table = permute::table(format.width(), order);
    let width = format.byte_width();

    Ok(registers
        .chunks_exact(word_count)
        .map(|chunk| {
            let mut wire = [0u8; MAX_VALUE_BYTES];
            for (slot, reg) in wire.chunks_exact_mut(2).zip(chunk) {
                slot.copy_from_slice(&reg.to_be_bytes());
            }
            let mut canonical = [0u8; MAX_VALUE_BYTES];
            permute::apply(table, &wire[..width], &mut canonical[..width]);
            from_canonical(&canonical, format)
        })
        .collect())
}

/// Encode a single value
pub fn encode_one(
    value: impl Into<Number>,
    format: RegisterFormat,
    order: ByteOrder,
) -> Result<Vec<u16>> {
    encode(&[value.into()], format, order)
}

/// Decode exactly one value; `registers` must hold `format.word_count()` registers
pub fn decode_one(registers: &[u16], format: RegisterFormat, order: ByteOrder) -> Result<Number> {
    if registers.len() != format.word_count() {
        return Err(CodecError::InvalidRegisterCount {
            count: registers.len(),
            format,
            word_count: format.word_count(),
        });
    }
    let mut values = decode(registers, format, order)?;
    values.pop().ok_or(CodecError::InvalidRegisterCount {
        count: 0,
        format,
        word_count: format.word_count(),
    })
}

// ============================================================================
// Canonical (big-endian) serialization
// ============================================================================

/// Serialize a value into the first `format.byte_width()` bytes, big-endian
fn to_canonical(value: Number, format: RegisterFormat) -> Result<[u8; MAX_VALUE_BYTES]> {
    let out_of_range = || CodecError::ValueOutOfRange { value, format };
    let int = || integral(value).ok_or_else(out_of_range);
    let mut out = [0u8; MAX_VALUE_BYTES];

    let fits = match format {
        RegisterFormat::SignedWord => {
            i16::try_from(int()?).map(|v| put(&mut out, &v.to_be_bytes()))
        },
        RegisterFormat::UnsignedWord => {
            u16::try_from(int()?).map(|v| put(&mut out, &v.to_be_bytes()))
        },
        RegisterFormat::SignedDWord => {
            i32::try_from(int()?).map(|v| put(&mut out, &v.to_be_bytes()))
        },
        RegisterFormat::UnsignedDWord => {
            u32::try_from(int()?).map(|v| put(&mut out, &v.to_be_bytes()))
        },
        RegisterFormat::SignedQWord => {
            i64::try_from(int()?).map(|v| put(&mut out, &v.to_be_bytes()))
        },
        RegisterFormat::UnsignedQWord => {
            u64::try_from(int()?).map(|v| put(&mut out, &v.to_be_bytes()))
        },
        RegisterFormat::Float => {
            let wide = value.as_f64();
            let narrow = wide as f32;
            // Finite doubles beyond f32::MAX would silently become infinity
            if wide.is_finite() && narrow.is_infinite() {
                return Err(out_of_range());
            }
            put(&mut out, &narrow.to_be_bytes());
            Ok(())
        },
        RegisterFormat::Double => {
            put(&mut out, &value.as_f64().to_be_bytes());
            Ok(())
        },
    };
    fits.map_err(|_| out_of_range())?;

    Ok(out)
}

fn put(out: &mut [u8; MAX_VALUE_BYTES], bytes: &[u8]) {
    out[..bytes.len()].copy_from_slice(bytes);
}

/// Integer payload of a value; floats never serialize into integer formats
fn integral(value: Number) -> Option<i128> {
    match value {
        Number::Int(v) => Some(i128::from(v)),
        Number::UInt(v) => Some(i128::from(v)),
        Number::Float(_) => None,
    }
}

/// Deserialize the first `format.byte_width()` canonical bytes
fn from_canonical(b: &[u8; MAX_VALUE_BYTES], format: RegisterFormat) -> Number {
    let b2 = [b[0], b[1]];
    let b4 = [b[0], b[1], b[2], b[3]];
    match format {
        RegisterFormat::SignedWord => Number::Int(i16::from_be_bytes(b2).into()),
        RegisterFormat::UnsignedWord => Number::UInt(u16::from_be_bytes(b2).into()),
        RegisterFormat::SignedDWord => Number::Int(i32::from_be_bytes(b4).into()),
        RegisterFormat::UnsignedDWord => Number::UInt(u32::from_be_bytes(b4).into()),
        RegisterFormat::Float => Number::Float(f32::from_be_bytes(b4).into()),
        RegisterFormat::SignedQWord => Number::Int(i64::from_be_bytes(*b)),
        RegisterFormat::UnsignedQWord => Number::UInt(u64::from_be_bytes(*b)),
        RegisterFormat::Double => Number::Float(f64::from_be_bytes(*b)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Number> {
        values.iter().copied().map(Number::Int).collect()
    }

    #[test]
    fn test_signed_word_big_endian() {
        let values = ints(&[-1, -32768, 0, 32767]);
        let regs = encode(&values, RegisterFormat::SignedWord, ByteOrder::BigEndian).unwrap();
        assert_eq!(regs, vec![0xFFFF, 0x8000, 0x0000, 0x7FFF]);

        let back = decode(&regs, RegisterFormat::SignedWord, ByteOrder::BigEndian).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_signed_dword_register_swap() {
        let values = ints(&[-123_456_789]);
        let order = ByteOrder::LittleEndianRegisterSwap;
        let regs = encode(&values, RegisterFormat::SignedDWord, order).unwrap();
        // -123456789 = 0xF8A432EB, low word first
        assert_eq!(regs, vec![0x32EB, 0xF8A4]);

        let back = decode(&regs, RegisterFormat::SignedDWord, order).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn test_float_byte_swap() {
        let order = ByteOrder::BigEndianByteSwap;
        let regs = encode_one(1.5f32, RegisterFormat::Float, order).unwrap();
        // 1.5 = 0x3FC00000
        assert_eq!(regs, vec![0xC03F, 0x0000]);

        let back = decode_one(&regs, RegisterFormat::Float, order).unwrap();
        assert!(back.same_bits(&Number::Float(1.5)));
    }

    #[test]
    fn test_u32_all_orders() {
        let value = [Number::UInt(0x1234_5678)];
        let expected: [(ByteOrder, [u16; 2]); 4] = [
            (ByteOrder::BigEndian, [0x1234, 0x5678]),
            (ByteOrder::LittleEndian, [0x7856, 0x3412]),
            (ByteOrder::BigEndianByteSwap, [0x3412, 0x7856]),
            (ByteOrder::LittleEndianRegisterSwap, [0x5678, 0x1234]),
        ];

        for (order, regs) in expected {
            assert_eq!(
                encode(&value, RegisterFormat::UnsignedDWord, order).unwrap(),
                regs,
                "{order}"
            );
        }
    }

    #[test]
    fn test_u64_all_orders() {
        let value = [Number::UInt(0x0102_0304_0506_0708)];
        let expected: [(ByteOrder, [u16; 4]); 4] = [
            (ByteOrder::BigEndian, [0x0102, 0x0304, 0x0506, 0x0708]),
            (ByteOrder::LittleEndian, [0x0807, 0x0605, 0x0403, 0x0201]),
            (ByteOrder::BigEndianByteSwap, [0x0201, 0x0403, 0x0605, 0x0807]),
            (ByteOrder::LittleEndianRegisterSwap, [0x0708, 0x0506, 0x0304, 0x0102]),
        ];

        for (order, regs) in expected {
            assert_eq!(
                encode(&value, RegisterFormat::UnsignedQWord, order).unwrap(),
                regs,
                "{order}"
            );
        }
    }

    #[test]
    fn test_word_orders() {
        let value = [Number::UInt(0x1234)];
        let expected: [(ByteOrder, u16); 4] = [
            (ByteOrder::BigEndian, 0x1234),
            (ByteOrder::LittleEndianRegisterSwap, 0x1234),
            (ByteOrder::LittleEndian, 0x3412),
            (ByteOrder::BigEndianByteSwap, 0x3412),
        ];
        for (order, reg) in expected {
            assert_eq!(
                encode(&value, RegisterFormat::UnsignedWord, order).unwrap(),
                vec![reg]
            );
        }
    }

    #[test]
    fn test_double_known_pattern() {
        // 25.0 in IEEE 754 double: 0x4039000000000000
        let regs = encode_one(25.0f64, RegisterFormat::Double, ByteOrder::BigEndian).unwrap();
        assert_eq!(regs, vec![0x4039, 0x0000, 0x0000, 0x0000]);

        let regs = encode_one(25.0f64, RegisterFormat::Double, ByteOrder::LittleEndian).unwrap();
        assert_eq!(regs, vec![0x0000, 0x0000, 0x0000, 0x3940]);
    }

    #[test]
    fn test_negative_zero_survives() {
        for format in [RegisterFormat::Float, RegisterFormat::Double] {
            for order in ByteOrder::ALL {
                let regs = encode_one(-0.0f64, format, order).unwrap();
                let back = decode_one(&regs, format, order).unwrap();
                assert!(back.same_bits(&Number::Float(-0.0)), "{format} {order}");
            }
        }
    }

    #[test]
    fn test_register_span() {
        let values = ints(&[1, 2, 3]);
        for format in RegisterFormat::ALL {
            for order in ByteOrder::ALL {
                let regs = encode(&values, format, order).unwrap();
                assert_eq!(regs.len(), values.len() * format.word_count());
            }
        }
    }

    #[test]
    fn test_orders_are_distinct() {
        let value = [Number::UInt(0x0102_0304)];
        let encodings: Vec<Vec<u16>> = ByteOrder::ALL
            .iter()
            .map(|&order| encode(&value, RegisterFormat::UnsignedDWord, order).unwrap())
            .collect();

        for (i, a) in encodings.iter().enumerate() {
            for b in &encodings[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_out_of_range() {
        let cases = [
            (Number::Int(32768), RegisterFormat::SignedWord),
            (Number::Int(-32769), RegisterFormat::SignedWord),
            (Number::Int(-1), RegisterFormat::UnsignedWord),
            (Number::UInt(65536), RegisterFormat::UnsignedWord),
            (Number::Int(i64::from(i32::MAX) + 1), RegisterFormat::SignedDWord),
            (Number::UInt(u64::MAX), RegisterFormat::SignedQWord),
            (Number::Int(-1), RegisterFormat::UnsignedQWord),
            (Number::Float(1.0), RegisterFormat::SignedWord),
            (Number::Float(2.0), RegisterFormat::UnsignedDWord),
            (Number::Float(1e39), RegisterFormat::Float),
        ];

        for (value, format) in cases {
            assert_eq!(
                encode(&[value], format, ByteOrder::BigEndian),
                Err(CodecError::ValueOutOfRange { value, format })
            );
        }
    }

    #[test]
    fn test_float_accepts_integers_and_infinity() {
        let regs = encode(&[Number::Int(2)], RegisterFormat::Float, ByteOrder::BigEndian).unwrap();
        assert_eq!(regs, vec![0x4000, 0x0000]);

        let regs = encode_one(f64::INFINITY, RegisterFormat::Float, ByteOrder::BigEndian).unwrap();
        assert_eq!(regs, vec![0x7F80, 0x0000]);
    }

    #[test]
    fn test_invalid_register_count() {
        let err = decode(&[1, 2, 3], RegisterFormat::Double, ByteOrder::BigEndian).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidRegisterCount {
                count: 3,
                format: RegisterFormat::Double,
                word_count: 4,
            }
        );

        assert!(decode_one(&[1, 2, 3, 4], RegisterFormat::Float, ByteOrder::BigEndian).is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(encode(&[], RegisterFormat::Float, ByteOrder::BigEndian).unwrap().is_empty());
        assert!(decode(&[], RegisterFormat::Double, ByteOrder::LittleEndian).unwrap().is_empty());
    }
}
