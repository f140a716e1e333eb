//! Byte permutation tables
//!
//! One fixed table per (width, order) pair. Entry `i` names the canonical
//! (big-endian) byte that lands at wire position `i`:
//!
//! ```text
//! wire[i] = canonical[table[i]]
//! ```
//!
//! Every table is an involution, so the same table maps wire bytes back to
//! canonical bytes and `decode` reuses it unchanged.

use crate::byte_order::ByteOrder;
use crate::format::WordWidth;

/// AB → AB
pub const WORD_AB: [usize; 2] = [0, 1];
/// AB → BA
pub const WORD_BA: [usize; 2] = [1, 0];

/// AB CD → AB CD
pub const DWORD_ABCD: [usize; 4] = [0, 1, 2, 3];
/// AB CD → DC BA
pub const DWORD_DCBA: [usize; 4] = [3, 2, 1, 0];
/// AB CD → BA DC
pub const DWORD_BADC: [usize; 4] = [1, 0, 3, 2];
/// AB CD → CD AB
pub const DWORD_CDAB: [usize; 4] = [2, 3, 0, 1];

/// AB CD EF GH → AB CD EF GH
pub const QWORD_ABCDEFGH: [usize; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
/// AB CD EF GH → HG FE DC BA
pub const QWORD_HGFEDCBA: [usize; 8] = [7, 6, 5, 4, 3, 2, 1, 0];
/// AB CD EF GH → BA DC FE HG
pub const QWORD_BADCFEHG: [usize; 8] = [1, 0, 3, 2, 5, 4, 7, 6];
/// AB CD EF GH → GH EF CD AB
pub const QWORD_GHEFCDAB: [usize; 8] = [6, 7, 4, 5, 2, 3, 0, 1];

/// Permutation table for a value width and byte order
pub fn table(width: WordWidth, order: ByteOrder) -> &'static [usize] {
    match (width, order) {
        // Register order is meaningless for a single register
        (WordWidth::Word, ByteOrder::BigEndian | ByteOrder::LittleEndianRegisterSwap) => &WORD_AB,
        (WordWidth::Word, ByteOrder::LittleEndian | ByteOrder::BigEndianByteSwap) => &WORD_BA,

        (WordWidth::DWord, ByteOrder::BigEndian) => &DWORD_ABCD,
        (WordWidth::DWord, ByteOrder::LittleEndian) => &DWORD_DCBA,
        (WordWidth::DWord, ByteOrder::BigEndianByteSwap) => &DWORD_BADC,
        (WordWidth::DWord, ByteOrder::LittleEndianRegisterSwap) => &DWORD_CDAB,

        (WordWidth::QWord, ByteOrder::BigEndian) => &QWORD_ABCDEFGH,
        (WordWidth::QWord, ByteOrder::LittleEndian) => &QWORD_HGFEDCBA,
        (WordWidth::QWord, ByteOrder::BigEndianByteSwap) => &QWORD_BADCFEHG,
        (WordWidth::QWord, ByteOrder::LittleEndianRegisterSwap) => &QWORD_GHEFCDAB,
    }
}

/// Apply a permutation table: `dst[i] = src[table[i]]`
///
/// `src` and `dst` must both be exactly `table.len()` bytes long.
pub fn apply(table: &[usize], src: &[u8], dst: &mut [u8]) {
    debug_assert_eq!(src.len(), table.len());
    debug_assert_eq!(dst.len(), table.len());
    for (slot, &from) in dst.iter_mut().zip(table) {
        *slot = src[from];
    }
}
