//! Low-level byte and bit codec over byte slices.
//!
//! Bits are addressed in MSB-first order: bit offset 0 is the high bit of the
//! first byte. Bit fields may straddle any number of byte boundaries; a
//! 64-bit field at offset 7 covers nine bytes, so spans are assembled in a
//! `u128`.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::{
    descriptor::Endian,
    errors::{ReadError, WriteError},
};

/// Widest integer in bytes.
pub const MAX_BYTES: usize = 8;
/// Widest bit field in bits.
pub const MAX_BITS: usize = 64;
/// Longest raw byte string whose size in bits still fits in `usize`.
pub const MAX_RAW_BYTES: usize = usize::MAX / 8;

/// Mask covering the low `bits` bits.
pub(crate) fn mask(bits: usize) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

/// Number of bytes touched by `width` bits starting `bit_offset` bits into the
/// first byte.
pub fn span(width: usize, bit_offset: usize) -> usize {
    (width + bit_offset).div_ceil(8)
}

fn check_bytes(size: usize, available: usize) -> Result<(), ReadError> {
    if !(1..=MAX_BYTES).contains(&size) {
        return Err(ReadError::InvalidWidth(size));
    }
    if available < size {
        return Err(ReadError::BufferTooShort {
            needed: size,
            available,
        });
    }

    Ok(())
}

fn check_bits(width: usize, bit_offset: usize, available: usize) -> Result<usize, ReadError> {
    if !(1..=MAX_BITS).contains(&width) {
        return Err(ReadError::InvalidWidth(width));
    }
    if bit_offset > 7 {
        return Err(ReadError::InvalidBitOffset(bit_offset));
    }

    let needed = span(width, bit_offset);
    if available < needed {
        return Err(ReadError::BufferTooShort { needed, available });
    }

    Ok(needed)
}

/// Reads a `size`-byte unsigned integer from the start of `buf`. High bytes
/// of the result beyond `size` are zero.
pub fn read_bytes(size: usize, endian: Endian, buf: &[u8]) -> Result<u64, ReadError> {
    check_bytes(size, buf.len())?;

    Ok(match endian {
        Endian::Little => LittleEndian::read_uint(buf, size),
        Endian::Big => BigEndian::read_uint(buf, size),
    })
}

/// Writes the low `size * 8` bits of `value` to the start of `buf`.
pub fn write_bytes(value: u64, size: usize, endian: Endian, buf: &mut [u8]) -> Result<(), WriteError> {
    check_bytes(size, buf.len())?;

    let value = value & mask(size * 8);
    match endian {
        Endian::Little => LittleEndian::write_uint(buf, value, size),
        Endian::Big => BigEndian::write_uint(buf, value, size),
    }

    Ok(())
}

/// Reads `width` bits starting `bit_offset` bits into `buf`.
pub fn read_bits(width: usize, bit_offset: usize, buf: &[u8]) -> Result<u64, ReadError> {
    let span = check_bits(width, bit_offset, buf.len())?;

    let raw = BigEndian::read_uint128(buf, span);
    let shift = span * 8 - bit_offset - width;

    Ok((raw >> shift) as u64 & mask(width))
}

/// Writes the low `width` bits of `value` starting `bit_offset` bits into
/// `buf`. Bits outside the field are preserved.
pub fn write_bits(value: u64, width: usize, bit_offset: usize, buf: &mut [u8]) -> Result<(), WriteError> {
    let span = check_bits(width, bit_offset, buf.len())?;

    let shift = span * 8 - bit_offset - width;
    let field = u128::from(mask(width)) << shift;
    let raw = BigEndian::read_uint128(buf, span);
    let merged = (raw & !field) | (u128::from(value & mask(width)) << shift);
    BigEndian::write_uint128(buf, merged, span);

    Ok(())
}

/// Sign-extends the low `bits` of `value` to a full `i64`.
pub fn sign_extend(value: u64, bits: usize) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Reverses the order of the low `size` bytes of `value`.
pub fn swap_bytes_n(value: u64, size: usize) -> u64 {
    value.swap_bytes() >> (64 - size * 8)
}
