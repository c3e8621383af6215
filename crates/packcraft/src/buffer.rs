//! Fixed-length, zero-initialized byte buffer.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crate::{
    bits,
    descriptor::{DescriptorRef, Endian},
    errors::{ReadError, WriteError},
    reader::Reader,
    value::Value,
};

/// Owned byte buffer of a fixed length.
///
/// Dereferences to `[u8]`, so it can be passed to [Reader::read] and
/// [Reader::write] directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Buffer {
    data: Box<[u8]>,
}

impl Buffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0; len].into_boxed_slice(),
        }
    }

    /// Buffer of `len` bytes starting with `contents`, zero-filled after.
    pub fn with_contents(len: usize, contents: &[u8]) -> Result<Self, WriteError> {
        if contents.len() > len {
            return Err(WriteError::BufferTooShort {
                needed: contents.len(),
                available: len,
            });
        }

        let mut buffer = Self::new(len);
        buffer.data[..contents.len()].copy_from_slice(contents);
        Ok(buffer)
    }

    /// Buffer holding exactly `bytes`.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            data: bytes.into().into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn range(&self, offset: usize, len: usize) -> Result<std::ops::Range<usize>, ReadError> {
        let out_of_range = ReadError::OutOfRange {
            offset,
            len,
            available: self.len(),
        };
        match offset.checked_add(len) {
            Some(end) if end <= self.len() => Ok(offset..end),
            _ => Err(out_of_range),
        }
    }

    /// `len` bytes at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], ReadError> {
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    pub fn slice_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], ReadError> {
        let range = self.range(offset, len)?;
        Ok(&mut self.data[range])
    }

    /// Everything from `offset` to the end.
    fn tail(&self, offset: usize) -> Result<&[u8], ReadError> {
        self.slice(offset, self.len().saturating_sub(offset))
    }

    fn tail_mut(&mut self, offset: usize) -> Result<&mut [u8], ReadError> {
        let len = self.len().saturating_sub(offset);
        self.slice_mut(offset, len)
    }

    pub fn read_raw(&self, offset: usize, len: usize) -> Result<Vec<u8>, ReadError> {
        Ok(self.slice(offset, len)?.to_vec())
    }

    pub fn write_raw(&mut self, offset: usize, bytes: &[u8]) -> Result<(), WriteError> {
        self.slice_mut(offset, bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Unsigned `size`-byte integer at `offset`.
    pub fn read_int(&self, offset: usize, size: usize, endian: Endian) -> Result<u64, ReadError> {
        bits::read_bytes(size, endian, self.tail(offset)?)
    }

    /// Stores the low `size` bytes of `value` at `offset`.
    pub fn write_int(&mut self, offset: usize, value: u64, size: usize, endian: Endian) -> Result<(), WriteError> {
        bits::write_bytes(value, size, endian, self.tail_mut(offset)?)
    }

    /// `width` bits starting `bit_offset` bits into byte `offset`.
    pub fn read_bits(&self, offset: usize, bit_offset: usize, width: usize) -> Result<u64, ReadError> {
        bits::read_bits(width, bit_offset, self.tail(offset)?)
    }

    pub fn write_bits(&mut self, offset: usize, bit_offset: usize, width: usize, value: u64) -> Result<(), WriteError> {
        bits::write_bits(value, width, bit_offset, self.tail_mut(offset)?)
    }

    /// Materializes `descriptor` placed at `offset`.
    pub fn unpack(&self, descriptor: &DescriptorRef, offset: usize) -> Result<Value, ReadError> {
        Reader::new(Arc::clone(descriptor), offset).read(self)
    }

    /// Upper-case hex bytes separated by spaces, e.g. `"0A FF 00"`.
    pub fn to_hex(&self) -> String {
        self.data
            .iter()
            .map(|byte| format!("{byte:02X}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer{{{}}}", self.len())
    }
}

impl Deref for Buffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for Buffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl AsMut<[u8]> for Buffer {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for Buffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::FormatConfig, registry::Registry};

    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let buffer = Buffer::new(4);
        assert_eq!(buffer.as_bytes(), &[0, 0, 0, 0]);
        assert_eq!(buffer.to_string(), "Buffer{4}");
        assert!(Buffer::new(0).is_empty());
    }

    #[test]
    fn test_with_contents() {
        let buffer = Buffer::with_contents(4, &[1, 2]).unwrap();
        assert_eq!(buffer.as_bytes(), &[1, 2, 0, 0]);

        assert_eq!(
            Buffer::with_contents(1, &[1, 2]).unwrap_err(),
            WriteError::BufferTooShort {
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn test_slice_out_of_range() {
        let buffer = Buffer::new(4);
        assert_eq!(buffer.slice(1, 3).unwrap().len(), 3);
        assert_eq!(
            buffer.slice(2, 3).unwrap_err(),
            ReadError::OutOfRange {
                offset: 2,
                len: 3,
                available: 4
            }
        );
        assert!(buffer.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_to_hex() {
        let buffer = Buffer::from_bytes([0x0A, 0xFF, 0x00]);
        assert_eq!(buffer.to_hex(), "0A FF 00");
        assert_eq!(Buffer::new(0).to_hex(), "");
    }

    #[test]
    fn test_raw_access() {
        let mut buffer = Buffer::new(6);
        buffer.write_raw(2, b"abc").unwrap();
        assert_eq!(buffer.read_raw(2, 3).unwrap(), b"abc");
        assert_eq!(
            buffer.write_raw(4, b"abc").unwrap_err(),
            WriteError::BufferTooShort {
                needed: 7,
                available: 6
            }
        );
    }

    #[test]
    fn test_int_access() {
        let mut buffer = Buffer::new(4);
        buffer.write_int(1, 0x1234, 2, Endian::Little).unwrap();
        assert_eq!(buffer.as_bytes(), &[0, 0x34, 0x12, 0]);
        assert_eq!(buffer.read_int(1, 2, Endian::Big).unwrap(), 0x3412);
        assert!(buffer.read_int(3, 2, Endian::Big).is_err());
        assert!(buffer.read_int(5, 1, Endian::Big).is_err());
    }

    #[test]
    fn test_bit_access() {
        let mut buffer = Buffer::new(2);
        buffer.write_bits(0, 6, 4, 0b1011).unwrap();
        assert_eq!(buffer.as_bytes(), &[0b00000010, 0b11000000]);
        assert_eq!(buffer.read_bits(0, 6, 4).unwrap(), 0b1011);
        assert_eq!(buffer.read_bits(1, 0, 1).unwrap(), 1);
    }

    #[test]
    fn test_unpack() {
        let registry = Registry::with_config(FormatConfig::big());
        let descriptor = registry.structure([("id", "H"), ("flags", "R4R4")]).unwrap();
        let buffer = Buffer::from_bytes([0xEE, 0x01, 0x02, 0x5C]);

        let value = buffer.unpack(&descriptor, 1).unwrap();
        assert_eq!(value.get("id"), Some(&Value::UInt(0x0102)));
        assert_eq!(
            value.get("flags"),
            Some(&Value::List(vec![Value::UInt(5), Value::UInt(0xC)]))
        );
        assert!(buffer.unpack(&descriptor, 2).is_err());
    }

    #[test]
    fn test_unpack_far_offset() {
        let registry = Registry::with_config(FormatConfig::big());
        let byte = registry.format("B").unwrap();
        let buffer = Buffer::new(4);

        assert_eq!(
            buffer.unpack(&byte, usize::MAX / 8 + 1).unwrap_err(),
            ReadError::BufferTooShort {
                needed: usize::MAX / 8 + 2,
                available: 4
            }
        );
        assert!(buffer.unpack(&byte, usize::MAX).is_err());
    }

    #[test]
    fn test_reader_targets_buffer() {
        let registry = Registry::with_config(FormatConfig::big());
        let reader = Reader::new(registry.format(">I2").unwrap(), 0);
        let mut buffer = Buffer::new(2);

        reader.write(&mut buffer, 0xBEEFu16).unwrap();
        assert_eq!(buffer.to_hex(), "BE EF");
        assert_eq!(reader.read(&buffer).unwrap(), Value::UInt(0xBEEF));
    }
}
