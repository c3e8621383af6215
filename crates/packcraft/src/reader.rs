//! Positioned views over a byte target.

use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    bits::{self, MAX_BYTES, mask},
    descriptor::{Descriptor, DescriptorRef},
    errors::{ReadError, WriteError},
    value::Value,
};

/// Member selector for [Reader::index]. Integer keys are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'a> {
    Index(usize),
    Name(&'a str),
}

impl From<usize> for Key<'_> {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Key::Name(name)
    }
}

impl<'a> From<&'a String> for Key<'a> {
    fn from(name: &'a String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
        }
    }
}

/// A descriptor at a fixed position in some byte target.
///
/// The position is a byte offset plus a bit offset into that byte, so members
/// of bit-packed composites resolve to their exact bit and any byte offset is
/// representable. Readers are cheap to clone and hold no reference to the
/// target; the same reader can be applied to any buffer with the same layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reader {
    descriptor: DescriptorRef,
    offset: usize,
    bit_offset: usize,
}

impl Reader {
    /// Places `descriptor` at byte `offset`. A bit field starts at its
    /// recorded bit offset within that byte.
    pub fn new(descriptor: DescriptorRef, offset: usize) -> Self {
        let bit_offset = descriptor.bit_offset();
        Self {
            descriptor,
            offset,
            bit_offset,
        }
    }

    fn at(descriptor: &DescriptorRef, (offset, bit_offset): (usize, usize)) -> Self {
        Self {
            descriptor: Arc::clone(descriptor),
            offset,
            bit_offset,
        }
    }

    pub fn descriptor(&self) -> &DescriptorRef {
        &self.descriptor
    }

    /// Byte offset of the first byte touched.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bit position within the first byte, MSB first.
    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    /// Number of bytes covered starting at [Self::offset].
    pub fn size(&self) -> usize {
        self.bit_offset.saturating_add(self.descriptor.bit_size()).div_ceil(8)
    }

    /// Number of members. Fails on atomic descriptors.
    pub fn len(&self) -> Result<usize, ReadError> {
        self.descriptor
            .member_count()
            .ok_or_else(|| ReadError::NotIndexable(self.descriptor.signature()))
    }

    pub fn is_empty(&self) -> Result<bool, ReadError> {
        Ok(self.len()? == 0)
    }

    /// Child reader for `key`, or `None` if the key selects no member.
    ///
    /// Arrays and sequences take 1-based integer keys; structs take member
    /// names or 1-based positions. Indexing an atomic descriptor fails.
    pub fn index<'k>(&self, key: impl Into<Key<'k>>) -> Result<Option<Reader>, ReadError> {
        let position = match (self.descriptor.as_ref(), key.into()) {
            (descriptor, _) if descriptor.is_atomic() => {
                return Err(ReadError::NotIndexable(descriptor.signature()));
            }
            (Descriptor::Struct(structure), Key::Name(name)) => structure.position(name),
            (_, Key::Name(_)) => None,
            (_, Key::Index(index)) => index.checked_sub(1),
        };

        Ok(position.and_then(|position| self.child(position)))
    }

    fn child(&self, position: usize) -> Option<Reader> {
        let (descriptor, offset) = match self.descriptor.as_ref() {
            Descriptor::Array(array) => array.member_at(position)?,
            Descriptor::Sequence(sequence) => sequence.member_at(position)?,
            Descriptor::Struct(structure) => structure.member_at(position)?,
            _ => return None,
        };

        Some(Reader::at(descriptor, locate(self.offset, self.bit_offset, offset)))
    }

    /// Members in definition order with their keys. Struct members are keyed
    /// by name, everything else by 1-based index.
    pub fn iter(&self) -> Result<Members<'_>, ReadError> {
        Ok(Members {
            reader: self,
            position: 0,
            len: self.len()?,
        })
    }

    fn check_bounds(&self, available: usize) -> Result<(), ReadError> {
        let needed = self.offset.checked_add(self.size()).unwrap_or(usize::MAX);
        if needed > available {
            return Err(ReadError::BufferTooShort { needed, available });
        }

        Ok(())
    }

    /// Materializes the value at this position.
    pub fn read(&self, target: &[u8]) -> Result<Value, ReadError> {
        self.check_bounds(target.len())?;
        materialize(&self.descriptor, self.offset, self.bit_offset, target)
    }

    /// Writes `value` into an atomic field. The target is untouched on error.
    pub fn write(&self, target: &mut [u8], value: impl Into<Value>) -> Result<(), WriteError> {
        let value = value.into();
        let descriptor = self.descriptor.as_ref();
        if !descriptor.is_atomic() {
            return Err(WriteError::NotImplemented(descriptor.signature()));
        }

        let encoded = encode(descriptor, &value)?;
        self.check_bounds(target.len())?;
        trace!(reader = %self, value = ?value, "writing field");

        let available = target.len();
        let tail = target
            .get_mut(self.offset..)
            .ok_or(WriteError::BufferTooShort {
                needed: self.offset,
                available,
            })?;

        match (descriptor, encoded) {
            (Descriptor::Int { size, endian } | Descriptor::UInt { size, endian }, Encoded::Word(word)) => {
                bits::write_bytes(word, *size, *endian, tail)
            }
            (Descriptor::Bit { width, .. }, Encoded::Word(word)) => {
                bits::write_bits(word, *width, self.bit_offset, tail)
            }
            (Descriptor::Raw { size }, Encoded::Bytes(bytes)) => {
                let field = &mut tail[..*size];
                let (head, rest) = field.split_at_mut(bytes.len());
                head.copy_from_slice(bytes);
                rest.fill(0);
                Ok(())
            }
            _ => Err(mismatch(descriptor, &value)),
        }
    }
}

impl fmt::Display for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reader[{}]({})", self.offset(), self.descriptor)
    }
}

/// Iterator over the members of a composite [Reader].
#[derive(Debug, Clone)]
pub struct Members<'a> {
    reader: &'a Reader,
    position: usize,
    len: usize,
}

impl<'a> Iterator for Members<'a> {
    type Item = (Key<'a>, Reader);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.len {
            return None;
        }

        let reader: &'a Reader = self.reader;
        let position = self.position;
        self.position += 1;

        let key = match reader.descriptor.as_ref() {
            Descriptor::Struct(structure) => Key::Name(structure.name_at(position)?),
            _ => Key::Index(position + 1),
        };

        Some((key, reader.child(position)?))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.position;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Members<'_> {}

/// Byte and intra-byte bit position of a member `member_bits` past
/// (`offset`, `bit_offset`). Saturates; callers bound-check before touching
/// the target.
fn locate(offset: usize, bit_offset: usize, member_bits: usize) -> (usize, usize) {
    let bits = bit_offset.saturating_add(member_bits);
    (offset.saturating_add(bits / 8), bits % 8)
}

fn materialize(descriptor: &Descriptor, offset: usize, bit_offset: usize, target: &[u8]) -> Result<Value, ReadError> {
    let member = |descriptor: &Descriptor, member_bits: usize| {
        let (offset, bit_offset) = locate(offset, bit_offset, member_bits);
        materialize(descriptor, offset, bit_offset, target)
    };
    let tail = target.get(offset..).ok_or(ReadError::BufferTooShort {
        needed: offset,
        available: target.len(),
    })?;

    Ok(match descriptor {
        Descriptor::Int { size, endian } => {
            let raw = bits::read_bytes(*size, *endian, tail)?;
            Value::Int(bits::sign_extend(raw, size * 8))
        }
        Descriptor::UInt { size, endian } => Value::UInt(bits::read_bytes(*size, *endian, tail)?),
        Descriptor::Bit { width, .. } => {
            let raw = bits::read_bits(*width, bit_offset, tail)?;
            if *width == 1 {
                Value::Bool(raw == 1)
            } else {
                Value::UInt(raw)
            }
        }
        Descriptor::Raw { size } => {
            let bytes = tail.get(..*size).ok_or(ReadError::BufferTooShort {
                needed: offset.saturating_add(*size),
                available: target.len(),
            })?;
            Value::Bytes(bytes.to_vec())
        }
        Descriptor::Array(array) => Value::List(
            (0..array.count())
                .map(|i| member(array.element(), i * array.stride_bits()))
                .collect::<Result<_, _>>()?,
        ),
        Descriptor::Sequence(sequence) => Value::List(
            sequence
                .members()
                .iter()
                .zip(sequence.offsets())
                .map(|(descriptor, bits)| member(descriptor.as_ref(), *bits))
                .collect::<Result<_, _>>()?,
        ),
        Descriptor::Struct(structure) => Value::Struct(
            structure
                .names()
                .iter()
                .zip(structure.members().iter().zip(structure.offsets()))
                .map(|(name, (descriptor, bits))| Ok((name.clone(), member(descriptor.as_ref(), *bits)?)))
                .collect::<Result<_, ReadError>>()?,
        ),
    })
}

/// Value checked against an atomic field, ready to be stored.
enum Encoded<'v> {
    Word(u64),
    Bytes(&'v [u8]),
}

fn mismatch(descriptor: &Descriptor, value: &Value) -> WriteError {
    WriteError::TypeMismatch {
        expected: descriptor.signature(),
        found: format!("{value:?}"),
    }
}

fn encode<'v>(descriptor: &Descriptor, value: &'v Value) -> Result<Encoded<'v>, WriteError> {
    let encoded = match descriptor {
        Descriptor::Int { size, .. } | Descriptor::UInt { size, .. } if !(1..=MAX_BYTES).contains(size) => {
            return Err(WriteError::InvalidWidth(*size));
        }
        Descriptor::Int { size, .. } => value
            .as_i64()
            .filter(|v| {
                let bits = size * 8;
                bits >= 64 || (-(1i64 << (bits - 1))..(1i64 << (bits - 1))).contains(v)
            })
            .map(|v| Encoded::Word(v as u64)),
        Descriptor::UInt { size, .. } => value
            .as_u64()
            .filter(|v| *v <= mask(size * 8))
            .map(Encoded::Word),
        Descriptor::Bit { width: 1, .. } => match value {
            Value::Bool(b) => Some(Encoded::Word(u64::from(*b))),
            _ => value.as_u64().filter(|v| *v <= 1).map(Encoded::Word),
        },
        Descriptor::Bit { width, .. } => value
            .as_u64()
            .filter(|v| *v <= mask(*width))
            .map(Encoded::Word),
        Descriptor::Raw { size } => value
            .as_bytes()
            .filter(|bytes| bytes.len() <= *size)
            .map(Encoded::Bytes),
        _ => return Err(WriteError::NotImplemented(descriptor.signature())),
    };

    encoded.ok_or_else(|| mismatch(descriptor, value))
}
