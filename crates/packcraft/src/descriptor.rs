//! Layout descriptors: the immutable description of one field or composite.

use std::{fmt, sync::Arc};

use crate::composite::{ArrayDescriptor, SequenceDescriptor, StructDescriptor};

/// Shared handle to a descriptor. Atomic descriptors are interned by a
/// [crate::registry::Registry], so equal shapes share one allocation.
pub type DescriptorRef = Arc<Descriptor>;

/// Byte order of multi-byte integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order of the host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    fn tag(self) -> char {
        match self {
            Endian::Little => 'L',
            Endian::Big => 'B',
        }
    }
}

impl Default for Endian {
    fn default() -> Self {
        Endian::native()
    }
}

/// Discriminant of a [Descriptor], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    UInt,
    Bit,
    Raw,
    Array,
    Sequence,
    Struct,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Int => "Int",
            Kind::UInt => "UInt",
            Kind::Bit => "Bit",
            Kind::Raw => "Raw",
            Kind::Array => "Array",
            Kind::Sequence => "Sequence",
            Kind::Struct => "Struct",
        }
    }

    pub fn is_atomic(self) -> bool {
        matches!(self, Kind::Int | Kind::UInt | Kind::Bit | Kind::Raw)
    }
}

/// Binary layout of a single field or of a composite of fields.
///
/// Sizes are pure functions of the definition. Internally all layout math is
/// done in bits; [Descriptor::size] converts to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Signed integer of 1 to 8 bytes.
    Int { size: usize, endian: Endian },
    /// Unsigned integer of 1 to 8 bytes.
    UInt { size: usize, endian: Endian },
    /// Bit field of 1 to 64 bits. `bit_offset` (0..=7, MSB first) is the
    /// intra-byte position the field was laid out at.
    Bit { width: usize, bit_offset: usize },
    /// Opaque byte string of fixed length.
    Raw { size: usize },
    Array(ArrayDescriptor),
    Sequence(SequenceDescriptor),
    Struct(StructDescriptor),
}

impl Descriptor {
    pub fn kind(&self) -> Kind {
        match self {
            Descriptor::Int { .. } => Kind::Int,
            Descriptor::UInt { .. } => Kind::UInt,
            Descriptor::Bit { .. } => Kind::Bit,
            Descriptor::Raw { .. } => Kind::Raw,
            Descriptor::Array(_) => Kind::Array,
            Descriptor::Sequence(_) => Kind::Sequence,
            Descriptor::Struct(_) => Kind::Struct,
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.kind().is_atomic()
    }

    /// Size in bits. Saturates for raw strings too long to count in bits;
    /// builders reject those.
    pub fn bit_size(&self) -> usize {
        match self {
            Descriptor::Int { size, .. }
            | Descriptor::UInt { size, .. }
            | Descriptor::Raw { size } => size.saturating_mul(8),
            Descriptor::Bit { width, .. } => *width,
            Descriptor::Array(array) => array.bit_size(),
            Descriptor::Sequence(sequence) => sequence.bit_size(),
            Descriptor::Struct(structure) => structure.bit_size(),
        }
    }

    /// Size in bytes. For a bit field this is the covering span starting at
    /// its recorded bit offset.
    pub fn size(&self) -> usize {
        match self {
            Descriptor::Int { size, .. }
            | Descriptor::UInt { size, .. }
            | Descriptor::Raw { size } => *size,
            Descriptor::Bit { width, bit_offset } => width.saturating_add(*bit_offset).div_ceil(8),
            _ => self.bit_size().div_ceil(8),
        }
    }

    /// Recorded intra-byte offset; zero for everything but bit fields.
    pub fn bit_offset(&self) -> usize {
        match self {
            Descriptor::Bit { bit_offset, .. } => *bit_offset,
            _ => 0,
        }
    }

    /// True when every leaf is a bit field, so the descriptor may start at
    /// any bit position.
    pub fn is_bit_packed(&self) -> bool {
        match self {
            Descriptor::Bit { .. } => true,
            Descriptor::Int { .. } | Descriptor::UInt { .. } | Descriptor::Raw { .. } => false,
            Descriptor::Array(array) => array.count() == 0 || array.element().is_bit_packed(),
            Descriptor::Sequence(sequence) => sequence.members().iter().all(|m| m.is_bit_packed()),
            Descriptor::Struct(structure) => structure.members().iter().all(|m| m.is_bit_packed()),
        }
    }

    /// Number of members of a composite, `None` for atomic descriptors.
    pub fn member_count(&self) -> Option<usize> {
        match self {
            Descriptor::Array(array) => Some(array.count()),
            Descriptor::Sequence(sequence) => Some(sequence.members().len()),
            Descriptor::Struct(structure) => Some(structure.members().len()),
            _ => None,
        }
    }

    /// Ordered member table of a composite. An array exposes its single
    /// shared element descriptor.
    pub fn members(&self) -> Option<&[DescriptorRef]> {
        match self {
            Descriptor::Array(array) => Some(std::slice::from_ref(array.element_ref())),
            Descriptor::Sequence(sequence) => Some(sequence.members()),
            Descriptor::Struct(structure) => Some(structure.members()),
            _ => None,
        }
    }

    /// Canonical textual signature, used as the interning key.
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Int { size, endian } => write!(f, "Int{}{}", size, endian.tag()),
            Descriptor::UInt { size, endian } => write!(f, "UInt{}{}", size, endian.tag()),
            Descriptor::Bit { width, bit_offset } => write!(f, "Bit{}_{}", width, bit_offset),
            Descriptor::Raw { size } => write!(f, "Raw{}", size),
            Descriptor::Array(array) => write!(f, "Array[{}]", array.count()),
            Descriptor::Sequence(sequence) => write!(f, "Sequence[{}]", sequence.members().len()),
            Descriptor::Struct(structure) => write!(f, "Struct[{}]", structure.members().len()),
        }
    }
}
