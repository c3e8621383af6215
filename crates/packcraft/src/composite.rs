//! Composite descriptors with member offsets computed once, at construction.
//!
//! Offsets are kept in bits relative to the start of the composite. Byte-sized
//! leaves (integers and raw strings) must land on byte boundaries; composites
//! made only of bit fields may start anywhere.

use std::collections::HashMap;

use crate::{
    descriptor::{Descriptor, DescriptorRef},
    errors::CompileError,
};

/// Checks that `member` may start at `bit_pos`.
pub(crate) fn check_placement(member: &Descriptor, bit_pos: usize) -> Result<(), CompileError> {
    let bit_offset = bit_pos % 8;
    if bit_offset != 0 && !member.is_bit_packed() {
        return Err(CompileError::Misaligned {
            signature: member.signature(),
            bit_offset,
        });
    }

    Ok(())
}

/// `count` repetitions of one shared element descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDescriptor {
    element: DescriptorRef,
    count: usize,
    bit_size: usize,
}

impl ArrayDescriptor {
    /// Fails if repeating `element` would push a byte-sized leaf off a byte
    /// boundary, or if the whole array does not fit in `usize` bits.
    pub fn new(element: DescriptorRef, count: usize) -> Result<Self, CompileError> {
        if count > 1 {
            check_placement(&element, element.bit_size())?;
        }

        let bit_size = count
            .checked_mul(element.bit_size())
            .ok_or_else(|| CompileError::TooLarge(format!("Array[{count}] of {element}")))?;

        Ok(Self {
            element,
            count,
            bit_size,
        })
    }

    pub fn element(&self) -> &Descriptor {
        &self.element
    }

    pub fn element_ref(&self) -> &DescriptorRef {
        &self.element
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Distance in bits between consecutive elements.
    pub fn stride_bits(&self) -> usize {
        self.element.bit_size()
    }

    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Element descriptor and bit offset of the zero-based `position`.
    pub fn member_at(&self, position: usize) -> Option<(&DescriptorRef, usize)> {
        (position < self.count).then(|| (&self.element, position * self.stride_bits()))
    }
}

/// Ordered, unnamed, heterogeneous members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceDescriptor {
    members: Vec<DescriptorRef>,
    offsets: Vec<usize>,
    bit_size: usize,
}

impl SequenceDescriptor {
    pub fn new(members: Vec<DescriptorRef>) -> Result<Self, CompileError> {
        let mut offsets = Vec::with_capacity(members.len());
        let mut cursor = 0;

        for member in &members {
            check_placement(member, cursor)?;
            offsets.push(cursor);
            cursor = cursor
                .checked_add(member.bit_size())
                .ok_or_else(|| CompileError::TooLarge(format!("Sequence[{}]", members.len())))?;
        }

        Ok(Self {
            members,
            offsets,
            bit_size: cursor,
        })
    }

    pub fn members(&self) -> &[DescriptorRef] {
        &self.members
    }

    /// Bit offsets of the members, parallel to [Self::members].
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Byte offset of the zero-based `position`.
    pub fn byte_offset(&self, position: usize) -> Option<usize> {
        self.offsets.get(position).map(|bits| bits / 8)
    }

    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// Member descriptor and bit offset of the zero-based `position`.
    pub fn member_at(&self, position: usize) -> Option<(&DescriptorRef, usize)> {
        Some((self.members.get(position)?, self.offsets[position]))
    }
}

/// A sequence whose members carry unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    layout: SequenceDescriptor,
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl StructDescriptor {
    /// Fails with [CompileError::DuplicateMember] before any layout work if a
    /// name repeats.
    pub fn new(members: Vec<(String, DescriptorRef)>) -> Result<Self, CompileError> {
        let mut index = HashMap::with_capacity(members.len());
        let mut names = Vec::with_capacity(members.len());
        let mut descriptors = Vec::with_capacity(members.len());

        for (position, (name, descriptor)) in members.into_iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(CompileError::DuplicateMember(name));
            }
            names.push(name);
            descriptors.push(descriptor);
        }

        Ok(Self {
            layout: SequenceDescriptor::new(descriptors)?,
            names,
            index,
        })
    }

    pub fn members(&self) -> &[DescriptorRef] {
        self.layout.members()
    }

    /// Member names in definition order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn offsets(&self) -> &[usize] {
        self.layout.offsets()
    }

    pub fn byte_offset(&self, position: usize) -> Option<usize> {
        self.layout.byte_offset(position)
    }

    /// Zero-based position of the member called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn bit_size(&self) -> usize {
        self.layout.bit_size()
    }

    pub fn member_at(&self, position: usize) -> Option<(&DescriptorRef, usize)> {
        self.layout.member_at(position)
    }

    pub fn name_at(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(String::as_str)
    }
}
