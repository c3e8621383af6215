//! Building descriptors from format strings and nested layouts.
//!
//! A [Layout] describes a descriptor tree the way a caller writes it down:
//! format strings at the leaves, arrays, sequences and named structs around
//! them. [Registry::pack] resolves it into a [DescriptorRef], interning every
//! atomic field and laying out composites once.
//!
//! The running bit position is shared across all members of one build, so a
//! bit field declared in its own struct member continues where the previous
//! member stopped.

use std::{collections::HashSet, sync::Arc};

use tracing::debug;

use crate::{
    composite::{ArrayDescriptor, SequenceDescriptor, StructDescriptor},
    descriptor::{Descriptor, DescriptorRef},
    errors::CompileError,
    format::BitCursor,
    registry::Registry,
};

/// Description of a descriptor tree prior to resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// Format string. More than one field becomes a sequence.
    Format(String),
    /// An already built descriptor.
    Descriptor(DescriptorRef),
    /// `count` repetitions of `element`.
    Array { count: usize, element: Box<Layout> },
    /// Unnamed members in order.
    Sequence(Vec<Layout>),
    /// Named members in order.
    Struct(Vec<(String, Layout)>),
}

impl Layout {
    pub fn array(count: usize, element: impl Into<Layout>) -> Self {
        Layout::Array {
            count,
            element: Box::new(element.into()),
        }
    }

    pub fn sequence<I, L>(members: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Layout>,
    {
        Layout::Sequence(members.into_iter().map(Into::into).collect())
    }

    pub fn structure<I, N, L>(members: I) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: Into<Layout>,
    {
        Layout::Struct(
            members
                .into_iter()
                .map(|(name, layout)| (name.into(), layout.into()))
                .collect(),
        )
    }
}

impl From<&str> for Layout {
    fn from(format: &str) -> Self {
        Layout::Format(format.to_string())
    }
}

impl From<String> for Layout {
    fn from(format: String) -> Self {
        Layout::Format(format)
    }
}

impl From<DescriptorRef> for Layout {
    fn from(descriptor: DescriptorRef) -> Self {
        Layout::Descriptor(descriptor)
    }
}

impl From<&DescriptorRef> for Layout {
    fn from(descriptor: &DescriptorRef) -> Self {
        Layout::Descriptor(Arc::clone(descriptor))
    }
}

impl Registry {
    /// Builds the descriptor for a format string. A single field is returned
    /// as is; several fields become a sequence.
    pub fn format(&self, format: &str) -> Result<DescriptorRef, CompileError> {
        self.resolve_format(format, BitCursor::default())
    }

    /// Builds an array of `count` elements.
    pub fn array(&self, element: impl Into<Layout>, count: usize) -> Result<DescriptorRef, CompileError> {
        self.pack(&Layout::array(count, element))
    }

    /// Builds a sequence of unnamed members.
    pub fn sequence<I, L>(&self, members: I) -> Result<DescriptorRef, CompileError>
    where
        I: IntoIterator<Item = L>,
        L: Into<Layout>,
    {
        self.pack(&Layout::sequence(members))
    }

    /// Builds a struct of named members. Fails with
    /// [CompileError::DuplicateMember] if a name repeats.
    pub fn structure<I, N, L>(&self, members: I) -> Result<DescriptorRef, CompileError>
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: Into<Layout>,
    {
        self.pack(&Layout::structure(members))
    }

    /// Resolves a whole layout tree.
    pub fn pack(&self, layout: &Layout) -> Result<DescriptorRef, CompileError> {
        self.resolve(layout, BitCursor::default())
    }

    fn resolve(&self, layout: &Layout, cursor: BitCursor) -> Result<DescriptorRef, CompileError> {
        match layout {
            Layout::Format(format) => self.resolve_format(format, cursor),
            Layout::Descriptor(descriptor) => self.place(descriptor, cursor),
            Layout::Array { count, element } => {
                let element = self.resolve(element, cursor)?;
                let array = ArrayDescriptor::new(element, *count)?;
                Ok(built(Descriptor::Array(array)))
            }
            Layout::Sequence(members) => {
                let members = self.resolve_members(members.iter(), cursor)?;
                Ok(built(Descriptor::Sequence(SequenceDescriptor::new(members)?)))
            }
            Layout::Struct(members) => {
                let mut seen = HashSet::with_capacity(members.len());
                if let Some((name, _)) = members.iter().find(|(name, _)| !seen.insert(name.as_str())) {
                    return Err(CompileError::DuplicateMember(name.clone()));
                }

                let descriptors = self.resolve_members(members.iter().map(|(_, layout)| layout), cursor)?;
                let named = members.iter().map(|(name, _)| name.clone()).zip(descriptors).collect();
                Ok(built(Descriptor::Struct(StructDescriptor::new(named)?)))
            }
        }
    }

    fn resolve_members<'a>(
        &self,
        members: impl Iterator<Item = &'a Layout>,
        mut cursor: BitCursor,
    ) -> Result<Vec<DescriptorRef>, CompileError> {
        members
            .map(|member| {
                let descriptor = self.resolve(member, cursor)?;
                cursor = cursor.advance(descriptor.bit_size())?;
                Ok(descriptor)
            })
            .collect()
    }

    fn resolve_format(&self, format: &str, cursor: BitCursor) -> Result<DescriptorRef, CompileError> {
        let (atoms, _) = self.parse(format, cursor)?;
        if let [atom] = atoms.as_slice() {
            return Ok(Arc::clone(atom));
        }

        Ok(built(Descriptor::Sequence(SequenceDescriptor::new(atoms)?)))
    }

    /// Re-seats a bit field built elsewhere at the bit offset of `cursor`.
    fn place(&self, descriptor: &DescriptorRef, cursor: BitCursor) -> Result<DescriptorRef, CompileError> {
        match descriptor.as_ref() {
            Descriptor::Bit { width, bit_offset } if *bit_offset != cursor.bit_offset() => {
                self.bit(*width, cursor.bit_offset())
            }
            _ => Ok(Arc::clone(descriptor)),
        }
    }
}

fn built(descriptor: Descriptor) -> DescriptorRef {
    debug!(
        signature = %descriptor,
        bits = descriptor.bit_size(),
        "built composite descriptor"
    );
    Arc::new(descriptor)
}
