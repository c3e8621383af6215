//! Interning table for atomic descriptors.

use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tracing::trace;

use crate::{
    bits::{MAX_BITS, MAX_BYTES, MAX_RAW_BYTES},
    config::FormatConfig,
    descriptor::{Descriptor, DescriptorRef, Endian},
    errors::CompileError,
    format::{self, BitCursor},
};

/// Owns the format configuration and the table of interned atomic
/// descriptors. Every parse and build call goes through a registry; two
/// registries never share descriptors.
///
/// The table is behind a read/write lock, so a registry can be shared between
/// threads by reference.
#[derive(Debug, Default)]
pub struct Registry {
    config: FormatConfig,
    atoms: RwLock<HashMap<String, DescriptorRef>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatConfig) -> Self {
        Self {
            config,
            atoms: RwLock::default(),
        }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.config
    }

    /// Returns the descriptor registered under `signature`, calling `factory`
    /// to create and register it on first use. `factory` must produce a
    /// descriptor whose signature is `signature`.
    pub fn get_or_create<F>(&self, signature: &str, factory: F) -> DescriptorRef
    where
        F: FnOnce() -> Descriptor,
    {
        if let Some(found) = self.atoms.read().get(signature) {
            return Arc::clone(found);
        }

        let mut atoms = self.atoms.write();
        let entry = atoms.entry(signature.to_string()).or_insert_with(|| {
            trace!(signature, "interning descriptor");
            Arc::new(factory())
        });

        Arc::clone(entry)
    }

    /// Interns an atomic descriptor. Composites are rejected.
    pub fn intern(&self, descriptor: Descriptor) -> Result<DescriptorRef, CompileError> {
        if !descriptor.is_atomic() {
            return Err(CompileError::NotAtomic(descriptor.signature()));
        }

        let signature = descriptor.signature();
        Ok(self.get_or_create(&signature, || descriptor))
    }

    pub fn int(&self, size: usize, endian: Endian) -> Result<DescriptorRef, CompileError> {
        if !(1..=MAX_BYTES).contains(&size) {
            return Err(CompileError::InvalidSize { token: 'i', size });
        }
        self.intern(Descriptor::Int { size, endian })
    }

    pub fn uint(&self, size: usize, endian: Endian) -> Result<DescriptorRef, CompileError> {
        if !(1..=MAX_BYTES).contains(&size) {
            return Err(CompileError::InvalidSize { token: 'I', size });
        }
        self.intern(Descriptor::UInt { size, endian })
    }

    /// Bit field of `width` bits laid out at `bit_offset % 8` within a byte.
    pub fn bit(&self, width: usize, bit_offset: usize) -> Result<DescriptorRef, CompileError> {
        if !(1..=MAX_BITS).contains(&width) {
            return Err(CompileError::InvalidSize {
                token: 'R',
                size: width,
            });
        }
        self.intern(Descriptor::Bit {
            width,
            bit_offset: bit_offset % 8,
        })
    }

    pub fn raw(&self, size: usize) -> Result<DescriptorRef, CompileError> {
        if !(1..=MAX_RAW_BYTES).contains(&size) {
            return Err(CompileError::InvalidSize { token: 'c', size });
        }
        self.intern(Descriptor::Raw { size })
    }

    /// Parses `format` starting at `cursor` and interns every field it
    /// describes. Returns the fields in order and the cursor after the last.
    pub fn parse(&self, format: &str, cursor: BitCursor) -> Result<(Vec<DescriptorRef>, BitCursor), CompileError> {
        let parsed = format::parse(&self.config, format, cursor)?;
        let atoms = parsed
            .atoms
            .into_iter()
            .map(|atom| self.intern(atom))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((atoms, parsed.cursor))
    }

    /// Number of interned descriptors.
    pub fn len(&self) -> usize {
        self.atoms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.read().is_empty()
    }

    pub fn contains(&self, signature: &str) -> bool {
        self.atoms.read().contains_key(signature)
    }
}

#[cfg(test)]
mod tests {
    use crate::{composite::SequenceDescriptor, descriptor::Endian};

    use super::*;

    #[test]
    fn test_same_signature_same_instance() {
        let registry = Registry::new();
        let a = registry.uint(4, Endian::Little).unwrap();
        let b = registry.uint(4, Endian::Little).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("UInt4L"));
    }

    #[test]
    fn test_different_signatures_distinct() {
        let registry = Registry::new();
        let little = registry.uint(4, Endian::Little).unwrap();
        let big = registry.uint(4, Endian::Big).unwrap();
        let signed = registry.int(4, Endian::Little).unwrap();
        assert!(!Arc::ptr_eq(&little, &big));
        assert!(!Arc::ptr_eq(&little, &signed));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_parse_shares_atoms() {
        let registry = Registry::with_config(FormatConfig::big());
        let (atoms, cursor) = registry.parse("BBB", BitCursor::default()).unwrap();
        assert_eq!(atoms.len(), 3);
        assert!(Arc::ptr_eq(&atoms[0], &atoms[2]));
        assert_eq!(cursor.bits(), 24);
        assert_eq!(registry.len(), 1);

        let single = registry.uint(1, Endian::Big).unwrap();
        assert!(Arc::ptr_eq(&atoms[1], &single));
    }

    #[test]
    fn test_registries_are_isolated() {
        let first = Registry::new();
        let second = Registry::new();
        let a = first.raw(3).unwrap();
        let b = second.raw(3).unwrap();
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_intern_rejects_composites() {
        let registry = Registry::new();
        let member = registry.bit(1, 0).unwrap();
        let sequence = Descriptor::Sequence(SequenceDescriptor::new(vec![member]).unwrap());
        assert_eq!(
            registry.intern(sequence).unwrap_err(),
            CompileError::NotAtomic("Sequence[1]".to_string())
        );
    }

    #[test]
    fn test_constructor_bounds() {
        let registry = Registry::new();
        assert!(registry.int(9, Endian::Big).is_err());
        assert!(registry.uint(0, Endian::Big).is_err());
        assert!(registry.bit(65, 0).is_err());
        assert!(registry.raw(0).is_err());
        assert!(registry.raw(usize::MAX).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.bit(3, 13).unwrap().signature(), "Bit3_5");
    }

    #[test]
    fn test_concurrent_interning() {
        let registry = Registry::new();
        let handles: Vec<DescriptorRef> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.uint(2, Endian::Big).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert!(handles.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(registry.len(), 1);
    }
}
