//! Error types for descriptor construction, reading and writing.

use thiserror::Error;

/// Errors produced while parsing format strings or building descriptors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A character in the format string is not part of the grammar.
    #[error("unknown format token {token:?} at position {position}")]
    UnknownToken { token: char, position: usize },

    /// A numeric suffix is outside the range accepted by its token.
    #[error("invalid size {size} for format token {token:?}")]
    InvalidSize { token: char, size: usize },

    /// The format string produced no descriptor.
    #[error("format string describes no fields")]
    EmptyFormat,

    /// Two struct members share a name.
    #[error("duplicate struct member {0:?}")]
    DuplicateMember(String),

    /// A byte-sized field would start off a byte boundary.
    #[error("{signature} must start on a byte boundary, found bit offset {bit_offset}")]
    Misaligned { signature: String, bit_offset: usize },

    /// Only atomic descriptors can be interned.
    #[error("composite descriptor {0} cannot be interned")]
    NotAtomic(String),

    /// A layout's size in bits does not fit in `usize`.
    #[error("layout too large: {0} overflows the addressable bit range")]
    TooLarge(String),

    /// A declarative struct entry did not hold exactly one name/layout pair.
    #[error("struct entry {0} must contain exactly one name/layout pair")]
    InvalidStructEntry(usize),
}

/// Errors produced when reading bits and bytes from a target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Members were requested from an atomic descriptor.
    #[error("cannot index atomic type {0}")]
    NotIndexable(String),

    /// A byte range does not fit in the buffer.
    #[error("range {offset}+{len} exceeds buffer of {available} bytes")]
    OutOfRange {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// The target is shorter than the field at its position.
    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Byte width outside 1..=8 or bit width outside 1..=64.
    #[error("invalid field width {0}")]
    InvalidWidth(usize),

    /// Intra-byte offset greater than 7.
    #[error("invalid bit offset {0}")]
    InvalidBitOffset(usize),
}

/// Errors produced when writing a value into a target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Writing composite descriptors is not supported.
    #[error("writing composite type {0} is not implemented")]
    NotImplemented(String),

    /// The value does not fit the field.
    #[error("value {found} does not fit {expected}")]
    TypeMismatch { expected: String, found: String },

    /// The target is shorter than the field at its position.
    #[error("buffer too short: need {needed} bytes, have {available}")]
    BufferTooShort { needed: usize, available: usize },

    /// Byte width outside 1..=8 or bit width outside 1..=64.
    #[error("invalid field width {0}")]
    InvalidWidth(usize),

    /// Intra-byte offset greater than 7.
    #[error("invalid bit offset {0}")]
    InvalidBitOffset(usize),
}

/// Codec failures surfaced while preparing a write.
impl From<ReadError> for WriteError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::InvalidWidth(width) => WriteError::InvalidWidth(width),
            ReadError::InvalidBitOffset(offset) => WriteError::InvalidBitOffset(offset),
            ReadError::BufferTooShort { needed, available } => WriteError::BufferTooShort { needed, available },
            ReadError::OutOfRange {
                offset,
                len,
                available,
            } => WriteError::BufferTooShort {
                needed: offset.saturating_add(len),
                available,
            },
            ReadError::NotIndexable(signature) => WriteError::NotImplemented(signature),
        }
    }
}

/// Any error produced by this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

/// Result alias using [Error].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = CompileError::UnknownToken {
            token: 'x',
            position: 3,
        };
        assert_eq!(e.to_string(), "unknown format token 'x' at position 3");

        let e = ReadError::BufferTooShort {
            needed: 4,
            available: 2,
        };
        assert!(e.to_string().contains('4'));
        assert!(e.to_string().contains('2'));
    }

    #[test]
    fn test_error_from() {
        let err: Error = WriteError::NotImplemented("Struct[2]".to_string()).into();
        assert!(matches!(err, Error::Write(WriteError::NotImplemented(_))));
        assert_eq!(err.to_string(), "writing composite type Struct[2] is not implemented");
    }

    #[test]
    fn test_out_of_range_becomes_too_short() {
        let err: WriteError = ReadError::OutOfRange {
            offset: 6,
            len: 4,
            available: 8,
        }
        .into();
        assert_eq!(
            err,
            WriteError::BufferTooShort {
                needed: 10,
                available: 8
            }
        );
    }
}
