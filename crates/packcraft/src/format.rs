//! Compact format-string grammar.
//!
//! | token | field |
//! |---|---|
//! | `b` / `B` | signed / unsigned 1-byte integer |
//! | `h` / `H` | signed / unsigned short |
//! | `l` / `L` | signed / unsigned long |
//! | `j` / `J` | signed / unsigned script integer |
//! | `T` | unsigned size type |
//! | `i<N>` / `I<N>` | signed / unsigned integer of N bytes (default: int) |
//! | `c<N>` | raw byte string of N bytes (default: 1) |
//! | `r` | single bit |
//! | `R<N>` | bit field of N bits (default: 1) |
//! | `<` / `>` | little / big endian for the following tokens |
//!
//! The running bit position ([BitCursor]) and the current byte order are
//! passed into every step and handed back with its result.

use crate::{
    bits::{MAX_BITS, MAX_BYTES, MAX_RAW_BYTES},
    config::FormatConfig,
    descriptor::{Descriptor, Endian},
    errors::CompileError,
};

/// Running bit position while laying out consecutive fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitCursor(usize);

impl BitCursor {
    pub const fn new(bits: usize) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> usize {
        self.0
    }

    /// Position inside the current byte, 0..=7.
    pub fn bit_offset(self) -> usize {
        self.0 % 8
    }

    pub fn is_aligned(self) -> bool {
        self.bit_offset() == 0
    }

    /// Cursor `bits` further on. Fails if the position no longer fits in
    /// `usize`.
    pub fn advance(self, bits: usize) -> Result<Self, CompileError> {
        self.0
            .checked_add(bits)
            .map(Self)
            .ok_or_else(|| CompileError::TooLarge(format!("bit position {} + {}", self.0, bits)))
    }
}

/// State threaded from one token to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseState {
    pub endian: Endian,
    pub cursor: BitCursor,
}

/// One parsed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub atom: Descriptor,
    /// Byte position in the format string just after the token.
    pub position: usize,
    pub state: ParseState,
}

/// Result of parsing a whole format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub atoms: Vec<Descriptor>,
    pub cursor: BitCursor,
}

/// Reads an optional decimal suffix starting at `position`.
fn suffix(format: &[u8], position: usize, token: char) -> Result<(Option<usize>, usize), CompileError> {
    let mut end = position;
    let mut size: usize = 0;

    while let Some(digit) = format.get(end).filter(|b| b.is_ascii_digit()) {
        size = size
            .checked_mul(10)
            .and_then(|s| s.checked_add(usize::from(digit - b'0')))
            .ok_or(CompileError::InvalidSize {
                token,
                size: usize::MAX,
            })?;
        end += 1;
    }

    Ok(((end > position).then_some(size), end))
}

fn bounded(token: char, size: usize, max: usize) -> Result<usize, CompileError> {
    if (1..=max).contains(&size) {
        Ok(size)
    } else {
        Err(CompileError::InvalidSize { token, size })
    }
}

/// Parses the next field token at or after `position`. Endianness switches
/// are folded into the returned state. Returns `None` at the end of the string.
pub fn next_atom(
    config: &FormatConfig,
    format: &str,
    mut position: usize,
    mut state: ParseState,
) -> Result<Option<Step>, CompileError> {
    let bytes = format.as_bytes();

    loop {
        let Some(&byte) = bytes.get(position) else {
            return Ok(None);
        };
        let token = char::from(byte);
        position += 1;

        let endian = state.endian;
        let int = |size: usize| -> Result<Descriptor, CompileError> {
            Ok(Descriptor::Int {
                size: bounded(token, size, MAX_BYTES)?,
                endian,
            })
        };
        let uint = |size: usize| -> Result<Descriptor, CompileError> {
            Ok(Descriptor::UInt {
                size: bounded(token, size, MAX_BYTES)?,
                endian,
            })
        };

        let atom = match byte {
            b'<' => {
                state.endian = Endian::Little;
                continue;
            }
            b'>' => {
                state.endian = Endian::Big;
                continue;
            }
            b'b' => int(1)?,
            b'B' => uint(1)?,
            b'h' => int(config.short_size)?,
            b'H' => uint(config.short_size)?,
            b'l' => int(config.long_size)?,
            b'L' => uint(config.long_size)?,
            b'j' => int(config.integer_size)?,
            b'J' => uint(config.integer_size)?,
            b'T' => uint(config.size_size)?,
            b'i' | b'I' => {
                let (size, end) = suffix(bytes, position, token)?;
                position = end;
                let size = size.unwrap_or(config.int_size);
                if byte == b'i' { int(size)? } else { uint(size)? }
            }
            b'c' => {
                let (size, end) = suffix(bytes, position, token)?;
                position = end;
                Descriptor::Raw {
                    size: bounded(token, size.unwrap_or(1), MAX_RAW_BYTES)?,
                }
            }
            b'r' => Descriptor::Bit {
                width: 1,
                bit_offset: state.cursor.bit_offset(),
            },
            b'R' => {
                let (width, end) = suffix(bytes, position, token)?;
                position = end;
                Descriptor::Bit {
                    width: bounded(token, width.unwrap_or(1), MAX_BITS)?,
                    bit_offset: state.cursor.bit_offset(),
                }
            }
            _ => {
                let token = format[position - 1..].chars().next().unwrap_or(token);
                return Err(CompileError::UnknownToken {
                    token,
                    position: position - 1,
                });
            }
        };

        if !atom.is_bit_packed() && !state.cursor.is_aligned() {
            return Err(CompileError::Misaligned {
                signature: atom.signature(),
                bit_offset: state.cursor.bit_offset(),
            });
        }

        state.cursor = state.cursor.advance(atom.bit_size())?;
        return Ok(Some(Step {
            atom,
            position,
            state,
        }));
    }
}

/// Parses every token of `format`, starting at `cursor` and the configured
/// byte order.
pub fn parse(config: &FormatConfig, format: &str, cursor: BitCursor) -> Result<Parsed, CompileError> {
    let mut state = ParseState {
        endian: config.endian,
        cursor,
    };
    let mut position = 0;
    let mut atoms = Vec::new();

    while let Some(step) = next_atom(config, format, position, state)? {
        atoms.push(step.atom);
        position = step.position;
        state = step.state;
    }

    if atoms.is_empty() {
        return Err(CompileError::EmptyFormat);
    }

    Ok(Parsed {
        atoms,
        cursor: state.cursor,
    })
}
