//! # packcraft
//!
//! Typed views over packed binary data.
//!
//! Describe a layout with compact format strings (`"<I2"`, `"R3"`, `"c16"`)
//! and compose them into arrays, sequences and named structs. A [Registry]
//! interns every atomic field type and computes composite offsets once; a
//! [Reader] places a descriptor at an offset in a byte buffer and reads or
//! writes values through it, down to individual bits.
//!
//! ## Example
//!
//! ```
//! use packcraft::{buffer::Buffer, reader::Reader, registry::Registry, value::Value};
//!
//! let registry = Registry::new();
//! let header = registry
//!     .structure([("version", "B"), ("flags", "R4R4"), ("length", ">H")])
//!     .unwrap();
//!
//! let mut buffer = Buffer::new(4);
//! let reader = Reader::new(header, 0);
//! reader.index("length").unwrap().unwrap().write(&mut buffer, 512u16).unwrap();
//!
//! let value = reader.read(&buffer).unwrap();
//! assert_eq!(value.get("length"), Some(&Value::UInt(512)));
//! assert_eq!(buffer.to_hex(), "00 00 02 00");
//! ```

pub mod bits;
pub mod buffer;
pub mod composite;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod format;
pub mod pack;
pub mod reader;
pub mod registry;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;

pub use crate::{
    buffer::Buffer,
    descriptor::{Descriptor, DescriptorRef, Endian},
    errors::{Error, Result},
    pack::Layout,
    reader::{Key, Reader},
    registry::Registry,
    value::Value,
};
