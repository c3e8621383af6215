//! Format-string configuration: default byte order and the widths of the
//! platform-sized integer tokens.

use std::{
    ffi::{c_int, c_long, c_short},
    mem::size_of,
};

use crate::descriptor::Endian;

/// Settings a [crate::registry::Registry] applies to every format string it
/// parses. Defaults follow the host C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FormatConfig {
    /// Byte order each format string starts with.
    pub endian: Endian,
    /// Width of `h` / `H`.
    pub short_size: usize,
    /// Default width of `i` / `I` without a suffix.
    pub int_size: usize,
    /// Width of `l` / `L`.
    pub long_size: usize,
    /// Width of `j` / `J`.
    pub integer_size: usize,
    /// Width of `T`.
    pub size_size: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            endian: Endian::native(),
            short_size: size_of::<c_short>(),
            int_size: size_of::<c_int>(),
            long_size: size_of::<c_long>(),
            integer_size: size_of::<i64>(),
            size_size: size_of::<usize>(),
        }
    }
}

impl FormatConfig {
    /// Host widths, little-endian by default.
    pub fn little() -> Self {
        Self {
            endian: Endian::Little,
            ..Default::default()
        }
    }

    /// Host widths, big-endian by default.
    pub fn big() -> Self {
        Self {
            endian: Endian::Big,
            ..Default::default()
        }
    }

    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }
}
