//! GUID rendering in the Microsoft wire convention.
//!
//! The first three groups are little-endian integers (`u32`, `u16`, `u16`);
//! the remaining eight bytes are printed in stored order.

use serde::{Serialize, Serializer};
use std::fmt;

/// Raw length of a GUID structure.
pub const GUID_LEN: usize = 16;

/// A 16-byte GUID as stored on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid([u8; GUID_LEN]);

impl Guid {
    /// Wrap raw wire bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; GUID_LEN]) -> Self {
        Self(bytes)
    }

    /// The raw wire bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; GUID_LEN] {
        &self.0
    }
}

/// Render 16 wire bytes as `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` (lowercase).
#[must_use]
pub fn format_guid(bytes: &[u8; GUID_LEN]) -> String {
    let data1 = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let data2 = u16::from_le_bytes([bytes[4], bytes[5]]);
    let data3 = u16::from_le_bytes([bytes[6], bytes[7]]);
    format!(
        "{data1:08x}-{data2:04x}-{data3:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_guid(&self.0))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

impl Serialize for Guid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
