use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

use crate::error::{ArpError, ArpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AddressKind {
    Hardware,
    Protocol,
}

/// Address type and length, e.g. `(0x0800, 4)` for IPv4 or `(1, 6)` for Ethernet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct AddressFamily {
    pub ty: u16,
    pub len: u8,
}
impl AddressFamily {
    pub const fn new(ty: u16, len: u8) -> Self {
        Self { ty, len }
    }
}

/// Owned, length-tagged address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct AddressEntry {
    kind: AddressKind,
    family: AddressFamily,
    bytes: Vec<u8>,
}
impl AddressEntry {
    /// Fails if the byte count does not match the family length
    pub fn new(kind: AddressKind, family: AddressFamily, bytes: &[u8]) -> ArpResult<Self> {
        if bytes.is_empty() || bytes.len() != family.len as usize {
            return Err(ArpError::InvalidArgument);
        }
        Ok(Self {
            kind,
            family,
            bytes: bytes.to_vec(),
        })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for AddressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (separator, decimal) = match self.kind {
            AddressKind::Protocol if self.bytes.len() == 4 => ('.', true),
            _ => (':', false),
        };
        for (i, b) in self.bytes.iter().enumerate() {
            if i != 0 {
                write!(f, "{}", separator)?;
            }
            if decimal {
                write!(f, "{}", b)?;
            } else {
                write!(f, "{:02x}", b)?;
            }
        }
        Ok(())
    }
}

/// Lookup pattern for one address slot.
/// Without `bytes`, every slot of the family matches, including empty ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressMatch<'a> {
    pub family: AddressFamily,
    pub bytes: Option<&'a [u8]>,
}
impl<'a> AddressMatch<'a> {
    pub fn any(family: AddressFamily) -> Self {
        Self {
            family,
            bytes: None,
        }
    }

    pub fn exact(family: AddressFamily, bytes: &'a [u8]) -> Self {
        Self {
            family,
            bytes: Some(bytes),
        }
    }

    /// `family` and `value` describe the slot being tested
    pub fn matches(&self, family: AddressFamily, value: Option<&AddressEntry>) -> bool {
        if self.family != family {
            return false;
        }
        match self.bytes {
            None => true,
            Some(bytes) => value.map_or(false, |v| v.as_bytes() == bytes),
        }
    }
}
