//! Strong type definitions for the registrar.
//!
//! All identifiers and byte strings are newtypes to prevent misuse at compile time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum name length accepted by default (bytes).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum value length accepted by default (bytes).
pub const MAX_VALUE_LENGTH: usize = 520;

/// Amounts are counted in the smallest ledger unit.
pub type Amount = u64;

/// One coin in the smallest ledger unit.
pub const COIN: Amount = 100_000_000;

/// A 32-byte transaction identifier, computed as Blake3 over the canonical
/// encoding of the transaction with its witnesses stripped.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Txid(pub [u8; 32]);

impl Txid {
    /// Create a new Txid from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero txid. Never the id of a real transaction.
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txid({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Txid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for Txid {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Txid {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Txid {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A registration slot identifier. Opaque bytes; length bounds are a
/// registrar configuration concern, see [`crate::validation::validate_name`].
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Name(Bytes);

impl Name {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The name as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self)
    }
}

/// Printable UTF-8 names are shown as-is, anything else as `0x` hex.
impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) if s.chars().all(|c| !c.is_control()) => f.write_str(s),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self(Bytes::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Name {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl From<&[u8]> for Name {
    fn from(v: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(v))
    }
}

impl AsRef<[u8]> for Name {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The payload associated with a name.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value(Bytes);

impl Value {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The empty value, used when a caller registers without a payload.
    pub fn empty() -> Self {
        Self(Bytes::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => write!(f, "Value({:?})", s),
            None => write!(f, "Value(0x{})", hex::encode(&self.0)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self(Bytes::from(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self(Bytes::from(v))
    }
}

impl AsRef<[u8]> for Value {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_txid_hex_roundtrip() {
        let id = Txid::from_bytes([0x42; 32]);
        let recovered = Txid::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_txid_rejects_short_hex() {
        assert!(Txid::from_hex("abcd").is_err());
    }

    #[test]
    fn test_txid_debug_is_abbreviated() {
        let id = Txid::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", id), "Txid(cdcdcdcdcdcdcdcd)");
        assert_eq!(format!("{}", id).len(), 64);
    }

    #[test]
    fn test_name_display() {
        assert_eq!(Name::from("d/example").to_string(), "d/example");
        assert_eq!(Name::from(vec![0x00, 0xff]).to_string(), "0x00ff");
    }

    #[test]
    fn test_value_default_is_empty() {
        assert!(Value::default().is_empty());
        assert_eq!(Value::empty(), Value::from(""));
    }
}
