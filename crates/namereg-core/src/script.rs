//! Output destinations.
//!
//! A script is opaque to the registrar except for two shapes it can
//! recognize: a single-key script, whose key may be resolvable in the wallet
//! for salt derivation, and an m-of-n multi-party script, which never is.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Ed25519PublicKey;

const TAG_PAY_TO_KEY: u8 = 0x01;
const TAG_MULTISIG: u8 = 0x02;

/// Destination bytes attached to an output.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Script(Bytes);

impl Script {
    /// Wrap raw script bytes.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// A script paying to a single key.
    pub fn pay_to_key(key: &Ed25519PublicKey) -> Self {
        let mut buf = BytesMut::with_capacity(33);
        buf.put_u8(TAG_PAY_TO_KEY);
        buf.put_slice(key.as_bytes());
        Self(buf.freeze())
    }

    /// An m-of-n script over `keys`.
    pub fn multisig(required: u8, keys: &[Ed25519PublicKey]) -> Self {
        let mut buf = BytesMut::with_capacity(3 + 32 * keys.len());
        buf.put_u8(TAG_MULTISIG);
        buf.put_u8(required);
        buf.put_u8(keys.len() as u8);
        for key in keys {
            buf.put_slice(key.as_bytes());
        }
        Self(buf.freeze())
    }

    /// The single key this script pays to, if it is a single-key script.
    pub fn as_key(&self) -> Option<Ed25519PublicKey> {
        if self.0.len() != 33 || self.0[0] != TAG_PAY_TO_KEY {
            return None;
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&self.0[1..]);
        Some(Ed25519PublicKey(key))
    }

    pub fn is_multisig(&self) -> bool {
        self.0.first() == Some(&TAG_MULTISIG)
    }

    /// Whether the bytes form one of the recognized script shapes.
    pub fn is_valid(&self) -> bool {
        match self.0.first() {
            Some(&TAG_PAY_TO_KEY) => self.0.len() == 33,
            Some(&TAG_MULTISIG) => {
                if self.0.len() < 3 {
                    return false;
                }
                let (m, n) = (self.0[1] as usize, self.0[2] as usize);
                m >= 1 && m <= n && self.0.len() == 3 + 32 * n
            }
            _ => false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_key() {
            Some(key) => write!(f, "Script(key {:?})", key),
            None => write!(f, "Script({})", self.to_hex()),
        }
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
