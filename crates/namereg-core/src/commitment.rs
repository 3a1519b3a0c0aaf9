//! Salts and commitments for the two-phase registration.
//!
//! A registration first publishes `Commitment = RIPEMD160(SHA256(salt || name))`
//! and only later reveals `name` and `salt`. The salt is derived from the
//! wallet key that receives the commit output, so it never has to be stored:
//!
//! ```text
//! salt = HKDF-SHA256(ikm = key seed, salt = name, info = SALT_CONTEXT)[..20]
//! ```

use hkdf::Hkdf;
use rand::RngCore;
use ripemd::Ripemd160;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::crypto::Keypair;
use crate::error::ValidationError;
use crate::types::Name;

/// Length of derived and randomly generated salts.
pub const SALT_LENGTH: usize = 20;

/// HKDF info string. Changing it breaks recovery of existing registrations.
pub const SALT_CONTEXT: &[u8] = b"Namecoin Registration Salt";

/// The secret blinding factor of a commitment.
///
/// At most [`SALT_LENGTH`] bytes. Shorter salts exist in historical data and
/// are accepted when supplied explicitly.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Wrap caller-supplied salt bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        if bytes.len() > SALT_LENGTH {
            return Err(ValidationError::SaltTooLong { len: bytes.len() });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Parse a caller-supplied hex salt.
    pub fn from_hex(s: &str) -> Result<Self, crate::error::CoreError> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
            .map_err(|e| crate::error::CoreError::DecodingError(e.to_string()))
    }

    /// A fresh random salt, for destinations without a resolvable signing key.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = vec![0u8; SALT_LENGTH];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
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

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self.to_hex())
    }
}

/// Derive the salt for `name` from the key that owns the commit output.
pub fn derive_salt(key: &Keypair, name: &Name) -> Salt {
    let ikm = key.seed();
    let hk = Hkdf::<Sha256>::new(Some(name.as_bytes()), &ikm);
    let mut okm = [0u8; 32];
    hk.expand(SALT_CONTEXT, &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    Salt(okm[..SALT_LENGTH].to_vec())
}

/// `RIPEMD160(SHA256(salt || name))`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 20]);

impl Commitment {
    /// Compute the commitment for a salt and name.
    pub fn compute(salt: &Salt, name: &Name) -> Self {
        let mut sha = Sha256::new();
        sha.update(salt.as_bytes());
        sha.update(name.as_bytes());
        let inner = sha.finalize();

        let outer = Ripemd160::digest(inner);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&outer);
        Self(bytes)
    }

    /// Check that `salt` and `name` open this commitment.
    pub fn verify(&self, salt: &Salt, name: &Name) -> bool {
        Self::compute(salt, name) == *self
    }

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.to_hex())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key() -> Keypair {
        Keypair::from_seed(&[0x42; 32])
    }

    #[test]
    fn test_derive_salt_known_answer() {
        let salt = derive_salt(&key(), &Name::from("d/example"));
        assert_eq!(salt.to_hex(), "fcff90918277e42476112bf216edfd6eb2c4c190");
    }

    #[test]
    fn test_derived_salt_is_twenty_bytes() {
        let salt = derive_salt(&key(), &Name::from("x"));
        assert_eq!(salt.len(), SALT_LENGTH);
    }

    #[test]
    fn test_commitment_known_answer() {
        let salt = Salt::from_bytes(&[0u8; 20]).unwrap();
        let commitment = Commitment::compute(&salt, &Name::from("bob"));
        assert_eq!(commitment.to_hex(), "c0500dd8ca3ca1f86ba227f6aeb0d4d02a18a52f");
    }

    #[test]
    fn test_salt_length_bound() {
        assert!(Salt::from_bytes(&[1u8; 20]).is_ok());
        assert!(Salt::from_bytes(&[1u8; 7]).is_ok());
        assert_eq!(
            Salt::from_bytes(&[1u8; 21]),
            Err(ValidationError::SaltTooLong { len: 21 })
        );
    }

    #[test]
    fn test_salt_from_hex() {
        let salt = Salt::from_hex("00ff").unwrap();
        assert_eq!(salt.as_bytes(), &[0x00, 0xff]);
        assert!(Salt::from_hex("zz").is_err());
    }

    #[test]
    fn test_random_salt_length() {
        let salt = Salt::random(&mut rand::thread_rng());
        assert_eq!(salt.len(), SALT_LENGTH);
    }

    proptest! {
        #[test]
        fn test_derive_salt_deterministic(seed in any::<[u8; 32]>(), name in prop::collection::vec(any::<u8>(), 1..64)) {
            let kp = Keypair::from_seed(&seed);
            let name = Name::from(name);
            prop_assert_eq!(derive_salt(&kp, &name), derive_salt(&kp, &name));
        }

        #[test]
        fn test_salts_differ_across_names(
            seed in any::<[u8; 32]>(),
            a in prop::collection::vec(any::<u8>(), 1..32),
            b in prop::collection::vec(any::<u8>(), 1..32),
        ) {
            prop_assume!(a != b);
            let kp = Keypair::from_seed(&seed);
            prop_assert_ne!(derive_salt(&kp, &Name::from(a)), derive_salt(&kp, &Name::from(b)));
        }

        #[test]
        fn test_commitment_verifies(salt in prop::collection::vec(any::<u8>(), 0..=20), name in prop::collection::vec(any::<u8>(), 1..64)) {
            let salt = Salt::from_bytes(&salt).unwrap();
            let name = Name::from(name);
            prop_assert!(Commitment::compute(&salt, &name).verify(&salt, &name));
        }

        #[test]
        fn test_commitment_rejects_bit_flip_in_salt(
            salt in prop::collection::vec(any::<u8>(), 1..=20),
            name in prop::collection::vec(any::<u8>(), 1..64),
            bit in any::<prop::sample::Index>(),
        ) {
            let original = Salt::from_bytes(&salt).unwrap();
            let name = Name::from(name);
            let commitment = Commitment::compute(&original, &name);

            let mut flipped = salt.clone();
            let i = bit.index(flipped.len() * 8);
            flipped[i / 8] ^= 1 << (i % 8);
            let flipped = Salt::from_bytes(&flipped).unwrap();

            prop_assert!(!commitment.verify(&flipped, &name));
        }

        #[test]
        fn test_commitment_rejects_bit_flip_in_name(
            salt in prop::collection::vec(any::<u8>(), 20..=20),
            name in prop::collection::vec(any::<u8>(), 1..64),
            bit in any::<prop::sample::Index>(),
        ) {
            let salt = Salt::from_bytes(&salt).unwrap();
            let commitment = Commitment::compute(&salt, &Name::from(name.clone()));

            let mut flipped = name.clone();
            let i = bit.index(flipped.len() * 8);
            flipped[i / 8] ^= 1 << (i % 8);

            prop_assert!(!commitment.verify(&salt, &Name::from(flipped)));
        }
    }
}
