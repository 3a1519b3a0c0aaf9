//! Golden test vectors for salt derivation and commitments.
//!
//! Registrations made by existing wallets must stay recoverable, so the
//! derived salt for a given key and name can never change.

use namereg_core::{derive_salt, Commitment, Keypair, Name};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub label: &'static str,
    /// Seed of the key owning the commit output.
    pub seed: [u8; 32],
    pub name: &'static str,
    /// Expected derived salt (hex).
    pub expected_salt: &'static str,
    /// Expected commitment (hex).
    pub expected_commitment: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            label: "domain name",
            seed: [0x42; 32],
            name: "d/example",
            expected_salt: "fcff90918277e42476112bf216edfd6eb2c4c190",
            expected_commitment: "24bbecda9bffed7472eab29225b948b21d3205ca",
        },
        GoldenVector {
            label: "identity name",
            seed: [0x42; 32],
            name: "id/alice",
            expected_salt: "9b4cde8e63f8948a233e9ca24b5cea7e4bf47f1d",
            expected_commitment: "218b626be3cca2d512e75dfdd6273d5897141395",
        },
        GoldenVector {
            label: "bare name, other key",
            seed: [0x01; 32],
            name: "bob",
            expected_salt: "8a4ff05544eb957b364a8c2617d62fc726abcebb",
            expected_commitment: "b95c4886901786ad2892fd4eab269a141ff85cff",
        },
    ]
}

/// Recompute salt and commitment for a vector, as hex.
pub fn compute_vector(vector: &GoldenVector) -> (String, String) {
    let key = Keypair::from_seed(&vector.seed);
    let name = Name::from(vector.name);
    let salt = derive_salt(&key, &name);
    let commitment = Commitment::compute(&salt, &name);
    (salt.to_hex(), commitment.to_hex())
}

/// Check every vector, returning the labels of those that do not match.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .iter()
        .filter(|v| compute_vector(v) != (v.expected_salt.into(), v.expected_commitment.into()))
        .map(|v| v.label)
        .collect()
}
