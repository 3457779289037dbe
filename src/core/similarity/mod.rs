//! # Similarity Module
//!
//! Decides whether two fingerprints belong in the same group.
//!
//! ## Semantics
//! | Mode    | Measure            | Similar when          | Default T |
//! |---------|--------------------|-----------------------|-----------|
//! | Hamming | differing bits     | `distance < T`        | 15        |
//! | Cosine  | cosine of angle    | `similarity >= T`     | 0.90      |
//!
//! The operators differ on purpose and must not be unified: boundary
//! values behave differently in each mode.

mod matrix;

pub use matrix::SimilarityMatrix;

use crate::core::fingerprint::{Fingerprint, FingerprintKind, HashFingerprint};
use crate::core::scanner::ImageRef;
use crate::error::GrouperError;
use serde::{Deserialize, Serialize};

/// Default Hamming threshold for 64-bit hashes
pub const DEFAULT_HAMMING_THRESHOLD: u32 = 15;

/// Default cosine threshold for embeddings
pub const DEFAULT_COSINE_THRESHOLD: f32 = 0.90;

/// Threshold test between two fingerprints of the same kind
pub trait SimilarityOracle: Send + Sync {
    /// True when `candidate` belongs with `representative`.
    /// Fingerprints of another kind never match.
    fn is_similar(&self, representative: &Fingerprint, candidate: &Fingerprint) -> bool;

    /// Fingerprint family this oracle understands
    fn kind(&self) -> FingerprintKind;

    /// Human-readable description of the rule
    fn description(&self) -> String;
}

/// Hamming-distance oracle: similar when `distance < threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HammingOracle {
    threshold: u32,
}

impl HammingOracle {
    /// Thresholds above the hash width are rejected
    pub fn new(threshold: u32) -> Result<Self, GrouperError> {
        if threshold > HashFingerprint::BIT_WIDTH {
            return Err(GrouperError::Config(format!(
                "Hamming threshold {} is outside 0..={}",
                threshold,
                HashFingerprint::BIT_WIDTH
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Raw test on a known distance
    pub fn passes(&self, distance: u32) -> bool {
        distance < self.threshold
    }
}

impl Default for HammingOracle {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_HAMMING_THRESHOLD,
        }
    }
}

impl SimilarityOracle for HammingOracle {
    fn is_similar(&self, representative: &Fingerprint, candidate: &Fingerprint) -> bool {
        match (representative, candidate) {
            (Fingerprint::Hash(a), Fingerprint::Hash(b)) => self.passes(a.distance(b)),
            _ => false,
        }
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Hash
    }

    fn description(&self) -> String {
        format!("Hamming distance < {}", self.threshold)
    }
}

/// Cosine-similarity oracle: similar when `similarity >= threshold`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CosineOracle {
    threshold: f32,
}

impl CosineOracle {
    /// Thresholds outside `[0, 1]` are rejected
    pub fn new(threshold: f32) -> Result<Self, GrouperError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(GrouperError::Config(format!(
                "cosine threshold {} is outside [0, 1]",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Raw test on a known similarity
    pub fn passes(&self, similarity: f32) -> bool {
        similarity >= self.threshold
    }
}

impl Default for CosineOracle {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_COSINE_THRESHOLD,
        }
    }
}

impl SimilarityOracle for CosineOracle {
    fn is_similar(&self, representative: &Fingerprint, candidate: &Fingerprint) -> bool {
        match (representative, candidate) {
            (Fingerprint::Embedding(a), Fingerprint::Embedding(b))
                if a.dimension() == b.dimension() =>
            {
                self.passes(a.cosine_similarity(b))
            }
            _ => false,
        }
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Embedding
    }

    fn description(&self) -> String {
        format!("cosine similarity >= {:.2}", self.threshold)
    }
}

/// Hamming distance between two images, for threshold diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairDistance {
    pub a: String,
    pub b: String,
    pub distance: u32,
}

/// Every pairwise Hamming distance, in discovery order (i < j).
pub fn pairwise_distances(hashes: &[(ImageRef, HashFingerprint)]) -> Vec<PairDistance> {
    let mut pairs = Vec::new();
    for i in 0..hashes.len() {
        for j in (i + 1)..hashes.len() {
            let (image_a, hash_a) = &hashes[i];
            let (image_b, hash_b) = &hashes[j];
            pairs.push(PairDistance {
                a: image_a.file_name(),
                b: image_b.file_name(),
                distance: hash_a.distance(hash_b),
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::EmbeddingFingerprint;

    fn hash(bits: u64) -> Fingerprint {
        Fingerprint::Hash(HashFingerprint::from_bits(bits))
    }

    fn emb(values: &[f32]) -> Fingerprint {
        Fingerprint::Embedding(EmbeddingFingerprint::new(values.to_vec()))
    }

    #[test]
    fn hamming_boundary_is_strict() {
        let oracle = HammingOracle::new(5).unwrap();

        assert!(oracle.passes(4));
        assert!(!oracle.passes(5));
        assert!(!oracle.passes(6));
    }

    #[test]
    fn hamming_oracle_compares_hashes() {
        let oracle = HammingOracle::new(5).unwrap();
        // 3 differing bits
        assert!(oracle.is_similar(&hash(0b000), &hash(0b111)));
        // 5 differing bits
        assert!(!oracle.is_similar(&hash(0), &hash(0b11111)));
    }

    #[test]
    fn zero_threshold_matches_nothing() {
        let oracle = HammingOracle::new(0).unwrap();
        assert!(!oracle.is_similar(&hash(42), &hash(42)));
    }

    #[test]
    fn cosine_boundary_is_inclusive() {
        let oracle = CosineOracle::new(0.95).unwrap();

        assert!(oracle.passes(0.95));
        assert!(oracle.passes(0.99));
        assert!(!oracle.passes(0.949));
    }

    #[test]
    fn cosine_oracle_compares_embeddings() {
        let oracle = CosineOracle::new(0.9).unwrap();
        assert!(oracle.is_similar(&emb(&[1.0, 0.0]), &emb(&[2.0, 0.0])));
        assert!(!oracle.is_similar(&emb(&[1.0, 0.0]), &emb(&[0.0, 1.0])));
    }

    #[test]
    fn mixed_kinds_never_match() {
        let hamming = HammingOracle::new(64).unwrap();
        let cosine = CosineOracle::new(0.0).unwrap();

        assert!(!hamming.is_similar(&hash(0), &emb(&[1.0])));
        assert!(!cosine.is_similar(&emb(&[1.0]), &hash(0)));
    }

    #[test]
    fn mismatched_dimensions_never_match() {
        let cosine = CosineOracle::new(0.0).unwrap();
        assert!(!cosine.is_similar(&emb(&[1.0, 0.0]), &emb(&[1.0, 0.0, 0.0])));
    }

    #[test]
    fn out_of_range_thresholds_are_rejected() {
        assert!(HammingOracle::new(65).is_err());
        assert!(HammingOracle::new(64).is_ok());
        assert!(CosineOracle::new(1.5).is_err());
        assert!(CosineOracle::new(-0.1).is_err());
        assert!(CosineOracle::new(f32::NAN).is_err());
    }

    #[test]
    fn defaults() {
        assert_eq!(HammingOracle::default().threshold(), 15);
        assert_eq!(CosineOracle::default().threshold(), 0.90);
        assert!(HammingOracle::default().description().contains("15"));
    }

    #[test]
    fn pairwise_distances_cover_every_pair_once() {
        let hashes = vec![
            (ImageRef::new("/p/a.jpg"), HashFingerprint::from_bits(0)),
            (ImageRef::new("/p/b.jpg"), HashFingerprint::from_bits(0b1)),
            (ImageRef::new("/p/c.jpg"), HashFingerprint::from_bits(0b111)),
        ];

        let pairs = pairwise_distances(&hashes);

        assert_eq!(pairs.len(), 3);
        assert_eq!((pairs[0].a.as_str(), pairs[0].b.as_str()), ("a.jpg", "b.jpg"));
        assert_eq!(pairs[0].distance, 1);
        assert_eq!(pairs[1].distance, 3);
        assert_eq!(pairs[2].distance, 2);
    }
}
