//! # Fingerprint Module
//!
//! Turns each image into a compact fingerprint.
//!
//! Two strategies exist and are never mixed within a run:
//! - `hash` - 64-bit perceptual hashes compared by Hamming distance
//! - `embedding` - learned feature vectors compared by cosine similarity

mod decode;
pub mod embedding;
pub mod hash;
mod resize;

pub use decode::decode;
pub use embedding::{EmbeddingExtractor, EmbeddingFingerprint, FeatureModel, Provider};
pub use hash::{HashAlgorithmKind, HashExtractor, HashFingerprint};

use crate::core::scanner::ImageRef;
use crate::error::ExtractError;
use serde::{Deserialize, Serialize};

/// A per-image fingerprint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Fingerprint {
    Hash(HashFingerprint),
    Embedding(EmbeddingFingerprint),
}

impl Fingerprint {
    pub fn kind(&self) -> FingerprintKind {
        match self {
            Fingerprint::Hash(_) => FingerprintKind::Hash,
            Fingerprint::Embedding(_) => FingerprintKind::Embedding,
        }
    }

    pub fn as_hash(&self) -> Option<&HashFingerprint> {
        match self {
            Fingerprint::Hash(h) => Some(h),
            Fingerprint::Embedding(_) => None,
        }
    }

    pub fn as_embedding(&self) -> Option<&EmbeddingFingerprint> {
        match self {
            Fingerprint::Embedding(e) => Some(e),
            Fingerprint::Hash(_) => None,
        }
    }
}

/// Which family a fingerprint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintKind {
    Hash,
    Embedding,
}

impl std::fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintKind::Hash => write!(f, "hash"),
            FingerprintKind::Embedding => write!(f, "embedding"),
        }
    }
}

/// Maps an image to its fingerprint.
///
/// Implementations must be deterministic for a fixed image and
/// configuration, and safe to call from several threads.
pub trait FingerprintExtractor: Send + Sync {
    /// Decode and fingerprint one image. A failure means the image is
    /// dropped from the run.
    fn extract(&self, image: &ImageRef) -> Result<Fingerprint, ExtractError>;

    /// Family of fingerprints this extractor produces
    fn kind(&self) -> FingerprintKind;
}
