//! Perceptual-hash fingerprints.
//!
//! ## Supported Algorithms
//! - **pHash (Perceptual Hash)** - DCT-based, the default
//! - **dHash (Difference Hash)** - brightness gradients between neighbours
//! - **aHash (Average Hash)** - fastest, good for exact duplicates
//!
//! Every algorithm produces a 64-bit hash from an 8x8 grid, so hashes are
//! compared with the same Hamming distance regardless of algorithm. Hashes
//! from different algorithms must still never be compared with each other.

mod average;
mod difference;
mod perceptual;

pub use average::AverageHasher;
pub use difference::DifferenceHasher;
pub use perceptual::PerceptualHasher;

use super::decode::decode;
use super::{Fingerprint, FingerprintExtractor, FingerprintKind};
use crate::core::scanner::ImageRef;
use crate::error::ExtractError;
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};

/// Side length of the hash grid
pub const HASH_SIZE: u32 = 8;

/// A 64-bit perceptual hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashFingerprint {
    bits: u64,
}

impl HashFingerprint {
    /// Number of bits in every hash
    pub const BIT_WIDTH: u32 = 64;

    /// Wrap raw bits
    pub fn from_bits(bits: u64) -> Self {
        Self { bits }
    }

    /// Build from big-endian hash bytes. Short inputs are zero-padded,
    /// extra bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        for (dst, src) in buf.iter_mut().zip(bytes) {
            *dst = *src;
        }
        Self {
            bits: u64::from_be_bytes(buf),
        }
    }

    /// Raw bits
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Hamming distance: number of differing bits, `0..=64`.
    /// Lower means more similar.
    pub fn distance(&self, other: &Self) -> u32 {
        (self.bits ^ other.bits).count_ones()
    }

    /// Lowercase hex, 16 characters
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.bits)
    }
}

impl std::fmt::Display for HashFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Available hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithmKind {
    /// Perceptual Hash (pHash)
    #[default]
    Perceptual,
    /// Difference Hash (dHash)
    Difference,
    /// Average Hash (aHash)
    Average,
}

impl HashAlgorithmKind {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            HashAlgorithmKind::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to recompression and resizing"
            }
            HashAlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            HashAlgorithmKind::Average => {
                "Average Hash (aHash) - Fast comparison based on average brightness"
            }
        }
    }
}

impl std::fmt::Display for HashAlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithmKind::Perceptual => write!(f, "pHash"),
            HashAlgorithmKind::Difference => write!(f, "dHash"),
            HashAlgorithmKind::Average => write!(f, "aHash"),
        }
    }
}

/// Trait for hash algorithm implementations
pub trait HashAlgorithm: Send + Sync {
    /// Compute a hash from an already-decoded image
    fn hash_image(&self, image: &DynamicImage) -> Result<HashFingerprint, ExtractError>;

    /// Get the algorithm kind
    fn kind(&self) -> HashAlgorithmKind;
}

/// Build the hasher for an algorithm
pub fn hasher_for(kind: HashAlgorithmKind) -> Box<dyn HashAlgorithm> {
    match kind {
        HashAlgorithmKind::Perceptual => Box::new(PerceptualHasher::new()),
        HashAlgorithmKind::Difference => Box::new(DifferenceHasher::new()),
        HashAlgorithmKind::Average => Box::new(AverageHasher::new()),
    }
}

/// Fingerprint extractor for the hash strategy
pub struct HashExtractor {
    hasher: Box<dyn HashAlgorithm>,
}

impl HashExtractor {
    /// Create an extractor using the given algorithm
    pub fn new(kind: HashAlgorithmKind) -> Self {
        Self {
            hasher: hasher_for(kind),
        }
    }

    /// The algorithm in use
    pub fn algorithm(&self) -> HashAlgorithmKind {
        self.hasher.kind()
    }

    /// Decode and hash one image
    pub fn hash_file(&self, image: &ImageRef) -> Result<HashFingerprint, ExtractError> {
        let decoded = decode(image.path())?;
        self.hasher
            .hash_image(&decoded)
            .map_err(|e| e.at(image.path()))
    }
}

impl Default for HashExtractor {
    fn default() -> Self {
        Self::new(HashAlgorithmKind::default())
    }
}

impl FingerprintExtractor for HashExtractor {
    fn extract(&self, image: &ImageRef) -> Result<Fingerprint, ExtractError> {
        self.hash_file(image).map(Fingerprint::Hash)
    }

    fn kind(&self) -> FingerprintKind {
        FingerprintKind::Hash
    }
}

/// Pack a row-major bit predicate over a grayscale grid into a hash.
/// The first pixel becomes the most significant bit.
fn pack_bits(gray: &GrayImage, width: u32, mut bit: impl FnMut(u32, u32) -> bool) -> u64 {
    let mut bits = 0u64;
    for y in 0..gray.height() {
        for x in 0..width {
            bits = (bits << 1) | u64::from(bit(x, y));
        }
    }
    bits
}
