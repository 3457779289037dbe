//! Perceptual Hash (pHash) implementation.
//!
//! pHash takes the DCT of a downscaled grayscale image and keeps the
//! low-frequency corner, setting each bit by comparing its coefficient to
//! the median. That makes it robust to:
//! - Scaling
//! - Brightness/contrast changes
//! - Compression artifacts
//!
//! The transform itself comes from the image_hasher crate.

use super::{HashAlgorithm, HashAlgorithmKind, HashFingerprint, HASH_SIZE};
use crate::error::ExtractError;
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig};

/// Perceptual Hash (pHash) implementation using DCT
pub struct PerceptualHasher {
    hasher: image_hasher::Hasher,
}

impl PerceptualHasher {
    /// Create a new 64-bit pHash hasher
    pub fn new() -> Self {
        let hasher = HasherConfig::new()
            .hash_size(HASH_SIZE, HASH_SIZE)
            .hash_alg(HashAlg::Median)
            .preproc_dct()
            .to_hasher();

        Self { hasher }
    }
}

impl Default for PerceptualHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<HashFingerprint, ExtractError> {
        let hash = self.hasher.hash_image(image);
        Ok(HashFingerprint::from_bytes(hash.as_bytes()))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Perceptual
    }
}
