//! Average Hash (aHash) implementation.
//!
//! aHash works by:
//! 1. Resizing the image to 8x8 grayscale
//! 2. Computing the average brightness
//! 3. For each pixel: if brighter than average, set bit to 1, else 0

use super::super::resize::resize_to_grayscale;
use super::{pack_bits, HashAlgorithm, HashAlgorithmKind, HashFingerprint, HASH_SIZE};
use crate::error::ExtractError;
use image::DynamicImage;

/// Average Hash (aHash) implementation
#[derive(Debug, Default)]
pub struct AverageHasher;

impl AverageHasher {
    /// Create a new 64-bit aHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for AverageHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<HashFingerprint, ExtractError> {
        let gray = resize_to_grayscale(image, HASH_SIZE, HASH_SIZE)?;

        let total: u64 = gray.pixels().map(|p| p[0] as u64).sum();
        let average = (total / u64::from(HASH_SIZE * HASH_SIZE)) as u8;

        let bits = pack_bits(&gray, HASH_SIZE, |x, y| gray.get_pixel(x, y)[0] > average);

        Ok(HashFingerprint::from_bits(bits))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Average
    }
}
