//! Difference Hash (dHash) implementation.
//!
//! dHash works by:
//! 1. Resizing the image to 9x8 grayscale
//! 2. Comparing each pixel to the one to its right
//! 3. If left pixel is brighter, set bit to 1, else 0

use super::super::resize::resize_to_grayscale;
use super::{pack_bits, HashAlgorithm, HashAlgorithmKind, HashFingerprint, HASH_SIZE};
use crate::error::ExtractError;
use image::DynamicImage;

/// Difference Hash (dHash) implementation
#[derive(Debug, Default)]
pub struct DifferenceHasher;

impl DifferenceHasher {
    /// Create a new 64-bit dHash hasher
    pub fn new() -> Self {
        Self
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<HashFingerprint, ExtractError> {
        // One extra column to compute differences
        let gray = resize_to_grayscale(image, HASH_SIZE + 1, HASH_SIZE)?;

        let bits = pack_bits(&gray, HASH_SIZE, |x, y| {
            gray.get_pixel(x, y)[0] > gray.get_pixel(x + 1, y)[0]
        });

        Ok(HashFingerprint::from_bits(bits))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn horizontal_gradient(reverse: bool) -> DynamicImage {
        let img = ImageBuffer::from_fn(90, 80, |x, _| {
            let v = (x * 255 / 89) as u8;
            let v = if reverse { 255 - v } else { v };
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn brightening_gradient_sets_no_bits() {
        let hash = DifferenceHasher::new()
            .hash_image(&horizontal_gradient(false))
            .unwrap();
        assert_eq!(hash.bits(), 0);
    }

    #[test]
    fn darkening_gradient_sets_every_bit() {
        let hash = DifferenceHasher::new()
            .hash_image(&horizontal_gradient(true))
            .unwrap();
        assert_eq!(hash.bits(), u64::MAX);
    }

    #[test]
    fn kind_returns_difference() {
        assert_eq!(DifferenceHasher::new().kind(), HashAlgorithmKind::Difference);
    }
}
