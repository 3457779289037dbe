//! Fast SIMD-accelerated image resizing.
//!
//! Uses fast_image_resize, which picks AVX2/NEON code paths when available.

use crate::error::ExtractError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{imageops, DynamicImage, GrayImage, ImageBuffer, RgbImage};
use std::path::PathBuf;

/// Resize to `width x height` and convert to grayscale (hash input).
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, ExtractError> {
    let gray = image.to_luma8();
    let (src_w, src_h) = gray.dimensions();
    let pixels = resize_raw(gray.into_raw(), (src_w, src_h), (width, height), PixelType::U8)?;

    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| failure("grayscale buffer size"))
}

/// Resize to `width x height` RGB.
pub fn resize_to_rgb(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<RgbImage, ExtractError> {
    let rgb = image.to_rgb8();
    let (src_w, src_h) = rgb.dimensions();
    let pixels = resize_raw(rgb.into_raw(), (src_w, src_h), (width, height), PixelType::U8x3)?;

    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| failure("RGB buffer size"))
}

/// Feature-model input: scale so the shorter side is `shorter` (aspect
/// ratio kept), then cut the central `crop x crop` square.
pub fn resize_and_center_crop(
    image: &DynamicImage,
    shorter: u32,
    crop: u32,
) -> Result<RgbImage, ExtractError> {
    if crop > shorter {
        return Err(failure("crop larger than resized image"));
    }

    let (width, height) = scaled_to_shorter(image.width(), image.height(), shorter)?;
    let resized = resize_to_rgb(image, width, height)?;

    let left = centered_offset(width, crop);
    let top = centered_offset(height, crop);
    Ok(imageops::crop_imm(&resized, left, top, crop, crop).to_image())
}

/// Target size with the shorter side at `shorter`; the longer side is
/// truncated, matching torchvision's `Resize`.
fn scaled_to_shorter(width: u32, height: u32, shorter: u32) -> Result<(u32, u32), ExtractError> {
    if width == 0 || height == 0 {
        return Err(failure("zero-sized resize"));
    }

    let scale =
        |long: u32, short: u32| (u64::from(shorter) * u64::from(long) / u64::from(short)) as u32;
    Ok(if width <= height {
        (shorter, scale(height, width))
    } else {
        (scale(width, height), shorter)
    })
}

/// Offset of a centred window of `crop` inside `length`, halves rounded to even
fn centered_offset(length: u32, crop: u32) -> u32 {
    (f64::from(length - crop) / 2.0).round_ties_even() as u32
}

fn resize_raw(
    pixels: Vec<u8>,
    (src_w, src_h): (u32, u32),
    (dst_w, dst_h): (u32, u32),
    pixel_type: PixelType,
) -> Result<Vec<u8>, ExtractError> {
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Err(failure("zero-sized resize"));
    }

    let src = Image::from_vec_u8(src_w, src_h, pixels, pixel_type)
        .map_err(|e| failure(&format!("source image: {}", e)))?;
    let mut dst = Image::new(dst_w, dst_h, pixel_type);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src, &mut dst, &options)
        .map_err(|e| failure(&format!("resize: {}", e)))?;

    Ok(dst.into_vec())
}

fn failure(reason: &str) -> ExtractError {
    ExtractError::Decode {
        path: PathBuf::new(),
        reason: reason.to_string(),
    }
}
