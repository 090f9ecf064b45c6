//! Image decoding and the color-space conversions operations expect.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces a
//! [`DynamicImage`]. Morphology and edge detection then work on
//! [`to_grayscale`]; smoothing works on [`to_rgb`].
//!
//! Grayscale uses the Rec.601 weights (0.299, 0.587, 0.114) in 14-bit
//! fixed point, the same values common vision libraries produce.
//! `DynamicImage::to_luma8` uses Rec.709 weights and would give slightly
//! different intensities for color input.

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes.
///
/// Supports whatever formats the `image` crate was built with (PNG,
/// JPEG, BMP, WebP here).
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    Ok(image::load_from_memory(bytes)?)
}

// Rec.601 luma weights scaled by 2^14; they sum to exactly 2^14.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Single-channel luminance of `image`.
///
/// Green counts for more than red, and red for more than blue. Gray
/// input passes through unchanged. Alpha is dropped.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = image {
        return gray.clone();
    }
    imageproc::map::map_pixels(&image.to_rgb8(), |Rgb([r, g, b])| Luma([luma(r, g, b)]))
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = LUMA_R * u32::from(r) + LUMA_G * u32::from(g) + LUMA_B * u32::from(b);
    let rounded = (weighted + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT;
    u8::try_from(rounded).unwrap_or(u8::MAX)
}

/// Three-channel 8-bit color copy of `image`. Alpha is dropped.
#[must_use = "returns the RGB image"]
pub fn to_rgb(image: &DynamicImage) -> RgbImage {
    image.to_rgb8()
}

/// Whether `image` is stored with color channels, in which case the
/// grayscale families discard its chroma.
#[must_use]
pub fn has_color(image: &DynamicImage) -> bool {
    image.color().has_color()
}
