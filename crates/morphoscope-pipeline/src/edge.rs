//! Edge detection by morphological gradient.
//!
//! Dilates and erodes a grayscale image with the same structuring
//! element and returns the absolute difference. Flat regions produce 0;
//! intensity transitions light up in proportion to their contrast across
//! the element's footprint. The element's shape decides which neighbors
//! count, so a cross favors horizontal and vertical edges while a
//! rectangle responds in every direction.

use image::GrayImage;
use imageproc::morphology::{grayscale_dilate, grayscale_erode};

use crate::element::StructuringElement;
use crate::morphology::absolute_difference;

/// Detect edges as `|dilate(image) - erode(image)|` using `element`.
#[must_use = "returns the edge map"]
pub fn gradient_edges(image: &GrayImage, element: &StructuringElement) -> GrayImage {
    let mask = element.to_mask();
    let dilated = grayscale_dilate(image, &mask);
    let eroded = grayscale_erode(image, &mask);
    absolute_difference(&dilated, &eroded)
}

/// Number of pixels at or above `threshold` in an edge map.
#[must_use]
pub fn edge_pixel_count(edges: &GrayImage, threshold: u8) -> u64 {
    edges.pixels().map(|p| u64::from(p.0[0] >= threshold)).sum()
}
