//! Smoothing and denoising filters on color images.
//!
//! Four filters, each a thin wrapper around an [`imageproc::filter`]
//! primitive:
//!
//! - [`mean_blur`]: unweighted box average ([`imageproc::filter::box_filter`])
//! - [`gaussian_blur`]: Gaussian-weighted average with an explicit
//!   kernel size ([`imageproc::filter::separable_filter_equal`])
//! - [`median_blur`]: local median ([`imageproc::filter::median_filter`])
//! - [`bilateral_filter`]: edge-preserving average weighted by spatial
//!   and intensity distance ([`imageproc::filter::bilateral_filter`])
//!
//! Unlike the morphology and edge operations these keep color: inputs
//! and outputs are RGB. Borders are handled the way each `imageproc`
//! primitive documents it (edge pixels are replicated for the box,
//! Gaussian, and median filters).

use std::fmt;

use image::{GrayImage, Rgb32FImage, RgbImage};
use imageproc::filter::bilateral::GaussianEuclideanColorDistance;
use serde::{Deserialize, Serialize};

use crate::config::ParamValue;
use crate::registry::Operation;

/// A smoothing filter together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SmoothingParams {
    /// Unweighted local average over a `kernel_size` square.
    Mean {
        /// Side of the averaging window (odd).
        kernel_size: u32,
    },
    /// Gaussian-weighted local average.
    Gaussian {
        /// Side of the kernel (odd).
        kernel_size: u32,
        /// Standard deviation of the weights, in pixels.
        sigma: f32,
    },
    /// Local median, robust to impulse noise.
    Median {
        /// Side of the window (odd).
        kernel_size: u32,
    },
    /// Edge-preserving smoothing.
    Bilateral {
        /// Neighborhood diameter in pixels.
        diameter: u32,
        /// How far apart two intensities may be and still be averaged.
        sigma_color: f32,
        /// How far apart two pixels may be and still be averaged.
        sigma_space: f32,
    },
}

impl SmoothingParams {
    /// The registry operation for this filter.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Mean { .. } => Operation::MeanBlur,
            Self::Gaussian { .. } => Operation::GaussianBlur,
            Self::Median { .. } => Operation::MedianBlur,
            Self::Bilateral { .. } => Operation::BilateralFilter,
        }
    }

    /// Literal value of the parameter with the given key, if this
    /// filter has one.
    #[must_use]
    pub fn param_value(&self, key: &str) -> Option<ParamValue> {
        match (*self, key) {
            (
                Self::Mean { kernel_size }
                | Self::Gaussian { kernel_size, .. }
                | Self::Median { kernel_size },
                "kernel_size",
            ) => Some(ParamValue::Integer(kernel_size)),
            (Self::Gaussian { sigma, .. }, "sigma") => Some(ParamValue::Float(sigma)),
            (Self::Bilateral { diameter, .. }, "diameter") => Some(ParamValue::Integer(diameter)),
            (Self::Bilateral { sigma_color, .. }, "sigma_color") => {
                Some(ParamValue::Float(sigma_color))
            }
            (Self::Bilateral { sigma_space, .. }, "sigma_space") => {
                Some(ParamValue::Float(sigma_space))
            }
            _ => None,
        }
    }

    /// Run the filter.
    #[must_use = "returns the smoothed image"]
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        match *self {
            Self::Mean { kernel_size } => mean_blur(image, kernel_size),
            Self::Gaussian { kernel_size, sigma } => gaussian_blur(image, kernel_size, sigma),
            Self::Median { kernel_size } => median_blur(image, kernel_size),
            Self::Bilateral {
                diameter,
                sigma_color,
                sigma_space,
            } => bilateral_filter(image, diameter, sigma_color, sigma_space),
        }
    }
}

impl fmt::Display for SmoothingParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation().label())
    }
}

/// Replace each pixel by the unweighted mean of the `kernel_size`
/// square around it.
///
/// `imageproc::filter::box_filter` only accepts `GrayImage`, so the
/// image is split into its three channels, each is filtered, and the
/// result is reassembled. Averaging is linear and per-channel, so this
/// matches filtering in color space.
#[must_use = "returns the blurred image"]
pub fn mean_blur(image: &RgbImage, kernel_size: u32) -> RgbImage {
    let radius = kernel_size / 2;
    map_channels(image, |channel| {
        imageproc::filter::box_filter(channel, radius, radius)
    })
}

/// Gaussian blur with an explicit kernel size.
///
/// The weights are sampled from a Gaussian of standard deviation `sigma`
/// over `kernel_size` taps and normalized to sum to one (see
/// [`gaussian_kernel`]). As `sigma` shrinks the weights collapse onto
/// the center tap and the blur approaches the identity.
///
/// Both passes run in `f32` and the result is rounded once, so a flat
/// image comes back unchanged.
#[must_use = "returns the blurred image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gaussian_blur(image: &RgbImage, kernel_size: u32, sigma: f32) -> RgbImage {
    let kernel = gaussian_kernel(kernel_size, sigma);
    let (w, h) = image.dimensions();
    let float = Rgb32FImage::from_fn(w, h, |x, y| {
        image::Rgb(image.get_pixel(x, y).0.map(f32::from))
    });
    let blurred = imageproc::filter::separable_filter_equal(&float, &kernel);
    RgbImage::from_fn(w, h, |x, y| {
        image::Rgb(
            blurred
                .get_pixel(x, y)
                .0
                .map(|v| v.round().clamp(0.0, 255.0) as u8),
        )
    })
}

/// Replace each pixel by the per-channel median of the `kernel_size`
/// square around it.
#[must_use = "returns the filtered image"]
pub fn median_blur(image: &RgbImage, kernel_size: u32) -> RgbImage {
    let radius = kernel_size / 2;
    imageproc::filter::median_filter(image, radius, radius)
}

/// Edge-preserving smoothing.
///
/// Each output pixel is a weighted average over a `diameter`-wide
/// neighborhood, the weights falling off with spatial distance
/// (`sigma_space`) and with color distance (`sigma_color`).
#[must_use = "returns the filtered image"]
pub fn bilateral_filter(
    image: &RgbImage,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> RgbImage {
    let radius = u8::try_from(diameter / 2).unwrap_or(u8::MAX);
    imageproc::filter::bilateral_filter(
        image,
        radius,
        sigma_space,
        GaussianEuclideanColorDistance::new(sigma_color),
    )
}

/// Normalized 1-D Gaussian weights for a kernel of `size` taps.
///
/// A non-positive `sigma` is derived from the size instead, using the
/// usual `0.3 * ((size - 1) / 2 - 1) + 0.8` rule.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    let size = size.max(1);
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3f32.mul_add((size - 1) as f32 * 0.5 - 1.0, 0.8)
    };
    let center = (size / 2) as f32;
    let denom = 2.0 * sigma * sigma;

    let weights: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / denom).exp()
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Apply a single-channel filter to each RGB channel independently.
fn map_channels(image: &RgbImage, filter: impl Fn(&GrayImage) -> GrayImage) -> RgbImage {
    let (w, h) = image.dimensions();

    let channels: [GrayImage; 3] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });
    let filtered: [GrayImage; 3] = std::array::from_fn(|c| filter(&channels[c]));

    RgbImage::from_fn(w, h, |x, y| {
        image::Rgb([
            filtered[0].get_pixel(x, y).0[0],
            filtered[1].get_pixel(x, y).0[0],
            filtered[2].get_pixel(x, y).0[0],
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 image: left half red, right half blue.
    fn sharp_color_edge() -> RgbImage {
        RgbImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        })
    }

    fn checkerboard(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let v = if (x + y) % 2 == 0 { 255 } else { 0 };
            image::Rgb([v, v, v])
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn gradient_image() -> RgbImage {
        RgbImage::from_fn(12, 12, |x, y| {
            image::Rgb([
                ((x * 21) % 256) as u8,
                ((y * 19) % 256) as u8,
                (((x + y) * 10) % 256) as u8,
            ])
        })
    }

    fn assert_near(actual: u8, expected: u8, tolerance: u8, context: &str) {
        assert!(
            actual.abs_diff(expected) <= tolerance,
            "{context}: expected ~{expected}, got {actual}",
        );
    }

    #[test]
    fn mean_blur_checkerboard_interior_matches_hand_computed_average() {
        // In a 3x3 window of a 0/255 checkerboard, the center and the four
        // diagonal cells share a color and the four edge neighbors have the
        // other. Where the center is 255: 5 * 255 / 9 = 141.7. Where the
        // center is 0: 4 * 255 / 9 = 113.3.
        let img = checkerboard(6);
        let blurred = mean_blur(&img, 3);
        for y in 1..5 {
            for x in 1..5 {
                let expected = if (x + y) % 2 == 0 { 142 } else { 113 };
                for c in 0..3 {
                    assert_near(
                        blurred.get_pixel(x, y).0[c],
                        expected,
                        1,
                        &format!("({x}, {y}) channel {c}"),
                    );
                }
            }
        }
    }

    #[test]
    fn mean_blur_matches_per_channel_box_filter() {
        let img = gradient_image();
        let blurred = mean_blur(&img, 5);
        for c in 0..3 {
            let chan = GrayImage::from_fn(12, 12, |x, y| image::Luma([img.get_pixel(x, y).0[c]]));
            let expected = imageproc::filter::box_filter(&chan, 2, 2);
            for (x, y, p) in expected.enumerate_pixels() {
                assert_eq!(blurred.get_pixel(x, y).0[c], p.0[0], "({x}, {y}) channel {c}");
            }
        }
    }

    #[test]
    fn gaussian_small_sigma_approaches_identity() {
        let img = gradient_image();
        let blurred = gaussian_blur(&img, 5, 0.1);
        for (a, b) in img.pixels().zip(blurred.pixels()) {
            for c in 0..3 {
                assert_near(b.0[c], a.0[c], 1, "sigma 0.1");
            }
        }
    }

    #[test]
    fn gaussian_smaller_sigma_stays_closer_to_input() {
        let img = sharp_color_edge();
        let soft = gaussian_blur(&img, 7, 3.0);
        let sharp = gaussian_blur(&img, 7, 0.5);
        // Red channel just left of the boundary.
        let soft_red = soft.get_pixel(4, 5).0[0];
        let sharp_red = sharp.get_pixel(4, 5).0[0];
        assert!(sharp_red > soft_red, "sharp={sharp_red} soft={soft_red}");
        assert!(soft_red < 255);
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        for size in [3, 5, 9, 15] {
            let k = gaussian_kernel(size, 1.4);
            assert_eq!(k.len(), size as usize);
            let total: f32 = k.iter().sum();
            assert!((total - 1.0).abs() < 1e-5, "size {size} sums to {total}");
            for i in 0..k.len() {
                assert!((k[i] - k[k.len() - 1 - i]).abs() < 1e-6);
            }
            let center = k.len() / 2;
            assert!(k.iter().all(|&w| w <= k[center]));
        }
    }

    #[test]
    fn gaussian_kernel_derives_sigma_when_non_positive() {
        let derived = gaussian_kernel(5, 0.0);
        // size 5 -> sigma = 0.3 * (2 - 1) + 0.8 = 1.1
        let explicit = gaussian_kernel(5, 1.1);
        for (a, b) in derived.iter().zip(&explicit) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut img = RgbImage::from_pixel(9, 9, image::Rgb([40, 80, 120]));
        img.put_pixel(4, 4, image::Rgb([255, 255, 255]));
        img.put_pixel(2, 6, image::Rgb([0, 0, 0]));
        let filtered = median_blur(&img, 3);
        assert!(filtered.pixels().all(|p| p.0 == [40, 80, 120]));
    }

    #[test]
    fn bilateral_preserves_strong_edge() {
        let img = sharp_color_edge();
        let filtered = bilateral_filter(&img, 9, 10.0, 75.0);
        // The red/blue color distance dwarfs sigma_color, so the two sides
        // barely mix.
        assert_near(filtered.get_pixel(4, 5).0[0], 255, 2, "left of edge");
        assert_near(filtered.get_pixel(5, 5).0[2], 255, 2, "right of edge");
    }

    #[test]
    fn uniform_image_unchanged_by_every_filter() {
        let img = RgbImage::from_pixel(10, 10, image::Rgb([100, 150, 200]));
        let filters = [
            SmoothingParams::Mean { kernel_size: 5 },
            SmoothingParams::Gaussian {
                kernel_size: 5,
                sigma: 1.4,
            },
            SmoothingParams::Median { kernel_size: 5 },
            SmoothingParams::Bilateral {
                diameter: 9,
                sigma_color: 75.0,
                sigma_space: 75.0,
            },
        ];
        for filter in filters {
            let out = filter.apply(&img);
            for p in out.pixels() {
                assert_near(p.0[0], 100, 1, &filter.to_string());
                assert_near(p.0[1], 150, 1, &filter.to_string());
                assert_near(p.0[2], 200, 1, &filter.to_string());
            }
        }
    }

    #[test]
    fn gaussian_keeps_flat_images_exact() {
        for (kernel_size, sigma) in [(3, 0.1), (5, 1.0), (9, 2.5), (15, 5.0)] {
            for value in [0, 1, 50, 99, 100, 199, 200, 254, 255] {
                let img = RgbImage::from_pixel(12, 12, image::Rgb([value; 3]));
                let out = gaussian_blur(&img, kernel_size, sigma);
                assert_eq!(out, img, "k={kernel_size} sigma={sigma} value={value}");
            }
        }
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RgbImage::new(17, 31);
        assert_eq!(mean_blur(&img, 3).dimensions(), (17, 31));
        assert_eq!(gaussian_blur(&img, 3, 1.0).dimensions(), (17, 31));
        assert_eq!(median_blur(&img, 3).dimensions(), (17, 31));
        assert_eq!(bilateral_filter(&img, 5, 10.0, 10.0).dimensions(), (17, 31));
    }

    #[test]
    fn param_values() {
        let p = SmoothingParams::Bilateral {
            diameter: 9,
            sigma_color: 75.0,
            sigma_space: 50.0,
        };
        assert_eq!(p.param_value("diameter"), Some(ParamValue::Integer(9)));
        assert_eq!(p.param_value("sigma_space"), Some(ParamValue::Float(50.0)));
        assert_eq!(p.param_value("kernel_size"), None);
        assert_eq!(p.operation(), Operation::BilateralFilter);
    }
}
