//! Grayscale morphology.
//!
//! Erosion, dilation, opening, and closing are delegated to
//! [`imageproc::morphology`]. The derived operations (gradient, top hat,
//! black hat) are pixelwise differences of those results, saturating at
//! zero.
//!
//! Pixels outside the image are ignored by the `imageproc` primitives:
//! a neighborhood that hangs over the border only considers its in-bounds
//! cells. Eroding an all-white image therefore leaves it all white.

use std::fmt;

use image::GrayImage;
use imageproc::morphology::{
    Mask, grayscale_close, grayscale_dilate, grayscale_erode, grayscale_open,
};
use serde::{Deserialize, Serialize};

use crate::element::StructuringElement;
use crate::registry::Operation;

/// One of the seven morphology operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MorphologyOp {
    /// Minimum over the neighborhood. Shrinks bright regions.
    Erosion,
    /// Maximum over the neighborhood. Grows bright regions.
    Dilation,
    /// Erosion then dilation. Removes small bright specks.
    Opening,
    /// Dilation then erosion. Fills small dark gaps.
    Closing,
    /// Dilation minus erosion.
    Gradient,
    /// Input minus its opening.
    TopHat,
    /// Closing minus the input.
    BlackHat,
}

impl MorphologyOp {
    /// All operations in menu order.
    pub const ALL: [Self; 7] = [
        Self::Erosion,
        Self::Dilation,
        Self::Opening,
        Self::Closing,
        Self::Gradient,
        Self::TopHat,
        Self::BlackHat,
    ];

    /// The registry operation for this morphology op.
    #[must_use]
    pub const fn operation(self) -> Operation {
        match self {
            Self::Erosion => Operation::Erosion,
            Self::Dilation => Operation::Dilation,
            Self::Opening => Operation::Opening,
            Self::Closing => Operation::Closing,
            Self::Gradient => Operation::Gradient,
            Self::TopHat => Operation::TopHat,
            Self::BlackHat => Operation::BlackHat,
        }
    }

    /// Apply this operation to `image` using `element` as the neighborhood.
    #[must_use = "returns the transformed image"]
    pub fn apply(self, image: &GrayImage, element: &StructuringElement) -> GrayImage {
        let mask = element.to_mask();
        match self {
            Self::Erosion => grayscale_erode(image, &mask),
            Self::Dilation => grayscale_dilate(image, &mask),
            Self::Opening => grayscale_open(image, &mask),
            Self::Closing => grayscale_close(image, &mask),
            Self::Gradient => gradient_with(image, &mask),
            Self::TopHat => saturating_difference(image, &grayscale_open(image, &mask)),
            Self::BlackHat => saturating_difference(&grayscale_close(image, &mask), image),
        }
    }
}

impl fmt::Display for MorphologyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation().label())
    }
}

fn gradient_with(image: &GrayImage, mask: &Mask) -> GrayImage {
    saturating_difference(&grayscale_dilate(image, mask), &grayscale_erode(image, mask))
}

/// Pixelwise `minuend - subtrahend`, clamped at zero.
///
/// Both images must have the same dimensions.
#[must_use = "returns the difference image"]
pub fn saturating_difference(minuend: &GrayImage, subtrahend: &GrayImage) -> GrayImage {
    debug_assert_eq!(minuend.dimensions(), subtrahend.dimensions());
    GrayImage::from_fn(minuend.width(), minuend.height(), |x, y| {
        let a = minuend.get_pixel(x, y).0[0];
        let b = subtrahend.get_pixel(x, y).0[0];
        image::Luma([a.saturating_sub(b)])
    })
}

/// Pixelwise `|a - b|`.
///
/// Both images must have the same dimensions.
#[must_use = "returns the difference image"]
pub fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        image::Luma([a.get_pixel(x, y).0[0].abs_diff(b.get_pixel(x, y).0[0])])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementShape, build};

    fn erode(image: &GrayImage, element: &StructuringElement) -> GrayImage {
        MorphologyOp::Erosion.apply(image, element)
    }

    fn dilate(image: &GrayImage, element: &StructuringElement) -> GrayImage {
        MorphologyOp::Dilation.apply(image, element)
    }

    fn open(image: &GrayImage, element: &StructuringElement) -> GrayImage {
        MorphologyOp::Opening.apply(image, element)
    }

    fn close(image: &GrayImage, element: &StructuringElement) -> GrayImage {
        MorphologyOp::Closing.apply(image, element)
    }

    /// Deterministic grayscale texture with bright and dark specks of
    /// several sizes.
    #[allow(clippy::cast_possible_truncation)]
    fn textured_image() -> GrayImage {
        GrayImage::from_fn(24, 18, |x, y| {
            let value = if (x + 2 * y) % 7 == 0 {
                255
            } else if (3 * x + y) % 11 == 0 {
                0
            } else {
                ((x * 37 + y * 91) % 256) as u8
            };
            image::Luma([value])
        })
    }

    fn square(n: u32) -> StructuringElement {
        build(ElementShape::Rectangle, n)
    }

    #[test]
    fn erosion_of_white_image_stays_white() {
        let img = GrayImage::from_pixel(10, 10, image::Luma([255]));
        let eroded = erode(&img, &square(3));
        assert!(eroded.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn erosion_takes_neighborhood_minimum() {
        let mut img = GrayImage::from_pixel(7, 7, image::Luma([200]));
        img.put_pixel(3, 3, image::Luma([10]));
        let eroded = erode(&img, &square(3));
        for y in 2..=4 {
            for x in 2..=4 {
                assert_eq!(eroded.get_pixel(x, y).0[0], 10, "({x}, {y})");
            }
        }
        assert_eq!(eroded.get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn dilation_takes_neighborhood_maximum() {
        let mut img = GrayImage::new(7, 7);
        img.put_pixel(3, 3, image::Luma([180]));
        let dilated = dilate(&img, &build(ElementShape::Cross, 3));
        assert_eq!(dilated.get_pixel(3, 2).0[0], 180);
        assert_eq!(dilated.get_pixel(2, 3).0[0], 180);
        // Diagonal neighbors are outside the cross.
        assert_eq!(dilated.get_pixel(2, 2).0[0], 0);
    }

    #[test]
    fn opening_is_idempotent() {
        let img = textured_image();
        for shape in ElementShape::ALL {
            for n in [3, 5, 7] {
                let el = build(shape, n);
                let once = open(&img, &el);
                let twice = open(&once, &el);
                assert_eq!(once, twice, "{shape:?} {n}x{n}");
            }
        }
    }

    #[test]
    fn closing_is_idempotent() {
        let img = textured_image();
        let el = build(ElementShape::Ellipse, 5);
        let once = close(&img, &el);
        assert_eq!(close(&once, &el), once);
    }

    #[test]
    fn top_hat_is_input_minus_opening() {
        let img = textured_image();
        for shape in ElementShape::ALL {
            let el = build(shape, 5);
            let expected = saturating_difference(&img, &open(&img, &el));
            assert_eq!(MorphologyOp::TopHat.apply(&img, &el), expected);
            // Opening never exceeds the input, so nothing saturates.
            let opened = open(&img, &el);
            assert!(img.pixels().zip(opened.pixels()).all(|(a, b)| a.0[0] >= b.0[0]));
        }
    }

    #[test]
    fn black_hat_is_closing_minus_input() {
        let img = textured_image();
        for shape in ElementShape::ALL {
            let el = build(shape, 5);
            let closed = close(&img, &el);
            let expected = GrayImage::from_fn(img.width(), img.height(), |x, y| {
                image::Luma([closed.get_pixel(x, y).0[0] - img.get_pixel(x, y).0[0]])
            });
            assert_eq!(MorphologyOp::BlackHat.apply(&img, &el), expected);
        }
    }

    #[test]
    fn gradient_is_dilation_minus_erosion() {
        let img = textured_image();
        let el = square(3);
        let expected = saturating_difference(&dilate(&img, &el), &erode(&img, &el));
        assert_eq!(MorphologyOp::Gradient.apply(&img, &el), expected);
    }

    #[test]
    fn every_op_preserves_dimensions() {
        let img = GrayImage::new(17, 31);
        let el = square(5);
        for op in MorphologyOp::ALL {
            assert_eq!(op.apply(&img, &el).dimensions(), (17, 31), "{op}");
        }
    }

    #[test]
    fn saturating_difference_clamps_at_zero() {
        let a = GrayImage::from_pixel(2, 2, image::Luma([10]));
        let b = GrayImage::from_pixel(2, 2, image::Luma([30]));
        assert!(saturating_difference(&a, &b).pixels().all(|p| p.0[0] == 0));
        assert!(saturating_difference(&b, &a).pixels().all(|p| p.0[0] == 20));
    }

    #[test]
    fn absolute_difference_is_symmetric() {
        let a = GrayImage::from_pixel(2, 2, image::Luma([10]));
        let b = GrayImage::from_pixel(2, 2, image::Luma([30]));
        assert_eq!(absolute_difference(&a, &b), absolute_difference(&b, &a));
        assert!(absolute_difference(&a, &b).pixels().all(|p| p.0[0] == 20));
    }

    #[test]
    fn op_maps_to_registry_operation() {
        assert_eq!(MorphologyOp::TopHat.operation(), Operation::TopHat);
        assert_eq!(MorphologyOp::TopHat.to_string(), "Top Hat");
    }
}
