//! Structuring elements for the morphological operators.
//!
//! A [`StructuringElement`] is an N×N binary grid (N odd) centered at
//! `(N/2, N/2)`. Four shapes are available: the three conventional
//! shapes (rectangle, cross, ellipse) and a diamond built from the
//! Manhattan distance to the center.
//!
//! Elements are plain values: [`build`] is a pure function of
//! `(shape, size)` and the result is never mutated afterwards. The
//! morphology primitives consume it through [`StructuringElement::to_mask`].

use std::fmt;
use std::str::FromStr;

use image::GrayImage;
use imageproc::morphology::Mask;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Smallest element size accepted by [`try_build`].
pub const MIN_SIZE: u32 = 3;

/// Largest element size accepted by [`try_build`].
///
/// `imageproc` addresses the mask center with a `u8`, which caps the
/// side length at 511.
pub const MAX_SIZE: u32 = 511;
const _: () = assert!(MAX_SIZE / 2 <= u8::MAX as u32);

/// Shape of a structuring element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementShape {
    /// Every cell set. Neighbors in all 8 directions.
    #[default]
    Rectangle,
    /// Center row and center column set. Neighbors up, down, left, right.
    Cross,
    /// Conventional ellipse mask inscribed in the square.
    Ellipse,
    /// Cells within Manhattan distance `N/2` of the center.
    Diamond,
}

impl ElementShape {
    /// All shapes, in the order they are offered to the user.
    pub const ALL: [Self; 4] = [Self::Rectangle, Self::Cross, Self::Ellipse, Self::Diamond];

    /// Display label, including the connectivity hint where one applies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rectangle => "Rectangle (8-connectivity)",
            Self::Cross => "Cross (4-connectivity)",
            Self::Ellipse => "Ellipse",
            Self::Diamond => "Diamond (Manhattan distance)",
        }
    }

    /// Stable identifier, identical to the serde representation.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Cross => "cross",
            Self::Ellipse => "ellipse",
            Self::Diamond => "diamond",
        }
    }

    /// One-line explanation of which neighbors count as adjacent.
    #[must_use]
    pub const fn connectivity(self) -> &'static str {
        match self {
            Self::Rectangle => "8-connectivity (all 8 neighboring pixels)",
            Self::Cross => "4-connectivity (up, down, left, right pixels)",
            Self::Ellipse => "Elliptical neighborhood",
            Self::Diamond => "Diamond-shaped (Manhattan distance)",
        }
    }

    /// Longer description of the shape and when to reach for it.
    #[must_use]
    pub const fn about(self) -> &'static str {
        match self {
            Self::Rectangle => {
                "Shape: square neighborhood\n\
                 Connectivity: all 8 neighbors, diagonals included\n\
                 Effect: inclusive, responds to edges in every direction\n\
                 Use case: general purpose edge detection"
            }
            Self::Cross => {
                "Shape: plus-shaped (+) neighborhood\n\
                 Connectivity: 4 neighbors (up, down, left, right)\n\
                 Effect: selective, favors horizontal and vertical edges\n\
                 Use case: emphasizing the cardinal directions"
            }
            Self::Ellipse => {
                "Shape: elliptical neighborhood\n\
                 Connectivity: roughly circular pattern of neighbors\n\
                 Effect: smooth, close to isotropic response\n\
                 Use case: natural-looking edges"
            }
            Self::Diamond => {
                "Shape: diamond (city-block distance from the center)\n\
                 Connectivity: every cell within the Manhattan radius\n\
                 Effect: between the cross and the rectangle\n\
                 Use case: an alternative to the standard shapes"
            }
        }
    }
}

impl fmt::Display for ElementShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown shape name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown structuring element shape: {0:?}")]
pub struct UnknownShape(pub String);

impl FromStr for ElementShape {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|shape| {
                shape.slug().eq_ignore_ascii_case(wanted) || shape.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownShape(s.to_owned()))
    }
}

/// An N×N binary neighborhood mask, N odd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    shape: ElementShape,
    size: u32,
    /// Row-major membership, `size * size` entries.
    cells: Vec<bool>,
}

impl StructuringElement {
    /// The shape this element was built from.
    #[must_use]
    pub const fn shape(&self) -> ElementShape {
        self.shape
    }

    /// Side length N.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Index of the center row and column (`N / 2`).
    #[must_use]
    pub const fn center(&self) -> u32 {
        self.size / 2
    }

    /// Whether `(row, col)` belongs to the element. Out-of-range cells
    /// are never members.
    #[must_use]
    pub fn contains(&self, row: u32, col: u32) -> bool {
        if row >= self.size || col >= self.size {
            return false;
        }
        self.cells[(row * self.size + col) as usize]
    }

    /// Number of member cells.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Membership as nested 0/1 rows, top row first.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.size as usize)
            .map(|row| row.iter().map(|&c| u8::from(c)).collect())
            .collect()
    }

    /// Render the element as a grayscale image: 255 for members, 0 otherwise.
    #[must_use = "returns the rendered element"]
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_fn(self.size, self.size, |x, y| {
            image::Luma([if self.contains(y, x) { 255 } else { 0 }])
        })
    }

    /// Convert to the mask type the `imageproc` morphology functions take.
    #[must_use]
    pub fn to_mask(&self) -> Mask {
        let center = u8::try_from(self.center()).unwrap_or(u8::MAX);
        Mask::from_image(&self.to_image(), center, center)
    }
}

impl fmt::Display for StructuringElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let line: Vec<String> = row.iter().map(u8::to_string).collect();
            f.write_str(&line.join(" "))?;
        }
        Ok(())
    }
}

/// Serde-compatible view of a `StructuringElement`.
///
/// Serialized as its shape, size, and nested 0/1 rows so hosts can show
/// the kernel values directly.
#[derive(Serialize)]
struct StructuringElementProxy {
    shape: ElementShape,
    size: u32,
    rows: Vec<Vec<u8>>,
}

impl Serialize for StructuringElement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StructuringElementProxy {
            shape: self.shape,
            size: self.size,
            rows: self.rows(),
        }
        .serialize(serializer)
    }
}

/// Build a structuring element of the given shape and side length.
///
/// The caller is expected to pass an odd `size` of at least
/// [`MIN_SIZE`]; the config layer clamps user input before it gets
/// here. Sizes outside the buildable domain are coerced (even sizes
/// round up, zero becomes one, anything above [`MAX_SIZE`] is capped)
/// so the returned element is always centered. Use [`try_build`] to
/// reject such sizes instead.
#[must_use = "returns the structuring element"]
pub fn build(shape: ElementShape, size: u32) -> StructuringElement {
    let size = (size.max(1) | 1).min(MAX_SIZE);
    let center = size / 2;

    let cells = match shape {
        ElementShape::Rectangle => vec![true; (size * size) as usize],
        ElementShape::Cross => grid(size, |row, col| row == center || col == center),
        ElementShape::Ellipse => ellipse(size),
        ElementShape::Diamond => grid(size, |row, col| {
            row.abs_diff(center) + col.abs_diff(center) <= center
        }),
    };

    StructuringElement { shape, size, cells }
}

/// Build a structuring element, rejecting sizes that are even or
/// outside `MIN_SIZE..=MAX_SIZE`.
///
/// # Errors
///
/// Returns [`ConfigError::EvenKernelSize`] for even sizes and
/// [`ConfigError::KernelSizeOutOfRange`] for sizes outside the range.
pub fn try_build(shape: ElementShape, size: u32) -> Result<StructuringElement, ConfigError> {
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
        return Err(ConfigError::KernelSizeOutOfRange {
            size,
            min: MIN_SIZE,
            max: MAX_SIZE,
        });
    }
    if size % 2 == 0 {
        return Err(ConfigError::EvenKernelSize(size));
    }
    Ok(build(shape, size))
}

fn grid(size: u32, member: impl Fn(u32, u32) -> bool) -> Vec<bool> {
    (0..size)
        .flat_map(|row| (0..size).map(move |col| (row, col)))
        .map(|(row, col)| member(row, col))
        .collect()
}

/// Ellipse inscribed in the square, one horizontal run per row.
///
/// With `r = N/2`, row `i` spans `r - dx ..= r + dx` where
/// `dx = round(r * sqrt(1 - (i - r)^2 / r^2))`. This is the construction
/// mainstream libraries use for their ellipse kernels.
fn ellipse(size: u32) -> Vec<bool> {
    let r = size / 2;
    if r == 0 {
        return vec![true];
    }
    let radius = f64::from(r);

    let half_widths: Vec<u32> = (0..size)
        .map(|row| half_width(radius, f64::from(row.abs_diff(r))))
        .collect();

    grid(size, |row, col| col.abs_diff(r) <= half_widths[row as usize])
}

// The result lies in [0, radius], so the conversion cannot truncate.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn half_width(radius: f64, dy: f64) -> u32 {
    (radius * (1.0 - (dy * dy) / (radius * radius)).max(0.0).sqrt()).round() as u32
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn odd_sizes() -> impl Iterator<Item = u32> {
        (3..=21).step_by(2)
    }

    fn from_rows(rows: &[&[u8]]) -> Vec<Vec<u8>> {
        rows.iter().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn center_is_always_set() {
        for shape in ElementShape::ALL {
            for n in odd_sizes() {
                let el = build(shape, n);
                assert!(
                    el.contains(el.center(), el.center()),
                    "{shape:?} {n}x{n} is missing its center",
                );
            }
        }
    }

    #[test]
    fn diamond_is_symmetric_under_quarter_turn() {
        for n in odd_sizes() {
            let el = build(ElementShape::Diamond, n);
            for row in 0..n {
                for col in 0..n {
                    // (row, col) rotated 90 degrees about the center.
                    let rotated = (col, n - 1 - row);
                    assert_eq!(
                        el.contains(row, col),
                        el.contains(rotated.0, rotated.1),
                        "diamond {n}x{n} not rotation-symmetric at ({row}, {col})",
                    );
                }
            }
        }
    }

    #[test]
    fn diamond_5x5_matches_manhattan_ball() {
        let el = build(ElementShape::Diamond, 5);
        assert_eq!(
            el.rows(),
            from_rows(&[
                &[0, 0, 1, 0, 0],
                &[0, 1, 1, 1, 0],
                &[1, 1, 1, 1, 1],
                &[0, 1, 1, 1, 0],
                &[0, 0, 1, 0, 0],
            ]),
        );
    }

    #[test]
    fn cross_5x5_sets_only_center_row_and_column() {
        let el = build(ElementShape::Cross, 5);
        for row in 0..5 {
            for col in 0..5 {
                let expected = row == 2 || col == 2;
                assert_eq!(el.contains(row, col), expected, "cell ({row}, {col})");
            }
        }
        assert_eq!(el.count(), 9);
    }

    #[test]
    fn rectangle_is_all_ones() {
        for n in odd_sizes() {
            let el = build(ElementShape::Rectangle, n);
            assert_eq!(el.count(), (n * n) as usize);
        }
    }

    #[test]
    fn ellipse_5x5_matches_conventional_mask() {
        let el = build(ElementShape::Ellipse, 5);
        assert_eq!(
            el.rows(),
            from_rows(&[
                &[0, 0, 1, 0, 0],
                &[1, 1, 1, 1, 1],
                &[1, 1, 1, 1, 1],
                &[1, 1, 1, 1, 1],
                &[0, 0, 1, 0, 0],
            ]),
        );
    }

    #[test]
    fn ellipse_3x3_is_a_cross() {
        assert_eq!(
            build(ElementShape::Ellipse, 3).rows(),
            build(ElementShape::Cross, 3).rows(),
        );
    }

    #[test]
    fn every_shape_is_symmetric_about_both_axes() {
        for shape in ElementShape::ALL {
            for n in odd_sizes() {
                let el = build(shape, n);
                for row in 0..n {
                    for col in 0..n {
                        assert_eq!(el.contains(row, col), el.contains(n - 1 - row, col));
                        assert_eq!(el.contains(row, col), el.contains(row, n - 1 - col));
                    }
                }
            }
        }
    }

    #[test]
    fn build_is_deterministic() {
        for shape in ElementShape::ALL {
            assert_eq!(build(shape, 7), build(shape, 7));
        }
    }

    #[test]
    fn contains_out_of_range_is_false() {
        let el = build(ElementShape::Rectangle, 3);
        assert!(!el.contains(3, 0));
        assert!(!el.contains(0, 3));
    }

    #[test]
    fn build_coerces_sizes_outside_the_domain() {
        for (requested, built) in [(0, 1), (4, 5), (10, 11), (600, MAX_SIZE)] {
            for shape in ElementShape::ALL {
                let el = build(shape, requested);
                assert_eq!(el.size(), built, "{shape} {requested}");
                assert_eq!(el.center(), built / 2);
                assert!(el.contains(el.center(), el.center()));
            }
        }
    }

    #[test]
    fn try_build_rejects_even_size() {
        assert_eq!(
            try_build(ElementShape::Cross, 4),
            Err(ConfigError::EvenKernelSize(4)),
        );
    }

    #[test]
    fn try_build_rejects_out_of_range() {
        assert!(matches!(
            try_build(ElementShape::Cross, 1),
            Err(ConfigError::KernelSizeOutOfRange { size: 1, .. }),
        ));
        assert!(matches!(
            try_build(ElementShape::Cross, 513),
            Err(ConfigError::KernelSizeOutOfRange { size: 513, .. }),
        ));
    }

    #[test]
    fn try_build_accepts_valid_size() {
        let el = try_build(ElementShape::Diamond, 9).unwrap();
        assert_eq!(el.size(), 9);
        assert_eq!(el.shape(), ElementShape::Diamond);
    }

    #[test]
    fn to_image_marks_members_white() {
        let el = build(ElementShape::Cross, 3);
        let img = el.to_image();
        assert_eq!(img.dimensions(), (3, 3));
        assert_eq!(img.get_pixel(1, 0).0[0], 255);
        assert_eq!(img.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn mask_dilates_single_pixel_into_element_shape() {
        // Dilating a lone bright pixel stamps the element around it,
        // which confirms the mask keeps the grid's orientation and center.
        for shape in ElementShape::ALL {
            let el = build(shape, 5);
            let mut img = GrayImage::new(11, 11);
            img.put_pixel(5, 5, image::Luma([255]));
            let dilated = imageproc::morphology::grayscale_dilate(&img, &el.to_mask());
            for row in 0..5 {
                for col in 0..5 {
                    let expected = if el.contains(row, col) { 255 } else { 0 };
                    assert_eq!(
                        dilated.get_pixel(3 + col, 3 + row).0[0],
                        expected,
                        "{shape:?} at ({row}, {col})",
                    );
                }
            }
        }
    }

    #[test]
    fn display_prints_grid() {
        let el = build(ElementShape::Cross, 3);
        assert_eq!(el.to_string(), "0 1 0\n1 1 1\n0 1 0");
    }

    #[test]
    fn shape_parses_from_slug_and_label() {
        assert_eq!("diamond".parse::<ElementShape>(), Ok(ElementShape::Diamond));
        assert_eq!(
            "Cross (4-connectivity)".parse::<ElementShape>(),
            Ok(ElementShape::Cross),
        );
        assert_eq!("ELLIPSE".parse::<ElementShape>(), Ok(ElementShape::Ellipse));
        assert!("hexagon".parse::<ElementShape>().is_err());
    }

    #[test]
    fn serializes_rows() {
        let el = build(ElementShape::Cross, 3);
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["shape"], "cross");
        assert_eq!(json["size"], 3);
        assert_eq!(json["rows"][1], serde_json::json!([1, 1, 1]));
    }
}
