//! Operation registry: every operation a user can pick, grouped into
//! families, with the primitive it runs and the parameters it takes.
//!
//! Presentation layers build their menus and widgets from [`catalog`];
//! command-line hosts turn a typed name into an [`Operation`] with
//! [`resolve`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ParamSpec;

/// An operation name that matches nothing in the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No operation has this label or identifier.
    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),
}

/// When a host should recompute the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerMode {
    /// On every configuration change.
    Immediate,
    /// Only when the user explicitly asks for it.
    OnApply,
}

/// A group of related operations that share a page in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationFamily {
    /// Grayscale morphology with an elliptical (or chosen) element.
    Morphology,
    /// Morphological-gradient edge detection with a chosen element.
    EdgeDetection,
    /// Color smoothing and denoising filters.
    Smoothing,
}

impl OperationFamily {
    /// All families in menu order.
    pub const ALL: [Self; 3] = [Self::Morphology, Self::EdgeDetection, Self::Smoothing];

    /// Page title.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Morphology => "Morphological Operations",
            Self::EdgeDetection => "Image Edge Detection",
            Self::Smoothing => "Image Smoothing Operations",
        }
    }

    /// When results for this family are recomputed.
    #[must_use]
    pub const fn trigger(self) -> TriggerMode {
        match self {
            Self::Morphology | Self::EdgeDetection => TriggerMode::Immediate,
            Self::Smoothing => TriggerMode::OnApply,
        }
    }

    /// Operations in this family, in menu order.
    #[must_use]
    pub const fn operations(self) -> &'static [Operation] {
        match self {
            Self::Morphology => &[
                Operation::Erosion,
                Operation::Dilation,
                Operation::Opening,
                Operation::Closing,
                Operation::Gradient,
                Operation::TopHat,
                Operation::BlackHat,
            ],
            Self::EdgeDetection => &[Operation::GradientEdge],
            Self::Smoothing => &[
                Operation::MeanBlur,
                Operation::GaussianBlur,
                Operation::MedianBlur,
                Operation::BilateralFilter,
            ],
        }
    }

    /// Whether the input is converted to grayscale before processing.
    #[must_use]
    pub const fn is_grayscale(self) -> bool {
        matches!(self, Self::Morphology | Self::EdgeDetection)
    }
}

impl fmt::Display for OperationFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The library primitive an operation is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Primitive {
    /// Neighborhood minimum.
    Erode,
    /// Neighborhood maximum.
    Dilate,
    /// Erode then dilate.
    Open,
    /// Dilate then erode.
    Close,
    /// Dilation minus erosion, saturating.
    MorphologicalGradient,
    /// Input minus opening.
    TopHat,
    /// Closing minus input.
    BlackHat,
    /// `|dilation - erosion|`.
    AbsoluteGradient,
    /// Unweighted box average.
    BoxFilter,
    /// Separable Gaussian convolution.
    GaussianFilter,
    /// Neighborhood median.
    MedianFilter,
    /// Spatial and intensity weighted average.
    BilateralFilter,
}

impl Primitive {
    /// One-line description of what the primitive computes.
    #[must_use]
    pub const fn semantics(self) -> &'static str {
        match self {
            Self::Erode => "minimum over the neighborhood",
            Self::Dilate => "maximum over the neighborhood",
            Self::Open => "erode then dilate",
            Self::Close => "dilate then erode",
            Self::MorphologicalGradient => "dilation minus erosion",
            Self::TopHat => "input minus opening",
            Self::BlackHat => "closing minus input",
            Self::AbsoluteGradient => "absolute difference of dilation and erosion",
            Self::BoxFilter => "unweighted average over the kernel",
            Self::GaussianFilter => "Gaussian-weighted average over the kernel",
            Self::MedianFilter => "median over the kernel",
            Self::BilateralFilter => "average weighted by distance and intensity similarity",
        }
    }
}

/// Every user-selectable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Morphological erosion.
    Erosion,
    /// Morphological dilation.
    Dilation,
    /// Morphological opening.
    Opening,
    /// Morphological closing.
    Closing,
    /// Morphological gradient.
    Gradient,
    /// White top hat.
    TopHat,
    /// Black top hat.
    BlackHat,
    /// Edge detection by morphological gradient.
    GradientEdge,
    /// Box filter.
    MeanBlur,
    /// Gaussian filter.
    GaussianBlur,
    /// Median filter.
    MedianBlur,
    /// Bilateral filter.
    BilateralFilter,
}

const MORPHOLOGY_PARAMS: &[ParamSpec] =
    &[ParamSpec::MORPHOLOGY_KERNEL_SIZE, ParamSpec::MORPHOLOGY_SHAPE];
const EDGE_PARAMS: &[ParamSpec] = &[ParamSpec::EDGE_SHAPE, ParamSpec::EDGE_KERNEL_SIZE];
const KERNEL_ONLY_PARAMS: &[ParamSpec] = &[ParamSpec::SMOOTHING_KERNEL_SIZE];
const GAUSSIAN_PARAMS: &[ParamSpec] =
    &[ParamSpec::SMOOTHING_KERNEL_SIZE, ParamSpec::GAUSSIAN_SIGMA];
const BILATERAL_PARAMS: &[ParamSpec] = &[
    ParamSpec::BILATERAL_DIAMETER,
    ParamSpec::BILATERAL_SIGMA_COLOR,
    ParamSpec::BILATERAL_SIGMA_SPACE,
];

impl Operation {
    /// All operations, family by family, in menu order.
    pub const ALL: [Self; 12] = [
        Self::Erosion,
        Self::Dilation,
        Self::Opening,
        Self::Closing,
        Self::Gradient,
        Self::TopHat,
        Self::BlackHat,
        Self::GradientEdge,
        Self::MeanBlur,
        Self::GaussianBlur,
        Self::MedianBlur,
        Self::BilateralFilter,
    ];

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Erosion => "Erosion",
            Self::Dilation => "Dilation",
            Self::Opening => "Opening",
            Self::Closing => "Closing",
            Self::Gradient => "Gradient",
            Self::TopHat => "Top Hat",
            Self::BlackHat => "Black Hat",
            Self::GradientEdge => "Gradient Edge",
            Self::MeanBlur => "Mean Blur",
            Self::GaussianBlur => "Gaussian Blur",
            Self::MedianBlur => "Median Blur",
            Self::BilateralFilter => "Bilateral Filter",
        }
    }

    /// Kebab-case identifier, as used in JSON and on the command line.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Erosion => "erosion",
            Self::Dilation => "dilation",
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Gradient => "gradient",
            Self::TopHat => "top-hat",
            Self::BlackHat => "black-hat",
            Self::GradientEdge => "gradient-edge",
            Self::MeanBlur => "mean-blur",
            Self::GaussianBlur => "gaussian-blur",
            Self::MedianBlur => "median-blur",
            Self::BilateralFilter => "bilateral-filter",
        }
    }

    /// The family this operation belongs to.
    #[must_use]
    pub const fn family(self) -> OperationFamily {
        match self {
            Self::Erosion
            | Self::Dilation
            | Self::Opening
            | Self::Closing
            | Self::Gradient
            | Self::TopHat
            | Self::BlackHat => OperationFamily::Morphology,
            Self::GradientEdge => OperationFamily::EdgeDetection,
            Self::MeanBlur | Self::GaussianBlur | Self::MedianBlur | Self::BilateralFilter => {
                OperationFamily::Smoothing
            }
        }
    }

    /// The primitive this operation runs.
    #[must_use]
    pub const fn primitive(self) -> Primitive {
        match self {
            Self::Erosion => Primitive::Erode,
            Self::Dilation => Primitive::Dilate,
            Self::Opening => Primitive::Open,
            Self::Closing => Primitive::Close,
            Self::Gradient => Primitive::MorphologicalGradient,
            Self::TopHat => Primitive::TopHat,
            Self::BlackHat => Primitive::BlackHat,
            Self::GradientEdge => Primitive::AbsoluteGradient,
            Self::MeanBlur => Primitive::BoxFilter,
            Self::GaussianBlur => Primitive::GaussianFilter,
            Self::MedianBlur => Primitive::MedianFilter,
            Self::BilateralFilter => Primitive::BilateralFilter,
        }
    }

    /// Parameters this operation takes, in widget order.
    #[must_use]
    pub const fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::Erosion
            | Self::Dilation
            | Self::Opening
            | Self::Closing
            | Self::Gradient
            | Self::TopHat
            | Self::BlackHat => MORPHOLOGY_PARAMS,
            Self::GradientEdge => EDGE_PARAMS,
            Self::MeanBlur | Self::MedianBlur => KERNEL_ONLY_PARAMS,
            Self::GaussianBlur => GAUSSIAN_PARAMS,
            Self::BilateralFilter => BILATERAL_PARAMS,
        }
    }

    /// Heading shown above the result image.
    #[must_use]
    pub fn result_title(self) -> String {
        match self {
            Self::GradientEdge => "Edge Detection".to_owned(),
            Self::MeanBlur => "Mean Blurred Image".to_owned(),
            Self::GaussianBlur => "Gaussian Blurred Image".to_owned(),
            Self::MedianBlur => "Median Blurred Image".to_owned(),
            Self::BilateralFilter => "Bilateral Filtered Image".to_owned(),
            _ => format!("{} Result", self.label()),
        }
    }

    /// Explanatory text for the "about" panel.
    #[must_use]
    pub const fn about(self) -> &'static str {
        match self {
            Self::Erosion => {
                "Erosion:\n\
                 - Replaces each pixel with the minimum of its neighborhood\n\
                 - Shrinks bright regions and widens dark gaps\n\
                 - Removes small bright specks"
            }
            Self::Dilation => {
                "Dilation:\n\
                 - Replaces each pixel with the maximum of its neighborhood\n\
                 - Grows bright regions and closes dark gaps\n\
                 - Fills small dark holes"
            }
            Self::Opening => {
                "Opening:\n\
                 - Erosion followed by dilation\n\
                 - Removes bright features smaller than the kernel\n\
                 - Leaves larger shapes roughly unchanged"
            }
            Self::Closing => {
                "Closing:\n\
                 - Dilation followed by erosion\n\
                 - Fills dark features smaller than the kernel\n\
                 - Leaves larger shapes roughly unchanged"
            }
            Self::Gradient => {
                "Morphological Gradient:\n\
                 - Difference between dilation and erosion\n\
                 - Outlines object boundaries"
            }
            Self::TopHat => {
                "Top Hat:\n\
                 - Difference between the input and its opening\n\
                 - Extracts bright details smaller than the kernel"
            }
            Self::BlackHat => {
                "Black Hat:\n\
                 - Difference between the closing and the input\n\
                 - Extracts dark details smaller than the kernel"
            }
            Self::GradientEdge => {
                "Morphological Gradient Edge Detection:\n\
                 - Uses morphological operations (dilation and erosion) to detect edges\n\
                 - Computes the difference between dilated and eroded images\n\
                 - Highlights regions of high contrast (edges)"
            }
            Self::MeanBlur => {
                "Mean Blur (Average Filtering):\n\
                 - Replaces each pixel value with the average of its neighboring pixels\n\
                 - Simple and fast smoothing operation\n\
                 - Can reduce noise but may blur edges\n\
                 - Kernel size determines the extent of smoothing"
            }
            Self::GaussianBlur => {
                "Gaussian Blur:\n\
                 - Uses a Gaussian kernel for weighted averaging\n\
                 - Weights decrease with distance from center pixel\n\
                 - Better at preserving edges compared to mean blur\n\
                 - Sigma controls the spread of the Gaussian function"
            }
            Self::MedianBlur => {
                "Median Blur:\n\
                 - Replaces each pixel with the median value of neighboring pixels\n\
                 - Excellent for removing salt-and-pepper noise\n\
                 - Preserves edges better than linear filters\n\
                 - Particularly effective for impulse noise"
            }
            Self::BilateralFilter => {
                "Bilateral Filter:\n\
                 - Advanced smoothing that preserves edges\n\
                 - Considers both spatial proximity and intensity similarity\n\
                 - Reduces noise while maintaining sharp edges\n\
                 - More computationally intensive but produces better results"
            }
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Operation {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s).map(|entry| entry.operation)
    }
}

/// Everything a host needs to know about one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegistryEntry {
    /// The operation.
    pub operation: Operation,
    /// Display name.
    pub label: &'static str,
    /// Family it belongs to.
    pub family: OperationFamily,
    /// Primitive it dispatches to.
    pub primitive: Primitive,
    /// Parameters it takes.
    pub params: &'static [ParamSpec],
    /// When to recompute.
    pub trigger: TriggerMode,
    /// Explanatory text.
    pub about: &'static str,
}

/// Registry entry for `operation`.
#[must_use]
pub const fn entry(operation: Operation) -> RegistryEntry {
    let family = operation.family();
    RegistryEntry {
        operation,
        label: operation.label(),
        family,
        primitive: operation.primitive(),
        params: operation.params(),
        trigger: family.trigger(),
        about: operation.about(),
    }
}

/// Look up an operation by name.
///
/// Matching ignores ASCII case and treats spaces, underscores, and
/// hyphens alike, so `"Top Hat"`, `"top_hat"`, and `"top-hat"` all
/// resolve to [`Operation::TopHat`].
///
/// # Errors
///
/// Returns [`RegistryError::UnknownOperation`] if nothing matches.
pub fn resolve(name: &str) -> Result<RegistryEntry, RegistryError> {
    let wanted = canonical(name);
    Operation::ALL
        .into_iter()
        .find(|op| op.slug() == wanted || canonical(op.label()) == wanted)
        .map(entry)
        .ok_or_else(|| RegistryError::UnknownOperation(name.to_owned()))
}

fn canonical(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '_' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// One family's page in the [`Catalog`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyEntry {
    /// The family.
    pub family: OperationFamily,
    /// Page title.
    pub label: &'static str,
    /// When its results are recomputed.
    pub trigger: TriggerMode,
    /// Its operations.
    pub operations: Vec<RegistryEntry>,
}

/// The full parameter schema, family by family.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    /// Families in menu order.
    pub families: Vec<FamilyEntry>,
}

impl Catalog {
    /// Iterate every entry across all families.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.families.iter().flat_map(|f| f.operations.iter())
    }
}

/// Build the catalog of every family and operation.
#[must_use]
pub fn catalog() -> Catalog {
    Catalog {
        families: OperationFamily::ALL
            .into_iter()
            .map(|family| FamilyEntry {
                family,
                label: family.label(),
                trigger: family.trigger(),
                operations: family.operations().iter().copied().map(entry).collect(),
            })
            .collect(),
    }
}
