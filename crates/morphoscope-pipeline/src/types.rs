//! Shared types for the morphoscope pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ParamValue;
use crate::element::StructuringElement;
use crate::registry::{Operation, OperationFamily};

/// Re-export the image types so downstream crates can handle inputs
/// and results without depending on `image` directly.
pub use image::{DynamicImage, GrayImage, RgbImage};

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of `image`.
    #[must_use]
    pub fn of(image: &DynamicImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One parameter exactly as it was used to compute a result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UsedParameter {
    /// Machine-readable key.
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Literal value.
    pub value: ParamValue,
}

impl fmt::Display for UsedParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            ParamValue::Integer(n) if self.key == "kernel_size" => {
                write!(f, "{}: {n}x{n}", self.label)
            }
            value => write!(f, "{}: {value}", self.label),
        }
    }
}

/// Everything a host shows next to a result image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDescription {
    /// The operation that ran.
    pub operation: Operation,
    /// Its family.
    pub family: OperationFamily,
    /// Heading for the result image.
    pub title: String,
    /// Explanatory text for the operation.
    pub about: &'static str,
    /// Neighborhood explanation, for operations with a structuring element.
    pub connectivity: Option<&'static str>,
    /// Explanatory text for the element's shape.
    pub shape_about: Option<&'static str>,
    /// The structuring element used, if any.
    pub element: Option<StructuringElement>,
    /// Parameters in widget order.
    pub parameters: Vec<UsedParameter>,
    /// Size of the input (and output) image.
    pub dimensions: Dimensions,
}

impl OperationDescription {
    /// Format the description as human-readable text.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!("{}\n{}", self.title, "=".repeat(60)),
            format!("Family: {}", self.family),
            format!("Image: {} ({} pixels)", self.dimensions, self.dimensions.pixel_count()),
        ];

        if let Some(connectivity) = self.connectivity {
            lines.push(format!("Connectivity: {connectivity}"));
        }
        lines.push(String::new());
        lines.push("Current Settings:".to_owned());
        lines.extend(self.parameters.iter().map(|p| format!("- {p}")));

        if let Some(element) = &self.element {
            lines.push(String::new());
            lines.push("Kernel Values:".to_owned());
            lines.push(element.to_string());
        }

        lines.push(String::new());
        lines.push(self.about.to_owned());
        if let Some(shape_about) = self.shape_about {
            lines.push(String::new());
            lines.push(shape_about.to_owned());
        }

        lines.join("\n")
    }
}

/// The output image of one operation together with its description.
#[derive(Debug, Clone)]
pub struct OperationResult {
    /// Result image: `Luma8` for morphology and edge detection, `Rgb8`
    /// for smoothing.
    pub image: DynamicImage,
    /// What was computed and with which parameters.
    pub description: OperationDescription,
}

/// Errors that can occur while getting an image into the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,
}

impl PipelineError {
    /// Message suitable for showing to an end user.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::ImageDecode(_) => "Please upload a valid image",
            Self::EmptyInput => "The uploaded file is empty. Please upload a valid image",
        }
    }
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
        };
        proxy.serialize(serializer)
    }
}
