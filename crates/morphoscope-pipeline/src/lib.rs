//! morphoscope-pipeline: classical image operations behind a typed
//! configuration model (sans-IO).
//!
//! Three families of operations are available:
//!
//! - grayscale morphology (erosion, dilation, opening, closing,
//!   gradient, top hat, black hat) with a chosen structuring element
//! - edge detection by morphological gradient
//! - color smoothing (mean, Gaussian, median, bilateral)
//!
//! [`compute_result`] is the pure entry point: one decoded image plus one
//! [`OperationConfig`] in, one [`OperationResult`] out. [`Session`] wraps
//! it with the state a presentation layer needs (the loaded image, the
//! current configuration, and stale-result detection).
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and images. File and terminal handling live in the
//! `morphoscope` binary.

pub mod config;
pub mod decode;
pub mod diagnostics;
pub mod edge;
pub mod element;
pub mod morphology;
pub mod registry;
pub mod session;
pub mod smooth;
pub mod types;

pub use config::{ConfigError, OperationConfig, ParamKind, ParamSpec, ParamValue};
pub use element::{ElementShape, StructuringElement};
pub use morphology::MorphologyOp;
pub use registry::{Operation, OperationFamily, RegistryError, TriggerMode, catalog, resolve};
pub use session::{Session, SessionError, SessionState, Ticket};
pub use smooth::SmoothingParams;
pub use types::{
    Dimensions, DynamicImage, OperationDescription, OperationResult, PipelineError, UsedParameter,
};

/// Apply the operation described by `config` to `image`.
///
/// The config is normalized first (out-of-range parameters are clamped
/// and logged), so every config produces a result. Morphology and edge
/// detection convert the input to grayscale and return a `Luma8` image;
/// smoothing keeps color and returns an `Rgb8` image. The output always
/// has the input's dimensions.
#[must_use = "returns the operation result"]
pub fn compute_result(image: &DynamicImage, config: &OperationConfig) -> OperationResult {
    let config = config.normalized();
    let operation = config.operation();
    let dimensions = Dimensions::of(image);
    log::debug!("dispatching {operation} on {dimensions} image: {config:?}");

    let (output, element) = match config {
        OperationConfig::Morphology {
            op,
            kernel_size,
            shape,
        } => {
            let element = element::build(shape, kernel_size);
            let gray = decode::to_grayscale(image);
            (DynamicImage::ImageLuma8(op.apply(&gray, &element)), Some(element))
        }
        OperationConfig::EdgeDetection { shape, kernel_size } => {
            let element = element::build(shape, kernel_size);
            let gray = decode::to_grayscale(image);
            let edges = edge::gradient_edges(&gray, &element);
            (DynamicImage::ImageLuma8(edges), Some(element))
        }
        OperationConfig::Smoothing { filter } => {
            let rgb = decode::to_rgb(image);
            (DynamicImage::ImageRgb8(filter.apply(&rgb)), None)
        }
    };

    OperationResult {
        image: output,
        description: describe(&config, element, dimensions),
    }
}

/// Decode `image_bytes` and apply `config` to the result.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is unrecognized.
pub fn process(
    image_bytes: &[u8],
    config: &OperationConfig,
) -> Result<OperationResult, PipelineError> {
    let image = decode::decode(image_bytes)?;
    Ok(compute_result(&image, config))
}

fn describe(
    config: &OperationConfig,
    element: Option<StructuringElement>,
    dimensions: Dimensions,
) -> OperationDescription {
    let operation = config.operation();
    let parameters = operation
        .params()
        .iter()
        .filter_map(|param| {
            config.param_value(param.key).map(|value| UsedParameter {
                key: param.key,
                label: param.label,
                value,
            })
        })
        .collect();
    let shape = element.as_ref().map(StructuringElement::shape);

    OperationDescription {
        operation,
        family: operation.family(),
        title: operation.result_title(),
        about: operation.about(),
        connectivity: shape.map(ElementShape::connectivity),
        shape_about: shape.map(ElementShape::about),
        element,
        parameters,
        dimensions,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RgbImage;

    /// Create a PNG whose left half is black and right half white.
    fn sharp_edge_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, _y| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[allow(clippy::cast_possible_truncation)]
    fn colorful() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(16, 12, |x, y| {
            image::Rgb([(x * 16) as u8, (y * 20) as u8, 90])
        }))
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &OperationConfig::default());
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &OperationConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn process_sharp_edge_with_gradient_edge() {
        let png = sharp_edge_png(40, 40);
        let config = OperationConfig::default_for(Operation::GradientEdge);
        let result = process(&png, &config).unwrap();
        let edges = result.image.as_luma8().unwrap();
        assert_eq!(edges.get_pixel(19, 5).0[0], 255);
        assert_eq!(edges.get_pixel(20, 5).0[0], 255);
        assert_eq!(edges.get_pixel(5, 5).0[0], 0);
        assert_eq!(result.description.dimensions.width, 40);
    }

    #[test]
    fn grayscale_families_return_luma() {
        for op in [Operation::Opening, Operation::BlackHat, Operation::GradientEdge] {
            let result = compute_result(&colorful(), &OperationConfig::default_for(op));
            assert!(result.image.as_luma8().is_some(), "{op}");
            assert_eq!((result.image.width(), result.image.height()), (16, 12));
        }
    }

    #[test]
    fn smoothing_returns_rgb() {
        for op in OperationFamily::Smoothing.operations() {
            let result = compute_result(&colorful(), &OperationConfig::default_for(*op));
            assert!(result.image.as_rgb8().is_some(), "{op}");
            assert_eq!((result.image.width(), result.image.height()), (16, 12));
        }
    }

    #[test]
    fn description_lists_literal_parameters() {
        let config = OperationConfig::Smoothing {
            filter: SmoothingParams::Gaussian {
                kernel_size: 7,
                sigma: 2.5,
            },
        };
        let description = compute_result(&colorful(), &config).description;
        assert_eq!(description.operation, Operation::GaussianBlur);
        assert_eq!(description.title, "Gaussian Blurred Image");
        assert!(description.element.is_none());
        assert!(description.connectivity.is_none());
        let rendered: Vec<String> = description
            .parameters
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, ["Kernel Size: 7x7", "Sigma: 2.5"]);
    }

    #[test]
    fn description_carries_structuring_element() {
        let config = OperationConfig::EdgeDetection {
            shape: ElementShape::Diamond,
            kernel_size: 5,
        };
        let description = compute_result(&colorful(), &config).description;
        let element = description.element.unwrap();
        assert_eq!(element.shape(), ElementShape::Diamond);
        assert_eq!(element.size(), 5);
        assert_eq!(
            description.connectivity,
            Some(ElementShape::Diamond.connectivity()),
        );
    }

    #[test]
    fn out_of_range_config_is_clamped_not_rejected() {
        let config = OperationConfig::Morphology {
            op: MorphologyOp::Erosion,
            kernel_size: 100,
            shape: ElementShape::Rectangle,
        };
        let result = compute_result(&colorful(), &config);
        assert_eq!(result.description.element.unwrap().size(), 21);
        assert_eq!(
            result.description.parameters[0].value,
            ParamValue::Integer(21),
        );
    }

    #[test]
    fn uniform_image_gradient_edge_is_black() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(12, 12, image::Rgb([50, 60, 70])));
        let result = compute_result(&img, &OperationConfig::default_for(Operation::GradientEdge));
        assert!(result.image.as_luma8().unwrap().pixels().all(|p| p.0[0] == 0));
    }
}
