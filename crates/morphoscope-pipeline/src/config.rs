//! Operation configuration: typed parameters, their ranges, and
//! validation.
//!
//! An [`OperationConfig`] names one operation plus the parameters it
//! consumes. Every numeric parameter has a [`ParamSpec`] describing the
//! range a UI should offer for it. Values outside those ranges are
//! unreachable through a well-behaved UI, but the config layer still
//! guards against them:
//!
//! - [`OperationConfig::validate`] rejects them with a [`ConfigError`].
//! - [`OperationConfig::normalized`] clamps them into range and logs a
//!   warning for every adjusted field (clamp-and-warn).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::element::ElementShape;
use crate::morphology::MorphologyOp;
use crate::registry::{Operation, OperationFamily};
use crate::smooth::SmoothingParams;

/// A parameter value outside its allowed range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Kernel and structuring-element sizes must be odd so they have a
    /// center cell.
    #[error("kernel size must be odd, got {0}")]
    EvenKernelSize(u32),

    /// Kernel size outside the allowed range.
    #[error("kernel size {size} is outside the allowed range {min}..={max}")]
    KernelSizeOutOfRange {
        /// Requested size.
        size: u32,
        /// Smallest allowed size.
        min: u32,
        /// Largest allowed size.
        max: u32,
    },

    /// Any other numeric parameter outside its range (or not finite).
    #[error("{name} = {value} is outside the allowed range {min}..={max}")]
    ParameterOutOfRange {
        /// Parameter key, e.g. `"sigma"`.
        name: &'static str,
        /// Requested value.
        value: f64,
        /// Smallest allowed value.
        min: f64,
        /// Largest allowed value.
        max: f64,
    },
}

/// The value domain of one configurable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ParamKind {
    /// Integer slider. `odd` marks kernel sizes, which step by 2 and
    /// only take odd values.
    Integer {
        /// Smallest allowed value.
        min: u32,
        /// Largest allowed value.
        max: u32,
        /// Slider step.
        step: u32,
        /// Initial value.
        default: u32,
        /// Whether only odd values are valid.
        odd: bool,
    },
    /// Floating-point slider.
    Float {
        /// Smallest allowed value.
        min: f32,
        /// Largest allowed value.
        max: f32,
        /// Slider step.
        step: f32,
        /// Initial value.
        default: f32,
    },
    /// Choice of structuring-element shape.
    Shape {
        /// Initially selected shape.
        default: ElementShape,
        /// Shapes on offer.
        options: [ElementShape; 4],
    },
}

/// Schema for one parameter: its key, display label, and domain.
///
/// Presentation layers build their input widgets from these.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Machine-readable key, matching the serde field name in
    /// [`OperationConfig`].
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    /// Allowed values.
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl ParamSpec {
    /// Kernel size for the morphology operations.
    pub const MORPHOLOGY_KERNEL_SIZE: Self = Self::kernel_size(3, 21, 5);
    /// Structuring-element shape for the morphology operations.
    pub const MORPHOLOGY_SHAPE: Self = Self::shape(ElementShape::Ellipse);
    /// Kernel size for gradient edge detection.
    pub const EDGE_KERNEL_SIZE: Self = Self::kernel_size(3, 15, 3);
    /// Structuring-element shape for gradient edge detection.
    pub const EDGE_SHAPE: Self = Self::shape(ElementShape::Rectangle);
    /// Kernel size for the mean, Gaussian, and median blurs.
    pub const SMOOTHING_KERNEL_SIZE: Self = Self::kernel_size(3, 15, 5);
    /// Gaussian standard deviation.
    pub const GAUSSIAN_SIGMA: Self = Self::float("sigma", "Sigma", 0.1, 5.0, 0.1, 1.0);
    /// Bilateral filter neighborhood diameter.
    pub const BILATERAL_DIAMETER: Self = Self {
        key: "diameter",
        label: "Diameter",
        kind: ParamKind::Integer {
            min: 5,
            max: 20,
            step: 1,
            default: 9,
            odd: false,
        },
    };
    /// Bilateral filter intensity sigma.
    pub const BILATERAL_SIGMA_COLOR: Self =
        Self::float("sigma_color", "Sigma Color", 10.0, 150.0, 1.0, 75.0);
    /// Bilateral filter spatial sigma.
    pub const BILATERAL_SIGMA_SPACE: Self =
        Self::float("sigma_space", "Sigma Space", 10.0, 150.0, 1.0, 75.0);

    const fn kernel_size(min: u32, max: u32, default: u32) -> Self {
        Self {
            key: "kernel_size",
            label: "Kernel Size",
            kind: ParamKind::Integer {
                min,
                max,
                step: 2,
                default,
                odd: true,
            },
        }
    }

    const fn shape(default: ElementShape) -> Self {
        Self {
            key: "shape",
            label: "Mask Type",
            kind: ParamKind::Shape {
                default,
                options: ElementShape::ALL,
            },
        }
    }

    const fn float(
        key: &'static str,
        label: &'static str,
        min: f32,
        max: f32,
        step: f32,
        default: f32,
    ) -> Self {
        Self {
            key,
            label,
            kind: ParamKind::Float {
                min,
                max,
                step,
                default,
            },
        }
    }

    /// Default integer value. Zero for non-integer parameters.
    #[must_use]
    pub const fn default_u32(&self) -> u32 {
        match self.kind {
            ParamKind::Integer { default, .. } => default,
            _ => 0,
        }
    }

    /// Default float value. Zero for non-float parameters.
    #[must_use]
    pub const fn default_f32(&self) -> f32 {
        match self.kind {
            ParamKind::Float { default, .. } => default,
            _ => 0.0,
        }
    }

    /// Default shape. Rectangle for non-shape parameters.
    #[must_use]
    pub const fn default_shape(&self) -> ElementShape {
        match self.kind {
            ParamKind::Shape { default, .. } => default,
            _ => ElementShape::Rectangle,
        }
    }

    fn check_u32(&self, value: u32) -> Result<(), ConfigError> {
        let ParamKind::Integer { min, max, odd, .. } = self.kind else {
            return Ok(());
        };
        if odd {
            if !(min..=max).contains(&value) {
                return Err(ConfigError::KernelSizeOutOfRange {
                    size: value,
                    min,
                    max,
                });
            }
            if value % 2 == 0 {
                return Err(ConfigError::EvenKernelSize(value));
            }
        } else if !(min..=max).contains(&value) {
            return Err(ConfigError::ParameterOutOfRange {
                name: self.key,
                value: f64::from(value),
                min: f64::from(min),
                max: f64::from(max),
            });
        }
        Ok(())
    }

    fn check_f32(&self, value: f32) -> Result<(), ConfigError> {
        let ParamKind::Float { min, max, .. } = self.kind else {
            return Ok(());
        };
        if value.is_finite() && (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::ParameterOutOfRange {
                name: self.key,
                value: f64::from(value),
                min: f64::from(min),
                max: f64::from(max),
            })
        }
    }

    fn clamp_u32(&self, value: u32, adjustments: &mut Vec<Adjustment>) -> u32 {
        let ParamKind::Integer { min, max, odd, .. } = self.kind else {
            return value;
        };
        let mut clamped = value.clamp(min, max);
        if odd && clamped % 2 == 0 {
            // min and max are odd, so an even value lies strictly inside.
            clamped = if clamped < max { clamped + 1 } else { clamped - 1 };
        }
        if clamped != value {
            adjustments.push(Adjustment {
                key: self.key,
                requested: f64::from(value),
                applied: f64::from(clamped),
            });
        }
        clamped
    }

    fn clamp_f32(&self, value: f32, adjustments: &mut Vec<Adjustment>) -> f32 {
        let ParamKind::Float { min, max, default, .. } = self.kind else {
            return value;
        };
        let clamped = if value.is_finite() {
            value.clamp(min, max)
        } else {
            default
        };
        if clamped.to_bits() != value.to_bits() {
            adjustments.push(Adjustment {
                key: self.key,
                requested: f64::from(value),
                applied: f64::from(clamped),
            });
        }
        clamped
    }
}

/// A parameter that was moved into range by [`OperationConfig::clamped`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Adjustment {
    /// Parameter key.
    pub key: &'static str,
    /// Value as requested.
    pub requested: f64,
    /// Value actually used.
    pub applied: f64,
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.key, self.requested, self.applied)
    }
}

/// The literal value of one parameter, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter (kernel size, diameter).
    Integer(u32),
    /// Floating-point parameter (sigmas).
    Float(f32),
    /// Structuring-element shape.
    Shape(ElementShape),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:.1}"),
            Self::Shape(shape) => f.write_str(shape.label()),
        }
    }
}

const fn default_morphology_shape() -> ElementShape {
    ParamSpec::MORPHOLOGY_SHAPE.default_shape()
}

const fn default_edge_shape() -> ElementShape {
    ParamSpec::EDGE_SHAPE.default_shape()
}

/// The selected operation and its parameters.
///
/// Recreated on every parameter change; it has no identity beyond its
/// value. Serializes as JSON tagged by `family`, e.g.
/// `{"family":"morphology","op":"top-hat","kernel_size":7}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum OperationConfig {
    /// One of the seven grayscale morphology operations.
    Morphology {
        /// Which operation.
        op: MorphologyOp,
        /// Structuring-element side length (odd).
        kernel_size: u32,
        /// Structuring-element shape.
        #[serde(default = "default_morphology_shape")]
        shape: ElementShape,
    },
    /// Edge detection by morphological gradient.
    EdgeDetection {
        /// Structuring-element shape.
        #[serde(default = "default_edge_shape")]
        shape: ElementShape,
        /// Structuring-element side length (odd).
        kernel_size: u32,
    },
    /// One of the four smoothing filters.
    Smoothing {
        /// Which filter, with its parameters.
        filter: SmoothingParams,
    },
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self::default_for(Operation::Erosion)
    }
}

impl OperationConfig {
    /// Config for `operation` with every parameter at its default.
    #[must_use]
    pub const fn default_for(operation: Operation) -> Self {
        let kernel = ParamSpec::SMOOTHING_KERNEL_SIZE.default_u32();
        match operation {
            Operation::Erosion => Self::morphology(MorphologyOp::Erosion),
            Operation::Dilation => Self::morphology(MorphologyOp::Dilation),
            Operation::Opening => Self::morphology(MorphologyOp::Opening),
            Operation::Closing => Self::morphology(MorphologyOp::Closing),
            Operation::Gradient => Self::morphology(MorphologyOp::Gradient),
            Operation::TopHat => Self::morphology(MorphologyOp::TopHat),
            Operation::BlackHat => Self::morphology(MorphologyOp::BlackHat),
            Operation::GradientEdge => Self::EdgeDetection {
                shape: ParamSpec::EDGE_SHAPE.default_shape(),
                kernel_size: ParamSpec::EDGE_KERNEL_SIZE.default_u32(),
            },
            Operation::MeanBlur => Self::Smoothing {
                filter: SmoothingParams::Mean {
                    kernel_size: kernel,
                },
            },
            Operation::GaussianBlur => Self::Smoothing {
                filter: SmoothingParams::Gaussian {
                    kernel_size: kernel,
                    sigma: ParamSpec::GAUSSIAN_SIGMA.default_f32(),
                },
            },
            Operation::MedianBlur => Self::Smoothing {
                filter: SmoothingParams::Median {
                    kernel_size: kernel,
                },
            },
            Operation::BilateralFilter => Self::Smoothing {
                filter: SmoothingParams::Bilateral {
                    diameter: ParamSpec::BILATERAL_DIAMETER.default_u32(),
                    sigma_color: ParamSpec::BILATERAL_SIGMA_COLOR.default_f32(),
                    sigma_space: ParamSpec::BILATERAL_SIGMA_SPACE.default_f32(),
                },
            },
        }
    }

    const fn morphology(op: MorphologyOp) -> Self {
        Self::Morphology {
            op,
            kernel_size: ParamSpec::MORPHOLOGY_KERNEL_SIZE.default_u32(),
            shape: ParamSpec::MORPHOLOGY_SHAPE.default_shape(),
        }
    }

    /// The operation this config selects.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::Morphology { op, .. } => op.operation(),
            Self::EdgeDetection { .. } => Operation::GradientEdge,
            Self::Smoothing { filter } => filter.operation(),
        }
    }

    /// The family of the selected operation.
    #[must_use]
    pub const fn family(&self) -> OperationFamily {
        self.operation().family()
    }

    /// Shape and size of the structuring element this config needs, if
    /// its family uses one.
    #[must_use]
    pub const fn element(&self) -> Option<(ElementShape, u32)> {
        match *self {
            Self::Morphology {
                shape, kernel_size, ..
            }
            | Self::EdgeDetection { shape, kernel_size } => Some((shape, kernel_size)),
            Self::Smoothing { .. } => None,
        }
    }

    /// Literal value of the parameter with the given key, if this
    /// config has one.
    #[must_use]
    pub fn param_value(&self, key: &str) -> Option<ParamValue> {
        match (*self, key) {
            (
                Self::Morphology { kernel_size, .. } | Self::EdgeDetection { kernel_size, .. },
                "kernel_size",
            ) => Some(ParamValue::Integer(kernel_size)),
            (Self::Morphology { shape, .. } | Self::EdgeDetection { shape, .. }, "shape") => {
                Some(ParamValue::Shape(shape))
            }
            (Self::Smoothing { filter }, key) => filter.param_value(key),
            _ => None,
        }
    }

    /// Check every parameter against its [`ParamSpec`].
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Morphology { kernel_size, .. } => {
                ParamSpec::MORPHOLOGY_KERNEL_SIZE.check_u32(kernel_size)
            }
            Self::EdgeDetection { kernel_size, .. } => {
                ParamSpec::EDGE_KERNEL_SIZE.check_u32(kernel_size)
            }
            Self::Smoothing { filter } => match filter {
                SmoothingParams::Mean { kernel_size } | SmoothingParams::Median { kernel_size } => {
                    ParamSpec::SMOOTHING_KERNEL_SIZE.check_u32(kernel_size)
                }
                SmoothingParams::Gaussian { kernel_size, sigma } => {
                    ParamSpec::SMOOTHING_KERNEL_SIZE.check_u32(kernel_size)?;
                    ParamSpec::GAUSSIAN_SIGMA.check_f32(sigma)
                }
                SmoothingParams::Bilateral {
                    diameter,
                    sigma_color,
                    sigma_space,
                } => {
                    ParamSpec::BILATERAL_DIAMETER.check_u32(diameter)?;
                    ParamSpec::BILATERAL_SIGMA_COLOR.check_f32(sigma_color)?;
                    ParamSpec::BILATERAL_SIGMA_SPACE.check_f32(sigma_space)
                }
            },
        }
    }

    /// Clamp every parameter into range.
    ///
    /// Even kernel sizes move to the next odd value (or the previous one
    /// at the top of the range); non-finite floats fall back to their
    /// default. Returns the clamped config and the list of fields that
    /// changed. A config that passes [`validate`](Self::validate) comes
    /// back unchanged with no adjustments.
    #[must_use]
    pub fn clamped(&self) -> (Self, Vec<Adjustment>) {
        let mut adj = Vec::new();
        let config = match *self {
            Self::Morphology {
                op,
                kernel_size,
                shape,
            } => Self::Morphology {
                op,
                kernel_size: ParamSpec::MORPHOLOGY_KERNEL_SIZE.clamp_u32(kernel_size, &mut adj),
                shape,
            },
            Self::EdgeDetection { shape, kernel_size } => Self::EdgeDetection {
                shape,
                kernel_size: ParamSpec::EDGE_KERNEL_SIZE.clamp_u32(kernel_size, &mut adj),
            },
            Self::Smoothing { filter } => Self::Smoothing {
                filter: clamp_smoothing(filter, &mut adj),
            },
        };
        (config, adj)
    }

    /// [`clamped`](Self::clamped), logging a warning for each adjusted
    /// field.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let (config, adjustments) = self.clamped();
        for adjustment in &adjustments {
            log::warn!(
                "{}: clamped out-of-range parameter {adjustment}",
                self.operation(),
            );
        }
        config
    }
}

fn clamp_smoothing(filter: SmoothingParams, adj: &mut Vec<Adjustment>) -> SmoothingParams {
    let kernel = ParamSpec::SMOOTHING_KERNEL_SIZE;
    match filter {
        SmoothingParams::Mean { kernel_size } => SmoothingParams::Mean {
            kernel_size: kernel.clamp_u32(kernel_size, adj),
        },
        SmoothingParams::Gaussian { kernel_size, sigma } => SmoothingParams::Gaussian {
            kernel_size: kernel.clamp_u32(kernel_size, adj),
            sigma: ParamSpec::GAUSSIAN_SIGMA.clamp_f32(sigma, adj),
        },
        SmoothingParams::Median { kernel_size } => SmoothingParams::Median {
            kernel_size: kernel.clamp_u32(kernel_size, adj),
        },
        SmoothingParams::Bilateral {
            diameter,
            sigma_color,
            sigma_space,
        } => SmoothingParams::Bilateral {
            diameter: ParamSpec::BILATERAL_DIAMETER.clamp_u32(diameter, adj),
            sigma_color: ParamSpec::BILATERAL_SIGMA_COLOR.clamp_f32(sigma_color, adj),
            sigma_space: ParamSpec::BILATERAL_SIGMA_SPACE.clamp_f32(sigma_space, adj),
        },
    }
}
