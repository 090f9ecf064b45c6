//! Operation diagnostics: timing and image metrics for a single run.
//!
//! Collected by [`apply_with_diagnostics`], which wraps
//! [`compute_result`](crate::compute_result) with a pluggable [`Clock`]
//! so the core stays free of any particular time source.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::OperationConfig;
use crate::decode;
use crate::edge::edge_pixel_count;
use crate::registry::{Operation, OperationFamily};
use crate::types::{Dimensions, DynamicImage, OperationResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps.
///
/// Hosts supply their own: `std::time::Instant` on native targets,
/// something else where that is unavailable.
pub trait Clock {
    /// Opaque timestamp.
    type Instant;

    /// Current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single operation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDiagnostics {
    /// The operation that ran.
    pub operation: Operation,
    /// Its family.
    pub family: OperationFamily,
    /// Input width in pixels.
    pub width: u32,
    /// Input height in pixels.
    pub height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Whether the input was reduced to grayscale first.
    pub grayscale_converted: bool,
    /// Pixels at or above [`EDGE_THRESHOLD`] in the result, for the
    /// edge detection family.
    pub edge_pixel_count: Option<u64>,
    /// Wall-clock duration of the operation (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Intensity at which a gradient pixel counts as an edge in
/// [`OperationDiagnostics::edge_pixel_count`].
pub const EDGE_THRESHOLD: u8 = 128;

impl OperationDiagnostics {
    /// Diagnostics for `result`, computed from `image` in `duration`.
    ///
    /// For hosts that time the computation themselves, e.g. around a
    /// [`Session`](crate::Session) call.
    #[must_use]
    pub fn for_result(image: &DynamicImage, result: &OperationResult, duration: Duration) -> Self {
        let dimensions = Dimensions::of(image);
        let family = result.description.family;
        let edge_pixel_count = match (family, &result.image) {
            (OperationFamily::EdgeDetection, DynamicImage::ImageLuma8(edges)) => {
                Some(edge_pixel_count(edges, EDGE_THRESHOLD))
            }
            _ => None,
        };

        Self {
            operation: result.description.operation,
            family,
            width: dimensions.width,
            height: dimensions.height,
            pixel_count: dimensions.pixel_count(),
            grayscale_converted: family.is_grayscale() && decode::has_color(image),
            edge_pixel_count,
            duration,
        }
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = vec![
            format!("Operation Diagnostics Report\n{}", "=".repeat(60)),
            format!("Operation: {} ({})", self.operation, self.family),
            format!(
                "Image: {}x{} ({} pixels)",
                self.width, self.height, self.pixel_count,
            ),
            format!(
                "Input: {}",
                if self.grayscale_converted {
                    "converted to grayscale"
                } else {
                    "color"
                },
            ),
            format!("Duration: {:.3}ms", duration_ms(self.duration)),
        ];

        if let Some(edges) = self.edge_pixel_count {
            #[allow(clippy::cast_precision_loss)]
            let density = if self.pixel_count > 0 {
                edges as f64 / self.pixel_count as f64 * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "Edge pixels (>= {EDGE_THRESHOLD}): {edges} ({density:.1}%)"
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Run [`compute_result`](crate::compute_result), timing it with `clock`.
#[must_use = "returns the result and its diagnostics"]
pub fn apply_with_diagnostics<C: Clock>(
    image: &DynamicImage,
    config: &OperationConfig,
    clock: &C,
) -> (OperationResult, OperationDiagnostics) {
    let start = clock.now();
    let result = crate::compute_result(image, config);
    let duration = clock.elapsed(&start);

    let diagnostics = OperationDiagnostics::for_result(image, &result, duration);
    log::debug!(
        "{} on {}x{} took {:.3}ms",
        diagnostics.operation,
        diagnostics.width,
        diagnostics.height,
        duration_ms(duration),
    );
    (result, diagnostics)
}
