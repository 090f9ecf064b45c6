//! morphoscope: apply one classical image operation and write a
//! before/after comparison.
//!
//! Loads an image, applies the selected morphology, edge detection, or
//! smoothing operation, writes the original and the result side by side
//! as a PNG, and prints what was computed. Useful for:
//!
//! - Seeing how the structuring-element shape changes a morphology result
//! - Comparing smoothing filters and their parameters on the same input
//! - Dumping the parameter catalog a UI would build its widgets from
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin morphoscope -- [OPTIONS] <IMAGE_PATH>
//! cargo run --release --bin morphoscope -- --catalog
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use image::{DynamicImage, RgbImage};
use morphoscope_pipeline::diagnostics::{Clock, OperationDiagnostics};
use morphoscope_pipeline::{
    ElementShape, Operation, OperationConfig, OperationResult, Session, SessionError,
    SmoothingParams,
};

/// Before/after explorer for classical image operations.
///
/// Applies one morphology, edge detection, or smoothing operation to an
/// image and writes the original and the result side by side.
#[derive(Parser)]
#[command(name = "morphoscope", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(required_unless_present = "catalog")]
    image_path: Option<PathBuf>,

    /// Operation to apply, by label or identifier (e.g. "Top Hat",
    /// top-hat, gaussian-blur).
    #[arg(long, short, default_value = "erosion")]
    operation: String,

    /// Kernel (structuring element) size. Must be odd.
    #[arg(long, short)]
    kernel_size: Option<u32>,

    /// Structuring-element shape for morphology and edge detection.
    #[arg(long, value_enum)]
    shape: Option<Shape>,

    /// Gaussian blur sigma.
    #[arg(long)]
    sigma: Option<f32>,

    /// Bilateral filter diameter.
    #[arg(long)]
    diameter: Option<u32>,

    /// Bilateral filter intensity sigma.
    #[arg(long)]
    sigma_color: Option<f32>,

    /// Bilateral filter spatial sigma.
    #[arg(long)]
    sigma_space: Option<f32>,

    /// Full operation config as a JSON string.
    ///
    /// When provided, `--operation` and all parameter flags are ignored.
    /// The JSON must be a valid `OperationConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Where to write the comparison PNG. Defaults to
    /// `<image stem>-<operation>.png` next to the input.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Write only the result image instead of the side-by-side comparison.
    #[arg(long)]
    result_only: bool,

    /// Print the description (and diagnostics) as JSON.
    #[arg(long)]
    json: bool,

    /// Time the operation and print diagnostics.
    #[arg(long)]
    diagnostics: bool,

    /// Print the operation catalog as JSON and exit.
    #[arg(long)]
    catalog: bool,
}

/// Structuring-element shape selection.
#[derive(Clone, Copy, ValueEnum)]
enum Shape {
    /// All cells set (8-connectivity).
    Rectangle,
    /// Center row and column (4-connectivity).
    Cross,
    /// Ellipse inscribed in the square.
    Ellipse,
    /// Manhattan-distance diamond.
    Diamond,
}

impl From<Shape> for ElementShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Rectangle => Self::Rectangle,
            Shape::Cross => Self::Cross,
            Shape::Ellipse => Self::Ellipse,
            Shape::Diamond => Self::Diamond,
        }
    }
}

/// Build an [`OperationConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise the operation's
/// defaults are overridden by whichever flags were given.
fn config_from_cli(cli: &Cli) -> Result<OperationConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let operation: Operation = cli.operation.parse().map_err(|e| format!("{e}"))?;
    warn_ignored_flags(cli, operation);

    let config = match OperationConfig::default_for(operation) {
        OperationConfig::Morphology {
            op,
            kernel_size,
            shape,
        } => OperationConfig::Morphology {
            op,
            kernel_size: cli.kernel_size.unwrap_or(kernel_size),
            shape: cli.shape.map_or(shape, ElementShape::from),
        },
        OperationConfig::EdgeDetection { shape, kernel_size } => OperationConfig::EdgeDetection {
            shape: cli.shape.map_or(shape, ElementShape::from),
            kernel_size: cli.kernel_size.unwrap_or(kernel_size),
        },
        OperationConfig::Smoothing { filter } => OperationConfig::Smoothing {
            filter: smoothing_from_cli(cli, filter),
        },
    };
    Ok(config)
}

fn smoothing_from_cli(cli: &Cli, defaults: SmoothingParams) -> SmoothingParams {
    match defaults {
        SmoothingParams::Mean { kernel_size } => SmoothingParams::Mean {
            kernel_size: cli.kernel_size.unwrap_or(kernel_size),
        },
        SmoothingParams::Gaussian { kernel_size, sigma } => SmoothingParams::Gaussian {
            kernel_size: cli.kernel_size.unwrap_or(kernel_size),
            sigma: cli.sigma.unwrap_or(sigma),
        },
        SmoothingParams::Median { kernel_size } => SmoothingParams::Median {
            kernel_size: cli.kernel_size.unwrap_or(kernel_size),
        },
        SmoothingParams::Bilateral {
            diameter,
            sigma_color,
            sigma_space,
        } => SmoothingParams::Bilateral {
            diameter: cli.diameter.unwrap_or(diameter),
            sigma_color: cli.sigma_color.unwrap_or(sigma_color),
            sigma_space: cli.sigma_space.unwrap_or(sigma_space),
        },
    }
}

/// Warn about parameter flags the selected operation does not take.
fn warn_ignored_flags(cli: &Cli, operation: Operation) {
    let given = [
        ("kernel_size", cli.kernel_size.is_some()),
        ("shape", cli.shape.is_some()),
        ("sigma", cli.sigma.is_some()),
        ("diameter", cli.diameter.is_some()),
        ("sigma_color", cli.sigma_color.is_some()),
        ("sigma_space", cli.sigma_space.is_some()),
    ];
    for (key, present) in given {
        if present && !operation.params().iter().any(|p| p.key == key) {
            log::warn!("--{} is ignored by {operation}", key.replace('_', "-"));
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.catalog {
        return match print_json(&morphoscope_pipeline::catalog()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error serializing catalog: {e}");
                ExitCode::FAILURE
            }
        };
    }
    let Some(ref image_path) = cli.image_path else {
        eprintln!("An image path is required");
        return ExitCode::FAILURE;
    };

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:?}");
    eprintln!();

    let image = match morphoscope_pipeline::decode::decode(&image_bytes) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{}: {e}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let mut session = Session::with_config(config);
    let clock = cli.diagnostics.then_some(&StdClock);
    let (result, diagnostics) = match run(&mut session, image, clock) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        let value = serde_json::json!({
            "description": result.description,
            "diagnostics": diagnostics,
        });
        if let Err(e) = print_json(&value) {
            eprintln!("Error serializing result: {e}");
            return ExitCode::FAILURE;
        }
    } else {
        println!("{}", result.description.report());
        if let Some(ref diag) = diagnostics {
            println!();
            println!("{}", diag.report());
        }
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(image_path, result.description.operation));
    write_image(&cli, &session, &result, &output)
}

/// Load `image` into `session` and compute its result once, timing the
/// computation with `clock` when one is given.
fn run<C: Clock>(
    session: &mut Session,
    image: DynamicImage,
    clock: Option<&C>,
) -> Result<(OperationResult, Option<OperationDiagnostics>), SessionError> {
    let start = clock.map(C::now);
    let result = match session.load_image(image) {
        Some(result) => result,
        None => session.apply()?,
    };
    let diagnostics = match (clock, start, session.image()) {
        (Some(clock), Some(start), Some(original)) => Some(OperationDiagnostics::for_result(
            original,
            &result,
            clock.elapsed(&start),
        )),
        _ => None,
    };
    Ok((result, diagnostics))
}

/// Write the comparison (or, with `--result-only`, just the result) to
/// `output`.
fn write_image(cli: &Cli, session: &Session, result: &OperationResult, output: &Path) -> ExitCode {
    let written = if cli.result_only {
        result.image.to_rgb8().save(output)
    } else {
        session
            .image()
            .map_or(Ok(()), |original| side_by_side(original, result).save(output))
    };
    match written {
        Ok(()) => {
            eprintln!("Wrote {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error writing {}: {e}", output.display());
            ExitCode::FAILURE
        }
    }
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// `<dir>/<stem>-<operation>.png` for the input at `image_path`.
fn default_output_path(image_path: &Path, operation: Operation) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    image_path.with_file_name(format!("{stem}-{}.png", operation.slug()))
}

/// Original on the left, result on the right, both as RGB.
fn side_by_side(original: &image::DynamicImage, result: &OperationResult) -> RgbImage {
    let left = original.to_rgb8();
    let right = result.image.to_rgb8();
    let mut canvas = RgbImage::new(
        left.width() + right.width(),
        left.height().max(right.height()),
    );
    image::imageops::replace(&mut canvas, &left, 0, 0);
    image::imageops::replace(&mut canvas, &right, i64::from(left.width()), 0);
    canvas
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
