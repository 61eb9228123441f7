//! graystep-bench: CLI tool for running step lists on image files.
//!
//! Decodes an image, applies an ordered list of steps with the native
//! executor, and prints the per-step report. Useful for:
//!
//! - Checking how step order changes the result
//! - Measuring per-step durations on real images
//! - Producing converted PNGs outside the browser
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin graystep-bench -- [OPTIONS] <IMAGE_PATH>
//! cargo run --bin graystep-bench -- img.tif \
//!     --step hot-pixel:low=0.5,high=99.5 --step gaussian:sigma=1.5
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logger;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use futures::executor::block_on;
use graystep_pipeline::{
    AlgorithmStep, AxisConfig, AxisUnit, ConversionPipeline, Image, NativeExecutor, NoPacing,
    RunReport, SampleSlice, SampleView, StepField, StepKind, StepList, StepOutcome, TARGET_TICKS,
    to_grid,
};

/// Run graystep step lists on image files.
///
/// Steps are applied in the order given. Each `--step` takes a kind and
/// optional `field=value` overrides, e.g. `linear:a=2,b=10`.
#[derive(Parser)]
#[command(name = "graystep-bench", version)]
struct Cli {
    /// Path to the input image (TIFF, PNG, JPEG).
    image_path: PathBuf,

    /// A step, as `KIND[:FIELD=VALUE,...]`. Kinds: hot-pixel, gaussian,
    /// median, linear. Fields: low, high, sigma, radius, a, b.
    #[arg(long = "step", value_parser = parse_step)]
    steps: Vec<AlgorithmStep>,

    /// Full step list as a JSON array.
    ///
    /// When provided, `--step` flags are ignored.
    #[arg(long)]
    steps_json: Option<String>,

    /// Write the converted image as PNG at its native bit depth.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    runs: usize,

    /// Print axis extents in millimeters using this many mm per pixel.
    #[arg(long)]
    mm_per_px: Option<f64>,

    /// Output the run report as JSON instead of a table.
    #[arg(long)]
    json: bool,

    /// Suppress progress lines.
    #[arg(long)]
    quiet: bool,
}

/// Parse `KIND[:FIELD=VALUE,...]` into an enabled step.
fn parse_step(text: &str) -> Result<AlgorithmStep, String> {
    let (kind_text, fields_text) = text.split_once(':').unwrap_or((text, ""));
    let kind = match kind_text.trim().to_ascii_lowercase().as_str() {
        "hot-pixel" | "hot-pixel-removal" => StepKind::HotPixelRemoval,
        "gaussian" | "gaussian-blur" => StepKind::GaussianBlur,
        "median" | "median-blur" => StepKind::MedianBlur,
        "linear" | "linear-transform" => StepKind::LinearTransform,
        other => return Err(format!("unknown step kind {other:?}")),
    };

    let mut step = AlgorithmStep::create_default(kind);
    for pair in fields_text.split(',').filter(|p| !p.trim().is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got {pair:?}"))?;
        let field = parse_field(kind, name.trim())?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|e| format!("bad value for {name}: {e}"))?;
        step.set_field(field, value).map_err(|e| e.to_string())?;
    }
    Ok(step)
}

fn parse_field(kind: StepKind, name: &str) -> Result<StepField, String> {
    let field = match name.to_ascii_lowercase().as_str() {
        "low" => StepField::LowPercentile,
        "high" => StepField::HighPercentile,
        "sigma" => StepField::Sigma,
        "radius" => StepField::KernelRadius,
        "a" => StepField::A,
        "b" => StepField::B,
        _ => return Err(format!("unknown field {name:?}")),
    };
    if kind.fields().contains(&field) {
        Ok(field)
    } else {
        Err(format!("{kind} has no field {name:?}"))
    }
}

/// Build the step list from CLI arguments.
fn steps_from_cli(cli: &Cli) -> Result<StepList, String> {
    if let Some(ref json) = cli.steps_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --steps-json: {e}"));
    }
    Ok(StepList::from(cli.steps.clone()))
}

fn main() -> ExitCode {
    logger::init();
    let cli = Cli::parse();

    let steps = match steps_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    let source = match graystep_pipeline::decode_bytes(&image_bytes) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Decode error: {e}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes, {}x{}, {})",
        cli.image_path.display(),
        image_bytes.len(),
        source.width(),
        source.height(),
        source.bit_depth(),
    );
    for (i, step) in steps.steps().iter().enumerate() {
        let state = if step.enabled { "" } else { " (disabled)" };
        eprintln!("Step {}: {:?}{state}", i + 1, step.params);
    }
    eprintln!();

    let pipeline = ConversionPipeline::new(NativeExecutor, NoPacing);
    let mut reports = Vec::with_capacity(cli.runs);
    let mut converted = source.clone();

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let mut image = source.clone();
        let quiet = cli.quiet;
        let outcome = block_on(pipeline.run(&mut image, steps.steps(), |event| {
            if !quiet {
                eprintln!("[{:>3}%] {}", event.percent, event.label());
            }
        }))
        .map(graystep_pipeline::ConvertedSamples::into_report);

        match outcome {
            Ok(report) => {
                if let Err(msg) = print_report(&report, cli.json) {
                    eprintln!("{msg}");
                    return ExitCode::FAILURE;
                }
                reports.push(report);
                converted = image;
            }
            Err(failure) => {
                eprintln!("Pipeline error: {}", failure.error);
                // Print whatever ran so the failing step is visible.
                if let Err(msg) = print_report(&failure.report, cli.json) {
                    eprintln!("{msg}");
                }
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&reports);
    }

    print_axes(&converted.view(), cli.mm_per_px);

    if let Some(ref path) = cli.output
        && let Err(msg) = write_png(&converted, path)
    {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print one run's report as a table or JSON.
fn print_report(report: &RunReport, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(report)
            .map_err(|e| format!("Error serializing report: {e}"))?;
        println!("{text}");
        return Ok(());
    }

    println!("{:<4} {:<20} {:>12}", "#", "Step", "Duration");
    println!("{}", "-".repeat(38));
    for (i, record) in report.steps.iter().enumerate() {
        let cell = match &record.outcome {
            StepOutcome::Succeeded { duration } => {
                format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
            }
            StepOutcome::Failed { message } => format!("failed: {message}"),
            StepOutcome::NotAttempted => "not run".to_owned(),
        };
        println!("{:<4} {:<20} {cell:>12}", i + 1, record.name());
    }
    println!(
        "{:<25} {:>10.3}ms",
        "Total",
        report.total.as_secs_f64() * 1000.0
    );
    Ok(())
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(reports: &[RunReport]) {
    println!();
    println!("Summary ({} runs)\n{}", reports.len(), "=".repeat(40));
    if reports.is_empty() {
        return;
    }

    let totals: Vec<f64> = reports
        .iter()
        .map(|r| r.total.as_secs_f64() * 1000.0)
        .collect();
    let min = totals.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = totals.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = totals.iter().sum::<f64>() / totals.len() as f64;
    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<4} {:<20} {:>12}", "#", "Step", "Mean (ms)");
    let step_count = reports.first().map_or(0, |r| r.steps.len());
    for i in 0..step_count {
        let durations: Vec<f64> = reports
            .iter()
            .filter_map(|r| r.steps.get(i))
            .filter_map(|s| match s.outcome {
                StepOutcome::Succeeded { duration } => Some(duration.as_secs_f64() * 1000.0),
                _ => None,
            })
            .collect();
        if durations.is_empty() {
            continue;
        }
        let name = reports[0].steps[i].name();
        let step_mean = durations.iter().sum::<f64>() / durations.len() as f64;
        println!("{:<4} {name:<20} {step_mean:>10.3}ms", i + 1);
    }
}

/// Print axis extents and ticks as the viewer would show them.
fn print_axes(view: &SampleView<'_>, mm_per_px: Option<f64>) {
    let axis = mm_per_px.map_or_else(AxisConfig::default, |scale| AxisConfig {
        unit: AxisUnit::Millimeters,
        scale,
    });
    let grid = to_grid(Some(view), &axis, |aspect| {
        tracing::debug!(aspect, "aspect ratio");
    });
    for a in [&grid.x_axis, &grid.y_axis] {
        let ticks: Vec<String> = a
            .ticks(TARGET_TICKS)
            .iter()
            .map(|t| format!("{t}"))
            .collect();
        eprintln!("{}: 0..{} ticks [{}]", a.title, a.max, ticks.join(", "));
    }
    eprintln!(
        "Intensity range: {}..{} (aspect {:.3})",
        grid.z_range.min, grid.z_range.max, grid.aspect_ratio
    );
}

/// Encode samples as a grayscale PNG of the same depth.
fn write_png(image: &Image, path: &Path) -> Result<(), String> {
    let view = image.view();
    let (width, height) = (view.width(), view.height());
    let dynamic = match view.samples() {
        SampleSlice::U8(data) => image::GrayImage::from_raw(width, height, data.to_vec())
            .map(image::DynamicImage::ImageLuma8),
        SampleSlice::U16(data) => {
            image::ImageBuffer::<image::Luma<u16>, _>::from_raw(width, height, data.to_vec())
                .map(image::DynamicImage::ImageLuma16)
        }
    }
    .ok_or_else(|| "Error building output image: buffer size mismatch".to_owned())?;

    dynamic
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("PNG written to {} ({})", path.display(), view.bit_depth());
    Ok(())
}
