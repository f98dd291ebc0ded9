//! pixelift: command-line front end for the enhancement pipeline.
//!
//! Reads an image file, runs one enhancement with a live progress line
//! on stderr, writes the PNG result, and prints the run diagnostics.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixelift -- [OPTIONS] <INPUT>
//! ```
//!
//! Set `RUST_LOG=debug` to see per-step timing events.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use pixelift_pipeline::{
    EnhanceConfig, EnhanceOutput, Enhancer, GeneralSettings, PipelineMode, ProgressSink,
    ProgressState, ResampleFilter,
};
use tracing_subscriber::EnvFilter;

/// Enhance a photo or license-plate image: denoise, color, contrast,
/// sharpen, and upscale.
#[derive(Parser)]
#[command(name = "pixelift", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Where to write the enhanced PNG.
    ///
    /// Defaults to `<INPUT stem>.enhanced.png` next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Which filter recipe to run.
    #[arg(long, value_enum, default_value_t = Mode::General)]
    mode: Mode,

    /// Sharpening strength (0.0-1.0). General mode only.
    #[arg(long, default_value_t = GeneralSettings::DEFAULT_SHARPNESS)]
    sharpness: f32,

    /// Noise reduction strength (0.0-1.0). General mode only.
    #[arg(long, default_value_t = GeneralSettings::DEFAULT_NOISE_REDUCTION)]
    noise_reduction: f32,

    /// Texture preservation (0.0-1.0); drives the color boost. General
    /// mode only.
    #[arg(long, default_value_t = GeneralSettings::DEFAULT_TEXTURE_PRESERVATION)]
    texture_preservation: f32,

    /// Contrast enhancement strength (0.0-1.0). General mode only.
    #[arg(long, default_value_t = GeneralSettings::DEFAULT_CONTRAST_ENHANCEMENT)]
    contrast_enhancement: f32,

    /// Integer upscale factor, clamped to 2-16. General mode only.
    #[arg(long, default_value_t = GeneralSettings::DEFAULT_UPSCALING_FACTOR)]
    upscale: u32,

    /// Skip the color boost step. General mode only.
    #[arg(long)]
    no_color_correction: bool,

    /// Resampling filter for the upscale step.
    #[arg(long, value_enum, default_value_t = Filter::CatmullRom)]
    filter: Filter,

    /// Full enhancement config as a JSON string.
    ///
    /// When provided, all other enhancement flags are ignored. Missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Disable the decorative progress ticker; progress then moves only
    /// when a step finishes.
    #[arg(long)]
    no_ticker: bool,

    /// Print the result as a `data:image/png;base64,...` URI on stdout.
    /// Diagnostics then go to stderr.
    #[arg(long)]
    data_uri: bool,
}

/// Recipe selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// General photo enhancement.
    General,
    /// License plate, x3 upscale.
    #[value(name = "plate-standard")]
    PlateStandard,
    /// License plate with edge boosting, x4 upscale.
    #[value(name = "plate-advanced")]
    PlateAdvanced,
}

impl From<Mode> for PipelineMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::General => Self::General,
            Mode::PlateStandard => Self::LicensePlateStandard,
            Mode::PlateAdvanced => Self::LicensePlateAdvanced,
        }
    }
}

/// Upscale resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Bicubic Catmull-Rom (moderate, good quality).
    CatmullRom,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
    /// Gaussian (moderate, smooth).
    Gaussian,
    /// Bilinear interpolation (fast, slightly soft).
    Triangle,
}

impl From<Filter> for ResampleFilter {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Lanczos3 => Self::Lanczos3,
            Filter::Gaussian => Self::Gaussian,
            Filter::Triangle => Self::Triangle,
        }
    }
}

/// Build an [`EnhanceConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual enhancement flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<EnhanceConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(EnhanceConfig {
        mode: cli.mode.into(),
        general: GeneralSettings {
            sharpness: cli.sharpness,
            noise_reduction: cli.noise_reduction,
            color_correction: !cli.no_color_correction,
            texture_preservation: cli.texture_preservation,
            contrast_enhancement: cli.contrast_enhancement,
            upscaling_factor: cli.upscale,
        },
        resample_filter: cli.filter.into(),
    })
}

/// Default output path: `photo.jpg` becomes `photo.enhanced.png`.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    input.with_file_name(format!("{stem}.enhanced.png"))
}

/// Progress sink that redraws a single status line on stderr.
fn progress_line() -> Arc<dyn ProgressSink> {
    Arc::new(|state: &ProgressState| {
        let mut stderr = std::io::stderr().lock();
        // A broken stderr must not abort the run.
        let _ = write!(
            stderr,
            "\r{:>5.1}%  {:<28}",
            state.percentage, state.stage_label
        );
        let _ = stderr.flush();
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_diagnostics(output: &EnhanceOutput, json: bool, to_stderr: bool) -> Result<(), String> {
    let text = if json {
        serde_json::to_string_pretty(&output.diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?
    } else {
        output.diagnostics.report()
    };
    if to_stderr {
        eprintln!("{text}");
    } else {
        println!("{text}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.input) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(?config, "resolved config");

    eprintln!(
        "Image: {} ({} bytes)",
        cli.input.display(),
        image_bytes.len(),
    );
    eprintln!("Mode: {}", config.mode);
    eprintln!("Recipe: {}", config.mode.recipe(&config.general));

    let mut enhancer = Enhancer::new(config);
    if !cli.no_ticker {
        enhancer = enhancer.with_mode_ticker();
    }

    let result = enhancer.run(&image_bytes, progress_line());
    eprintln!();

    let output = match result {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Enhancement failed ({:?}): {e}", e.kind());
            return ExitCode::FAILURE;
        }
    };

    if cli.output.is_some() || !cli.data_uri {
        let path = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output(&cli.input));
        if let Err(e) = std::fs::write(&path, &output.png) {
            eprintln!("Error writing {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
        eprintln!(
            "Wrote {} ({} -> {}, {} bytes)",
            path.display(),
            output.source_dimensions,
            output.dimensions,
            output.png.len(),
        );
    }

    if cli.data_uri {
        println!("{}", output.to_data_uri());
    }

    if let Err(msg) = print_diagnostics(&output, cli.json, cli.data_uri) {
        eprintln!("{msg}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
