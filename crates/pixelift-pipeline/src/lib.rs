//! pixelift-pipeline: Pure image enhancement pipeline (sans-IO).
//!
//! Enhances raster images through a mode-specific recipe of pixel
//! filters:
//! denoise -> color -> contrast -> sharpen -> upscale -> sharpen,
//! with extra plate-specific steps for license-plate modes.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Files, terminals, and
//! browser workers live in `pixelift-cli` and `pixelift-worker`.

pub mod buffer;
pub mod codec;
pub mod color;
pub mod contrast;
pub mod denoise;
pub mod diagnostics;
pub mod orchestrator;
pub mod pipeline;
pub mod plate;
pub mod progress;
pub mod recipe;
pub mod resize;
pub mod sharpen;
#[cfg(not(target_arch = "wasm32"))]
pub mod ticker;
pub mod types;

pub use diagnostics::RunDiagnostics;
pub use orchestrator::{Enhancer, RunState};
pub use pipeline::{EnhanceOutput, Pipeline};
pub use progress::{NoProgress, ProgressReporter, ProgressSink, ProgressState, TickSchedule};
pub use recipe::{Recipe, Step};
pub use resize::ResampleFilter;
pub use types::{
    Dimensions, EnhanceConfig, EnhanceError, ErrorKind, GeneralSettings, PipelineMode,
    PixelBuffer,
};

/// Run a full enhancement on encoded image bytes.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration,
/// then returns the enhanced image as PNG along with its dimensions and
/// run diagnostics. No progress is reported; use [`Enhancer`] for that.
///
/// # Errors
///
/// Returns [`EnhanceError::EmptyInput`] if `image_bytes` is empty,
/// [`EnhanceError::ImageDecode`] if the image format is unrecognized,
/// and the failing step's error if a filter or the encoder fails.
pub fn enhance(image_bytes: &[u8], config: &EnhanceConfig) -> Result<EnhanceOutput, EnhanceError> {
    Pipeline::new(image_bytes.to_vec(), config.clone())
        .decode()?
        .begin()
        .finish()?
        .encode()
}

/// Run the configured recipe on an already-decoded raster.
///
/// # Errors
///
/// Returns the failing step's error.
pub fn enhance_buffer(
    image: PixelBuffer,
    config: &EnhanceConfig,
) -> Result<PixelBuffer, EnhanceError> {
    Ok(Pipeline::from_buffer(image, config.clone())
        .begin()
        .finish()?
        .into_image())
}
