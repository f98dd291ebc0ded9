//! Incremental pipeline: advance one recipe step at a time, inspecting
//! each intermediate result before continuing.
//!
//! Unlike [`crate::enhance`], which runs a whole enhancement in one call,
//! [`Pipeline`] lets the caller drive execution:
//!
//! ```rust
//! # use pixelift_pipeline::{EnhanceConfig, EnhanceError, Pipeline};
//! # fn run(png: Vec<u8>) -> Result<(), EnhanceError> {
//! let mut enhancing = Pipeline::new(png, EnhanceConfig::default())
//!     .decode()?
//!     .begin();
//!
//! while let Some(step) = enhancing.next_step().copied() {
//!     println!("{}", step.label());
//!     enhancing.step()?;
//! }
//!
//! let output = enhancing.finish()?.encode()?;
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying the diagnostics gathered
//! so far. [`Enhancing`] is the one stage that advances in place, since
//! it repeats once per recipe step.

use std::time::Duration;

use tracing::debug;
use web_time::Instant;

use crate::diagnostics::{DecodeDiagnostics, EncodeDiagnostics, RunDiagnostics, StepDiagnostics};
use crate::recipe::{Recipe, Step};
use crate::types::{Dimensions, EnhanceConfig, EnhanceError, PixelBuffer};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and config are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
#[derive(Debug)]
pub struct Pending {
    config: EnhanceConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source image and advance to the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::EmptyInput`] if the source bytes are
    /// empty. Returns [`EnhanceError::ImageDecode`] if the image format
    /// is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, EnhanceError> {
        let started = Instant::now();
        let image = crate::codec::decode(&self.source)?;
        let decode = DecodeDiagnostics {
            input_bytes: self.source.len(),
            dimensions: Dimensions::of(&image),
            duration: started.elapsed(),
        };
        debug!(
            input_bytes = decode.input_bytes,
            dimensions = %decode.dimensions,
            "decoded input"
        );
        Ok(Decoded {
            config: self.config,
            image,
            decode,
            started,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image to RGBA.
///
/// Call [`begin`](Self::begin) to start applying the mode's recipe.
#[must_use = "pipeline stages are consumed by advancing; call .begin() to continue"]
#[derive(Debug)]
pub struct Decoded {
    config: EnhanceConfig,
    image: PixelBuffer,
    decode: DecodeDiagnostics,
    started: Instant,
}

impl Decoded {
    /// The decoded image.
    #[must_use]
    pub const fn image(&self) -> &PixelBuffer {
        &self.image
    }

    /// Size of the decoded image.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.decode.dimensions
    }

    /// Build the recipe for the configured mode and advance to the
    /// [`Enhancing`] stage. No step runs yet.
    pub fn begin(self) -> Enhancing {
        let recipe = self.config.mode.recipe(&self.config.general);
        debug!(mode = %self.config.mode, %recipe, "built recipe");
        Enhancing {
            recipe,
            completed: 0,
            current: self.image,
            steps: Vec::new(),
            config: self.config,
            decode: self.decode,
            started: self.started,
        }
    }
}

// ───────────────────────── Stage 2: Enhancing ────────────────────────

/// Pipeline state while recipe steps are being applied.
///
/// Call [`step`](Self::step) repeatedly, or [`finish`](Self::finish) to
/// run whatever remains.
#[must_use = "call .step() or .finish() to apply the recipe"]
#[derive(Debug)]
pub struct Enhancing {
    config: EnhanceConfig,
    recipe: Recipe,
    completed: usize,
    current: PixelBuffer,
    decode: DecodeDiagnostics,
    steps: Vec<StepDiagnostics>,
    started: Instant,
}

impl Enhancing {
    /// The full recipe being applied.
    #[must_use]
    pub const fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// The image after the steps applied so far.
    #[must_use]
    pub const fn current(&self) -> &PixelBuffer {
        &self.current
    }

    /// Number of steps already applied.
    #[must_use]
    pub const fn completed(&self) -> usize {
        self.completed
    }

    /// Number of steps still to run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.recipe.len() - self.completed
    }

    /// The step the next call to [`step`](Self::step) will apply.
    #[must_use]
    pub fn next_step(&self) -> Option<&Step> {
        self.recipe.steps().get(self.completed)
    }

    /// Apply the next recipe step.
    ///
    /// Returns whether any steps remain afterwards. Calling this with no
    /// steps left does nothing and returns `false`.
    ///
    /// # Errors
    ///
    /// Returns the step's [`EnhanceError`]. The current image is left
    /// as it was before the failing step.
    pub fn step(&mut self) -> Result<bool, EnhanceError> {
        let Some(&step) = self.next_step() else {
            return Ok(false);
        };

        let started = Instant::now();
        let input = Dimensions::of(&self.current);
        let next = step.apply(&self.current, self.config.resample_filter)?;
        let diag = StepDiagnostics {
            step,
            input,
            output: Dimensions::of(&next),
            duration: started.elapsed(),
        };
        debug!(
            step = %step,
            output = %diag.output,
            elapsed_ms = diag.duration.as_secs_f64() * 1000.0,
            "applied step"
        );

        self.current = next;
        self.steps.push(diag);
        self.completed += 1;
        Ok(self.remaining() > 0)
    }

    /// Run every remaining step and advance to the [`Enhanced`] stage.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's [`EnhanceError`].
    pub fn finish(mut self) -> Result<Enhanced, EnhanceError> {
        while self.step()? {}
        Ok(Enhanced {
            config: self.config,
            image: self.current,
            decode: self.decode,
            steps: self.steps,
            started: self.started,
        })
    }
}

// ───────────────────────── Stage 3: Enhanced ─────────────────────────

/// Pipeline state after every recipe step has run.
///
/// Call [`encode`](Self::encode) to produce PNG bytes, or
/// [`into_image`](Self::into_image) to keep the raw raster.
#[must_use = "pipeline stages are consumed by advancing; call .encode() to continue"]
#[derive(Debug)]
pub struct Enhanced {
    config: EnhanceConfig,
    image: PixelBuffer,
    decode: DecodeDiagnostics,
    steps: Vec<StepDiagnostics>,
    started: Instant,
}

impl Enhanced {
    /// The enhanced image.
    #[must_use]
    pub const fn image(&self) -> &PixelBuffer {
        &self.image
    }

    /// Size of the enhanced image.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.image)
    }

    /// Diagnostics for the steps applied so far.
    #[must_use]
    pub fn steps(&self) -> &[StepDiagnostics] {
        &self.steps
    }

    /// Take the enhanced raster, skipping encoding.
    #[must_use]
    pub fn into_image(self) -> PixelBuffer {
        self.image
    }

    /// Encode the result as PNG and finish the run.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::Encode`] if PNG encoding fails.
    pub fn encode(self) -> Result<EnhanceOutput, EnhanceError> {
        let started = Instant::now();
        let png = crate::codec::encode_png(&self.image)?;
        let encode = EncodeDiagnostics {
            output_bytes: png.len(),
            duration: started.elapsed(),
        };
        let dimensions = Dimensions::of(&self.image);
        let diagnostics = RunDiagnostics {
            mode: self.config.mode,
            decode: self.decode,
            steps: self.steps,
            encode,
            total_duration: self.started.elapsed(),
        };
        debug!(output_bytes = encode.output_bytes, %dimensions, "encoded output");
        Ok(EnhanceOutput {
            png,
            dimensions,
            source_dimensions: diagnostics.decode.dimensions,
            diagnostics,
        })
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Result of a complete enhancement run.
#[derive(Debug, Clone)]
pub struct EnhanceOutput {
    /// The enhanced image as PNG bytes.
    pub png: Vec<u8>,
    /// Size of the enhanced image.
    pub dimensions: Dimensions,
    /// Size of the decoded input.
    pub source_dimensions: Dimensions,
    /// Timing and size metrics for the run.
    pub diagnostics: RunDiagnostics,
}

impl EnhanceOutput {
    /// The PNG as a `data:image/png;base64,...` URI.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        crate::codec::data_uri(&self.png)
    }

    /// Total wall-clock duration of the run.
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.diagnostics.total_duration
    }
}

/// Incremental enhancement pipeline.
///
/// Created via [`Pipeline::new`], which stores the source image and
/// config without doing any processing. The caller then chains stage
/// methods:
///
/// ```rust
/// # use pixelift_pipeline::{EnhanceConfig, EnhanceError, Pipeline};
/// # fn run(png: Vec<u8>) -> Result<(), EnhanceError> {
/// let output = Pipeline::new(png, EnhanceConfig::default())
///     .decode()?
///     .begin()
///     .finish()?
///     .encode()?;
/// # Ok(())
/// # }
/// ```
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed; call [`.decode()`](Pending::decode)
    /// to begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: EnhanceConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already-decoded raster, skipping the codec.
    pub fn from_buffer(image: PixelBuffer, config: EnhanceConfig) -> Decoded {
        let decode = DecodeDiagnostics {
            input_bytes: image.as_raw().len(),
            dimensions: Dimensions::of(&image),
            duration: Duration::ZERO,
        };
        Decoded {
            config,
            image,
            decode,
            started: Instant::now(),
        }
    }
}
