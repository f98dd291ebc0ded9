//! Shared types for the pixelift enhancement pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resize::ResampleFilter;

/// Re-export `RgbaImage` so downstream crates can reference raster data
/// without depending on `image` directly.
pub use image::RgbaImage;

/// Working raster for every filter: width x height RGBA8, row-major,
/// top-left origin.
pub type PixelBuffer = RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing buffer.
    #[must_use]
    pub fn of(image: &PixelBuffer) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Clamp a filter strength into `[0, 1]`.
///
/// Out-of-range strengths are clamped rather than rejected. `NaN` is
/// treated as zero strength.
#[must_use]
pub fn clamp_strength(strength: f32) -> f32 {
    if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    }
}

/// Which fixed filter sequence a run applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// General photo enhancement driven by [`GeneralSettings`].
    #[default]
    General,
    /// License-plate enhancement with a fixed x3 upscale.
    #[serde(alias = "standard")]
    LicensePlateStandard,
    /// License-plate enhancement with local-contrast edge boosting and a
    /// fixed x4 upscale.
    #[serde(alias = "advanced")]
    LicensePlateAdvanced,
}

impl fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str("general"),
            Self::LicensePlateStandard => f.write_str("plate-standard"),
            Self::LicensePlateAdvanced => f.write_str("plate-advanced"),
        }
    }
}

/// User-tunable settings for [`PipelineMode::General`].
///
/// License-plate modes ignore these and use fixed strengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Sharpen strength before upscaling. The post-upscale pass uses
    /// 60% of this.
    pub sharpness: f32,

    /// Bilateral denoise strength.
    pub noise_reduction: f32,

    /// Whether the HSL saturation/lightness pass runs at all.
    pub color_correction: bool,

    /// Drives the saturation pass: its strength is
    /// `texture_preservation * 0.7`.
    pub texture_preservation: f32,

    /// Adaptive histogram contrast strength.
    pub contrast_enhancement: f32,

    /// Integer upscale factor, clamped into
    /// [`MIN_UPSCALING_FACTOR`](Self::MIN_UPSCALING_FACTOR)..=[`MAX_UPSCALING_FACTOR`](Self::MAX_UPSCALING_FACTOR).
    pub upscaling_factor: u32,
}

impl GeneralSettings {
    /// Smallest accepted general-mode upscale factor.
    pub const MIN_UPSCALING_FACTOR: u32 = 2;
    /// Largest accepted general-mode upscale factor.
    pub const MAX_UPSCALING_FACTOR: u32 = 16;

    /// Default sharpen strength.
    pub const DEFAULT_SHARPNESS: f32 = 0.95;
    /// Default denoise strength.
    pub const DEFAULT_NOISE_REDUCTION: f32 = 0.8;
    /// Default texture preservation.
    pub const DEFAULT_TEXTURE_PRESERVATION: f32 = 0.9;
    /// Default contrast strength.
    pub const DEFAULT_CONTRAST_ENHANCEMENT: f32 = 0.8;
    /// Default upscale factor.
    pub const DEFAULT_UPSCALING_FACTOR: u32 = 4;

    /// The upscale factor after clamping into the accepted range.
    #[must_use]
    pub fn effective_upscaling_factor(&self) -> u32 {
        self.upscaling_factor
            .clamp(Self::MIN_UPSCALING_FACTOR, Self::MAX_UPSCALING_FACTOR)
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            sharpness: Self::DEFAULT_SHARPNESS,
            noise_reduction: Self::DEFAULT_NOISE_REDUCTION,
            color_correction: true,
            texture_preservation: Self::DEFAULT_TEXTURE_PRESERVATION,
            contrast_enhancement: Self::DEFAULT_CONTRAST_ENHANCEMENT,
            upscaling_factor: Self::DEFAULT_UPSCALING_FACTOR,
        }
    }
}

/// Configuration for one enhancement run.
///
/// Every field has a default, so partial JSON such as
/// `{"mode": "license_plate_advanced"}` deserializes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Which filter sequence to run.
    pub mode: PipelineMode,

    /// Settings used by [`PipelineMode::General`].
    pub general: GeneralSettings,

    /// Resampling filter used by upscale steps.
    pub resample_filter: ResampleFilter,
}

impl EnhanceConfig {
    /// Default configuration for the given mode.
    #[must_use]
    pub fn for_mode(mode: PipelineMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// The coarse failure categories surfaced to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The input bytes could not be decoded into an image.
    DecodeFailure,
    /// A drawing surface (output raster or encoder) was unavailable.
    ContextAcquisitionFailure,
    /// A filter could not run on its input.
    FilterFailure,
}

/// Errors that can occur during an enhancement run.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// An output raster of the requested size cannot be allocated.
    #[error("drawing surface unavailable: {0}")]
    Surface(String),

    /// A filter step rejected its input.
    #[error("{step} failed: {reason}")]
    Filter {
        /// Label of the failing step.
        step: String,
        /// What was wrong with the input.
        reason: String,
    },

    /// The final image could not be encoded.
    #[error("failed to encode output image: {0}")]
    Encode(String),

    /// The configuration could not be parsed or is unusable.
    #[error("invalid enhancement configuration: {0}")]
    InvalidConfig(String),
}

impl EnhanceError {
    /// Build a [`EnhanceError::Filter`] for the named step.
    pub fn filter(step: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Filter {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// The user-facing category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageDecode(_) | Self::EmptyInput => ErrorKind::DecodeFailure,
            Self::Surface(_) | Self::Encode(_) => ErrorKind::ContextAcquisitionFailure,
            Self::Filter { .. } | Self::InvalidConfig(_) => ErrorKind::FilterFailure,
        }
    }
}

/// Serde-compatible proxy for `EnhanceError`.
#[derive(Serialize, Deserialize)]
enum EnhanceErrorProxy {
    ImageDecode(String),
    EmptyInput,
    Surface(String),
    Filter { step: String, reason: String },
    Encode(String),
    InvalidConfig(String),
}

impl Serialize for EnhanceError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => EnhanceErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => EnhanceErrorProxy::EmptyInput,
            Self::Surface(s) => EnhanceErrorProxy::Surface(s.clone()),
            Self::Filter { step, reason } => EnhanceErrorProxy::Filter {
                step: step.clone(),
                reason: reason.clone(),
            },
            Self::Encode(s) => EnhanceErrorProxy::Encode(s.clone()),
            Self::InvalidConfig(s) => EnhanceErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EnhanceError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = EnhanceErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed decoder error cannot be rebuilt; keep its message
            // under an unknown-format hint so `kind()` is preserved.
            EnhanceErrorProxy::ImageDecode(msg) => {
                Self::ImageDecode(image::ImageError::Decoding(image::error::DecodingError::new(
                    image::error::ImageFormatHint::Unknown,
                    msg,
                )))
            }
            EnhanceErrorProxy::EmptyInput => Self::EmptyInput,
            EnhanceErrorProxy::Surface(s) => Self::Surface(s),
            EnhanceErrorProxy::Filter { step, reason } => Self::Filter { step, reason },
            EnhanceErrorProxy::Encode(s) => Self::Encode(s),
            EnhanceErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
