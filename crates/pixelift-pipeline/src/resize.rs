//! Smooth resampling to a scaled size.
//!
//! Scales an image by a positive factor so the output is
//! `round(w * f) x round(h * f)`, using a smooth interpolating filter
//! from the `image` crate. Nearest-neighbor is deliberately not offered:
//! upscaled plates and photos would come out blocky.

use std::fmt;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::{EnhanceError, PixelBuffer};

/// Label used for resize failures.
const STEP: &str = "Upscaling";

/// Longest output side, matching the largest canvas browsers accept.
pub const MAX_OUTPUT_SIDE: u32 = 32_767;

/// Largest output area in pixels (16384 x 16384, 1 GiB of RGBA).
pub const MAX_OUTPUT_PIXELS: u64 = 16_384 * 16_384;

/// Resampling filter used when resizing.
///
/// Ordered from fastest to slowest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    /// Bilinear interpolation: fast, slightly soft.
    Triangle,
    /// Bicubic (Catmull-Rom): good quality for upscaling.
    #[default]
    CatmullRom,
    /// Gaussian: smooth, softer than bicubic.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Output dimensions for scaling `width x height` by `factor`.
///
/// Each side is `round(side * factor)`, at least 1.
///
/// # Errors
///
/// Returns [`EnhanceError::Filter`] if `factor` is not a positive finite
/// number, and [`EnhanceError::Surface`] if either side exceeds
/// [`MAX_OUTPUT_SIDE`] or the area exceeds [`MAX_OUTPUT_PIXELS`].
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn scaled_dimensions(width: u32, height: u32, factor: f64) -> Result<(u32, u32), EnhanceError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(EnhanceError::filter(
            STEP,
            format!("scale factor must be positive and finite, got {factor}"),
        ));
    }

    let w = (f64::from(width) * factor).round().max(1.0);
    let h = (f64::from(height) * factor).round().max(1.0);
    let limit = f64::from(MAX_OUTPUT_SIDE);
    if w > limit || h > limit {
        return Err(EnhanceError::Surface(format!(
            "{w}x{h} exceeds the maximum side of {MAX_OUTPUT_SIDE} pixels"
        )));
    }

    let (w, h) = (w as u32, h as u32);
    let pixels = u64::from(w) * u64::from(h);
    if pixels > MAX_OUTPUT_PIXELS {
        return Err(EnhanceError::Surface(format!(
            "{w}x{h} is {pixels} pixels, more than the {MAX_OUTPUT_PIXELS} pixel limit"
        )));
    }
    Ok((w, h))
}

/// Resize `image` by `factor` with the given resampling filter.
///
/// A factor that leaves the dimensions unchanged returns a copy without
/// resampling.
///
/// # Errors
///
/// See [`scaled_dimensions`].
pub fn resize(
    image: &PixelBuffer,
    factor: f64,
    filter: ResampleFilter,
) -> Result<PixelBuffer, EnhanceError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(EnhanceError::filter(STEP, "input image has no pixels"));
    }

    let (w, h) = scaled_dimensions(image.width(), image.height(), factor)?;
    if (w, h) == image.dimensions() {
        return Ok(image.clone());
    }

    Ok(image::imageops::resize(
        image,
        w,
        h,
        filter.to_image_filter(),
    ))
}
