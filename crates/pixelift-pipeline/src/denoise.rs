//! Edge-preserving bilateral denoise.
//!
//! Each interior pixel is replaced by a weighted mean of its square
//! neighborhood, where a neighbor's weight is the product of a spatial
//! Gaussian (distance from the center) and a range Gaussian (intensity
//! difference from the center). Strong edges therefore survive while
//! flat-area noise is averaged away.
//!
//! The filtered value is blended with the original by the strength, so
//! `s = 0` is exactly the identity and `s = 1` is the full bilateral mean.

use crate::buffer::{COLOR_CHANNELS, CHANNELS, dims, offset, to_byte};
use crate::types::{PixelBuffer, clamp_strength};

/// Sigma of the range (intensity difference) Gaussian.
pub const RANGE_SIGMA: f32 = 30.0;

/// Upper bound on the adaptive radius.
pub const MAX_RADIUS: u32 = 3;

/// Window radius used for an image of the given size and strength.
///
/// Larger images allow a wider window: the ceiling is
/// `clamp(min(w, h) / 500 + 1, 1, 3)`. The strength scales that ceiling
/// and the result is never below 1.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn radius_for(width: u32, height: u32, strength: f32) -> usize {
    let ceiling = (width.min(height) / 500 + 1).clamp(1, MAX_RADIUS);
    let scaled = (clamp_strength(strength) * ceiling as f32).round() as usize;
    scaled.max(1)
}

/// Spatial weights for every `(dy, dx)` offset in a `(2r+1)^2` window,
/// row-major starting at `(-r, -r)`.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn spatial_kernel(radius: usize) -> Vec<f32> {
    let sigma = radius as f32 * 0.5;
    let denom = 2.0 * sigma * sigma;
    let r = radius as isize;
    let mut kernel = Vec::with_capacity((2 * radius + 1) * (2 * radius + 1));
    for dy in -r..=r {
        for dx in -r..=r {
            let dist2 = (dx * dx + dy * dy) as f32;
            kernel.push((-dist2 / denom).exp());
        }
    }
    kernel
}

/// Range weights indexed by absolute intensity difference.
fn range_kernel() -> [f32; 256] {
    let denom = 2.0 * RANGE_SIGMA * RANGE_SIGMA;
    std::array::from_fn(|d| {
        let d = f32::from(u8::try_from(d).unwrap_or(u8::MAX));
        (-(d * d) / denom).exp()
    })
}

/// Denoise an image with a bilateral filter.
///
/// Pixels within `radius` of any edge are copied unchanged, as is the
/// alpha channel. Images with no interior at the chosen radius are
/// returned unchanged.
#[must_use = "returns the denoised image"]
pub fn denoise(image: &PixelBuffer, strength: f32) -> PixelBuffer {
    let mut output = image.clone();
    let s = clamp_strength(strength);
    if s <= 0.0 {
        return output;
    }

    let radius = radius_for(image.width(), image.height(), s);
    let (w, h) = dims(image);
    if w <= 2 * radius || h <= 2 * radius {
        return output;
    }

    let spatial = spatial_kernel(radius);
    let range = range_kernel();
    let src = image.as_raw();
    let dst: &mut [u8] = &mut output;

    for y in radius..h - radius {
        for x in radius..w - radius {
            let i = offset(w, x, y);
            for c in 0..COLOR_CHANNELS {
                let center = src[i + c];
                let mut sum = 0.0_f32;
                let mut weight_sum = 0.0_f32;
                let mut k = 0;
                for ny in y - radius..=y + radius {
                    let row = ny * w;
                    for nx in x - radius..=x + radius {
                        let value = src[(row + nx) * CHANNELS + c];
                        let weight = spatial[k] * range[usize::from(value.abs_diff(center))];
                        sum = f32::from(value).mul_add(weight, sum);
                        weight_sum += weight;
                        k += 1;
                    }
                }
                // The center always contributes weight 1, so the sum is positive.
                let filtered = sum / weight_sum;
                let original = f32::from(center);
                dst[i + c] = to_byte((filtered - original).mul_add(s, original));
            }
        }
    }

    output
}
