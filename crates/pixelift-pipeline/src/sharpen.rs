//! Unsharp-mask style sharpening.
//!
//! Each interior pixel's color channels are pushed away from the mean of
//! their four axis-adjacent neighbors. The one-pixel border and the alpha
//! channel are copied through unchanged.

use crate::buffer::{COLOR_CHANNELS, CHANNELS, dims, offset, to_byte};
use crate::types::{PixelBuffer, clamp_strength};

/// How much each unit of strength adds to the detail gain.
pub const DETAIL_GAIN_PER_STRENGTH: f32 = 2.5;

/// Gain applied to the high-pass detail term for a given strength.
///
/// The gain is `1 + s * 2.5`, so even zero strength re-adds the detail
/// once; sharpen at `s = 0` is not the identity on textured input.
#[must_use]
pub fn detail_gain(strength: f32) -> f32 {
    clamp_strength(strength).mul_add(DETAIL_GAIN_PER_STRENGTH, 1.0)
}

/// Sharpen an image.
///
/// For every interior pixel and each of R, G, B:
/// `out = center + (center - mean4) * (1 + s * 2.5)`, rounded and clamped
/// to `[0, 255]`, where `mean4` is the unweighted mean of the up, down,
/// left and right neighbors read from the untouched input.
///
/// Images narrower or shorter than three pixels have no interior and are
/// returned unchanged.
#[must_use = "returns the sharpened image"]
pub fn sharpen(image: &PixelBuffer, strength: f32) -> PixelBuffer {
    let mut output = image.clone();
    let (w, h) = dims(image);
    if w < 3 || h < 3 {
        return output;
    }

    let gain = detail_gain(strength);
    let stride = w * CHANNELS;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut output;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = offset(w, x, y);
            for c in 0..COLOR_CHANNELS {
                let center = f32::from(src[i + c]);
                let neighbours = f32::from(src[i - stride + c])
                    + f32::from(src[i + stride + c])
                    + f32::from(src[i - CHANNELS + c])
                    + f32::from(src[i + CHANNELS + c]);
                let detail = center - neighbours / 4.0;
                dst[i + c] = to_byte(detail.mul_add(gain, center));
            }
        }
    }

    output
}
