//! Local-contrast edge boost for license plates.
//!
//! Characters on a plate are thin strokes against a flat background, so
//! each channel value is compared with its 3x3 neighborhood mean: values
//! above the local mean are brightened and values at or below it are
//! darkened. Color is kept; nothing is converted to grayscale or
//! binarized.

use crate::buffer::{CHANNELS, COLOR_CHANNELS, dims, offset, to_byte};
use crate::types::PixelBuffer;

/// Multiplier for channel values above their local mean.
pub const BOOST: f32 = 1.4;

/// Multiplier for channel values at or below their local mean.
pub const DAMPEN: f32 = 0.8;

/// Apply the local-contrast edge boost.
///
/// Every interior pixel is compared against the mean of its 3x3
/// neighborhood (center included) in the untouched input. The one-pixel
/// border and alpha are copied through.
#[must_use = "returns the edge-enhanced image"]
pub fn local_contrast(image: &PixelBuffer) -> PixelBuffer {
    let mut output = image.clone();
    let (w, h) = dims(image);
    if w < 3 || h < 3 {
        return output;
    }

    let stride = w * CHANNELS;
    let src = image.as_raw();
    let dst: &mut [u8] = &mut output;

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = offset(w, x, y);
            for c in 0..COLOR_CHANNELS {
                let mut sum = 0_u32;
                for row in [i - stride, i, i + stride] {
                    sum += u32::from(src[row - CHANNELS + c])
                        + u32::from(src[row + c])
                        + u32::from(src[row + CHANNELS + c]);
                }
                let value = src[i + c];
                // Compare 9 * v against the integer sum to avoid rounding
                // the mean.
                let factor = if u32::from(value) * 9 > sum {
                    BOOST
                } else {
                    DAMPEN
                };
                dst[i + c] = to_byte(f32::from(value) * factor);
            }
        }
    }

    output
}
