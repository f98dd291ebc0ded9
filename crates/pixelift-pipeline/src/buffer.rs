//! Raw-byte helpers shared by the per-pixel filters.
//!
//! Filters read the input buffer's bytes directly and write into a clone
//! of it, so every neighborhood read sees the untouched input.

use crate::types::{EnhanceError, PixelBuffer};

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Number of color channels a filter touches. Alpha (index 3) is
/// always carried through unchanged.
pub const COLOR_CHANNELS: usize = 3;

/// Index of the alpha byte within a pixel.
pub const ALPHA: usize = 3;

/// Build a buffer from raw RGBA bytes.
///
/// # Errors
///
/// Returns [`EnhanceError::Filter`] if `bytes.len()` is not
/// `width * height * 4`.
pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<PixelBuffer, EnhanceError> {
    let len = bytes.len();
    PixelBuffer::from_raw(width, height, bytes).ok_or_else(|| {
        EnhanceError::filter(
            "Loading pixels",
            format!("{len} bytes do not form a {width}x{height} RGBA buffer"),
        )
    })
}

/// Width and height as `usize` for index arithmetic.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn dims(image: &PixelBuffer) -> (usize, usize) {
    (image.width() as usize, image.height() as usize)
}

/// Byte offset of pixel `(x, y)` in a buffer of the given width.
pub(crate) const fn offset(width: usize, x: usize, y: usize) -> usize {
    (y * width + x) * CHANNELS
}

/// Round and clamp a computed channel value into a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_byte(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
