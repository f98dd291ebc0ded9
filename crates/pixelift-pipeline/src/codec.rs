//! Image decoding and encoding at the edges of the pipeline.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces an RGBA
//! [`PixelBuffer`]; after the last filter the buffer is encoded back to
//! PNG bytes, optionally wrapped in a `data:` URI.

use base64::Engine as _;
use image::ImageEncoder as _;

use crate::types::{EnhanceError, PixelBuffer};

/// MIME type of every encoded output.
pub const OUTPUT_MIME: &str = "image/png";

/// Decode raw image bytes into an RGBA buffer.
///
/// Supports PNG, JPEG, BMP, and WebP formats (whatever the `image` crate
/// was built to decode). Grayscale and RGB sources gain an opaque alpha
/// channel.
///
/// # Errors
///
/// Returns [`EnhanceError::EmptyInput`] if `bytes` is empty.
/// Returns [`EnhanceError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer, EnhanceError> {
    if bytes.is_empty() {
        return Err(EnhanceError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.into_rgba8())
}

/// Encode an RGBA buffer as PNG bytes.
///
/// # Errors
///
/// Returns [`EnhanceError::Encode`] if the PNG encoder rejects the
/// buffer.
#[must_use = "returns the encoded PNG bytes"]
pub fn encode_png(image: &PixelBuffer) -> Result<Vec<u8>, EnhanceError> {
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| EnhanceError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Wrap encoded PNG bytes in a base64 `data:` URI.
#[must_use]
pub fn data_uri(png: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    format!("data:{OUTPUT_MIME};base64,{encoded}")
}
