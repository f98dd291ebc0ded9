//! Adaptive contrast: per-channel histogram stretch followed by a
//! sigmoid S-curve.
//!
//! Bounds come from the pixel distribution of each channel rather than
//! fixed constants. Fully transparent pixels are ignored when building
//! the histograms and are never modified.

use crate::buffer::{ALPHA, COLOR_CHANNELS, CHANNELS, to_byte};
use crate::types::{PixelBuffer, clamp_strength};

/// Fraction of counted pixels clipped at each end of a channel's range.
pub const CLIP_FRACTION: f64 = 0.05;

/// Slope of the logistic curve applied to the centered value.
pub const SIGMOID_SLOPE: f32 = 4.0;

/// How much each unit of strength widens the centered value.
pub const SPREAD_PER_STRENGTH: f32 = 1.5;

/// Stretch bounds for one color channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelBounds {
    /// Lower bound: maps to 0.
    pub low: u8,
    /// Upper bound: maps to 255.
    pub high: u8,
}

impl ChannelBounds {
    /// Width of the stretch range. Zero means the channel is left alone.
    #[must_use]
    pub const fn range(self) -> u8 {
        self.high.saturating_sub(self.low)
    }
}

/// Per-channel value counts over non-transparent pixels.
#[derive(Debug, Clone)]
pub struct Histograms {
    /// One 256-bin histogram per color channel.
    pub channels: [[u32; 256]; COLOR_CHANNELS],
    /// Number of pixels counted (alpha != 0).
    pub counted: u32,
}

/// Build R/G/B histograms, skipping pixels whose alpha is zero.
#[must_use]
pub fn histograms(image: &PixelBuffer) -> Histograms {
    let mut channels = [[0_u32; 256]; COLOR_CHANNELS];
    let mut counted = 0_u32;
    for pixel in image.as_raw().chunks_exact(CHANNELS) {
        if pixel[ALPHA] == 0 {
            continue;
        }
        counted += 1;
        for (c, hist) in channels.iter_mut().enumerate() {
            hist[usize::from(pixel[c])] += 1;
        }
    }
    Histograms { channels, counted }
}

/// Find the stretch bounds of one channel.
///
/// Both scans use the same count threshold (`5%` of counted pixels): the
/// low bound is the first value, scanning up from 0, whose cumulative
/// count reaches it, and the high bound is the first value, scanning down
/// from 255, whose cumulative count from the top reaches it.
#[must_use]
pub fn channel_bounds(histogram: &[u32; 256], counted: u32) -> ChannelBounds {
    let threshold = f64::from(counted) * CLIP_FRACTION;

    let mut low = 0_u8;
    let mut cumulative = 0_u32;
    for (value, &count) in (0..=u8::MAX).zip(histogram.iter()) {
        cumulative += count;
        if f64::from(cumulative) >= threshold {
            low = value;
            break;
        }
    }

    let mut high = u8::MAX;
    cumulative = 0;
    for (value, &count) in (0..=u8::MAX).rev().zip(histogram.iter().rev()) {
        cumulative += count;
        if f64::from(cumulative) >= threshold {
            high = value;
            break;
        }
    }

    ChannelBounds { low, high }
}

fn logistic(x: f32) -> f32 {
    1.0 / (1.0 + (-SIGMOID_SLOPE * x).exp())
}

/// Precompute the output byte for every input value of one channel.
///
/// `n = clamp((v - low) / range, 0, 1)` is centered, widened by
/// `1 + s * 1.5`, passed through the logistic curve, and rescaled so the
/// curve's ends land on 0 and 255.
///
/// The rescale is endpoint-normalized rather than a plain `sigma * 255`,
/// which spans only about 30..225 at `s = 0` and would undo the stretch.
fn channel_lut(bounds: ChannelBounds, strength: f32) -> [u8; 256] {
    let spread = strength.mul_add(SPREAD_PER_STRENGTH, 1.0);
    let floor = logistic(-0.5 * spread);
    let ceil = logistic(0.5 * spread);
    let low = f32::from(bounds.low);
    let range = f32::from(bounds.range());

    std::array::from_fn(|v| {
        let v = f32::from(u8::try_from(v).unwrap_or(u8::MAX));
        let normalized = ((v - low) / range).clamp(0.0, 1.0);
        let curved = logistic((normalized - 0.5) * spread);
        to_byte(255.0 * (curved - floor) / (ceil - floor))
    })
}

/// Enhance contrast with a per-channel adaptive stretch.
///
/// Channels whose bounds coincide (zero range) are left unchanged; this
/// is policy, not an error. Pixels with alpha 0 are copied byte-for-byte.
/// An image with no non-transparent pixels is returned unchanged.
#[must_use = "returns the contrast-enhanced image"]
pub fn contrast(image: &PixelBuffer, strength: f32) -> PixelBuffer {
    let mut output = image.clone();
    let hist = histograms(image);
    if hist.counted == 0 {
        return output;
    }

    let s = clamp_strength(strength);
    let luts: [Option<[u8; 256]>; COLOR_CHANNELS] = std::array::from_fn(|c| {
        let bounds = channel_bounds(&hist.channels[c], hist.counted);
        (bounds.range() > 0).then(|| channel_lut(bounds, s))
    });

    let dst: &mut [u8] = &mut output;
    for pixel in dst.chunks_exact_mut(CHANNELS) {
        if pixel[ALPHA] == 0 {
            continue;
        }
        for (c, lut) in luts.iter().enumerate() {
            if let Some(lut) = lut {
                pixel[c] = lut[usize::from(pixel[c])];
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn gradient(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, _| {
            let v = (60 + x * 120 / w.max(1)) as u8;
            image::Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn bounds_of_uniform_histogram_clip_five_percent() {
        let mut hist = [0_u32; 256];
        hist[..100].fill(1);
        let bounds = channel_bounds(&hist, 100);
        assert_eq!(bounds, ChannelBounds { low: 4, high: 95 });
    }

    #[test]
    fn bounds_of_single_value_have_zero_range() {
        let mut hist = [0_u32; 256];
        hist[128] = 400;
        let bounds = channel_bounds(&hist, 400);
        assert_eq!(bounds.low, 128);
        assert_eq!(bounds.high, 128);
        assert_eq!(bounds.range(), 0);
    }

    #[test]
    fn histograms_skip_transparent_pixels() {
        let img = PixelBuffer::from_fn(4, 1, |x, _| {
            if x == 0 {
                image::Rgba([9, 9, 9, 0])
            } else {
                image::Rgba([200, 100, 50, 255])
            }
        });
        let hist = histograms(&img);
        assert_eq!(hist.counted, 3);
        assert_eq!(hist.channels[0][9], 0);
        assert_eq!(hist.channels[0][200], 3);
        assert_eq!(hist.channels[2][50], 3);
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let img = PixelBuffer::from_pixel(10, 10, image::Rgba([128, 128, 128, 255]));
        assert_eq!(contrast(&img, 1.0), img);
    }

    #[test]
    fn fully_transparent_image_is_unchanged() {
        let img = PixelBuffer::from_fn(5, 5, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 40 + y) as u8;
            image::Rgba([v, v, v, 0])
        });
        assert_eq!(contrast(&img, 1.0), img);
    }

    #[test]
    fn lut_reaches_full_range_at_every_strength() {
        let bounds = ChannelBounds { low: 60, high: 180 };
        for strength in [0.0, 0.5, 1.0] {
            let lut = channel_lut(bounds, strength);
            assert_eq!(lut[60], 0, "strength {strength}");
            assert_eq!(lut[180], 255, "strength {strength}");
            assert!((127..=128).contains(&lut[120]), "strength {strength}");
            // Values outside the bounds clamp to the ends.
            assert_eq!(lut[10], 0);
            assert_eq!(lut[250], 255);
            assert!(lut.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn stretch_maps_bounds_to_extremes() {
        let img = gradient(100, 2);
        let hist = histograms(&img);
        let bounds = channel_bounds(&hist.channels[0], hist.counted);
        let out = contrast(&img, 0.5);
        for (src, dst) in img.pixels().zip(out.pixels()) {
            if src.0[0] <= bounds.low {
                assert_eq!(dst.0[0], 0);
            }
            if src.0[0] >= bounds.high {
                assert_eq!(dst.0[0], 255);
            }
        }
    }

    #[test]
    fn stretch_is_monotonic() {
        let img = gradient(64, 1);
        let out = contrast(&img, 0.8);
        let row: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert!(row.windows(2).all(|w| w[0] <= w[1]), "{row:?}");
    }

    #[test]
    fn stronger_contrast_pushes_midtones_apart() {
        let img = gradient(100, 1);
        let mild = contrast(&img, 0.0);
        let strong = contrast(&img, 1.0);
        // Just below the midpoint gets darker, just above gets brighter.
        let below = 35;
        let above = 65;
        assert!(strong.get_pixel(below, 0).0[0] <= mild.get_pixel(below, 0).0[0]);
        assert!(strong.get_pixel(above, 0).0[0] >= mild.get_pixel(above, 0).0[0]);
    }

    #[test]
    fn zero_range_channel_left_alone_while_others_stretch() {
        // Red varies, green is constant.
        #[allow(clippy::cast_possible_truncation)]
        let img = PixelBuffer::from_fn(50, 1, |x, _| image::Rgba([(x * 5) as u8, 77, 0, 255]));
        let out = contrast(&img, 1.0);
        assert!(out.pixels().all(|p| p.0[1] == 77));
        assert_ne!(out, img);
    }

    proptest! {
        #[test]
        fn transparent_pixels_untouched(
            pixels in proptest::collection::vec(any::<[u8; 4]>(), 16..64),
            strength in 0.0f32..=1.0,
        ) {
            let width = u32::try_from(pixels.len()).unwrap_or(1);
            let img = PixelBuffer::from_fn(width, 1, |x, _| {
                image::Rgba(pixels[usize::try_from(x).unwrap_or(0)])
            });
            let out = contrast(&img, strength);
            for (src, dst) in img.pixels().zip(out.pixels()) {
                prop_assert_eq!(dst.0[3], src.0[3]);
                if src.0[3] == 0 {
                    prop_assert_eq!(src, dst);
                }
            }
        }
    }
}
