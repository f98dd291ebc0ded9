//! Saturation and lightness adjustment in HSL space.
//!
//! Colors are boosted by scaling HSL saturation, while lightness is
//! nudged apart: shadows darken slightly, highlights brighten slightly.
//! Lightness is always kept inside [`MIN_LIGHTNESS`]..=[`MAX_LIGHTNESS`]
//! so the pass never crushes to pure black or blows out to pure white.

use crate::buffer::{ALPHA, CHANNELS, to_byte};
use crate::types::{PixelBuffer, clamp_strength};

/// Lowest lightness the adjustment produces.
pub const MIN_LIGHTNESS: f32 = 0.05;

/// Highest lightness the adjustment produces.
pub const MAX_LIGHTNESS: f32 = 0.95;

/// A color in hue/saturation/lightness form, each component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue as a fraction of a full turn.
    pub h: f32,
    /// Saturation.
    pub s: f32,
    /// Lightness.
    pub l: f32,
}

impl Hsl {
    /// Convert an 8-bit RGB triple to HSL.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let r = f32::from(rgb[0]) / 255.0;
        let g = f32::from(rgb[1]) / 255.0;
        let b = f32::from(rgb[2]) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            return Self { h: 0.0, s: 0.0, l };
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Self { h: h / 6.0, s, l }
    }

    /// Convert back to an 8-bit RGB triple, rounding each channel.
    #[must_use]
    pub fn to_rgb(self) -> [u8; 3] {
        if self.s <= 0.0 {
            let v = to_byte(self.l * 255.0);
            return [v, v, v];
        }

        let q = if self.l < 0.5 {
            self.l * (1.0 + self.s)
        } else {
            self.l.mul_add(-self.s, self.l + self.s)
        };
        let p = 2.0f32.mul_add(self.l, -q);

        [
            to_byte(hue_to_channel(p, q, self.h + 1.0 / 3.0) * 255.0),
            to_byte(hue_to_channel(p, q, self.h) * 255.0),
            to_byte(hue_to_channel(p, q, self.h - 1.0 / 3.0) * 255.0),
        ]
    }

    /// Apply the saturation boost and lightness split for `strength`.
    ///
    /// Saturation is scaled by `1 + s * 0.5` and capped at 1. Lightness
    /// below one half is scaled by `1 - s * 0.1`, otherwise by
    /// `1 + s * 0.05`, and the result is clamped to
    /// [`MIN_LIGHTNESS`]..=[`MAX_LIGHTNESS`]. Hue is unchanged.
    #[must_use]
    pub fn adjusted(self, strength: f32) -> Self {
        let k = clamp_strength(strength);
        let s = (self.s * k.mul_add(0.5, 1.0)).min(1.0);
        let l = if self.l < 0.5 {
            self.l * k.mul_add(-0.1, 1.0)
        } else {
            self.l * k.mul_add(0.05, 1.0)
        };
        Self {
            h: self.h,
            s,
            l: l.clamp(MIN_LIGHTNESS, MAX_LIGHTNESS),
        }
    }
}

fn hue_to_channel(p: f32, q: f32, hue: f32) -> f32 {
    let t = if hue < 0.0 {
        hue + 1.0
    } else if hue > 1.0 {
        hue - 1.0
    } else {
        hue
    };

    if t < 1.0 / 6.0 {
        ((q - p) * 6.0).mul_add(t, p)
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        ((q - p) * (2.0 / 3.0 - t)).mul_add(6.0, p)
    } else {
        p
    }
}

/// Boost saturation and split lightness for every visible pixel.
///
/// Fully transparent pixels (alpha 0) are skipped; alpha is never
/// changed.
#[must_use = "returns the color-adjusted image"]
pub fn saturate(image: &PixelBuffer, strength: f32) -> PixelBuffer {
    let mut output = image.clone();
    let dst: &mut [u8] = &mut output;
    for pixel in dst.chunks_exact_mut(CHANNELS) {
        if pixel[ALPHA] == 0 {
            continue;
        }
        let rgb = Hsl::from_rgb([pixel[0], pixel[1], pixel[2]])
            .adjusted(strength)
            .to_rgb();
        pixel[..3].copy_from_slice(&rgb);
    }
    output
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn primaries_convert_to_expected_hues() {
        let red = Hsl::from_rgb([255, 0, 0]);
        assert!(close(red.h, 0.0) && close(red.s, 1.0) && close(red.l, 0.5));
        let green = Hsl::from_rgb([0, 255, 0]);
        assert!(close(green.h, 1.0 / 3.0));
        let blue = Hsl::from_rgb([0, 0, 255]);
        assert!(close(blue.h, 2.0 / 3.0));
    }

    #[test]
    fn gray_has_zero_saturation() {
        let gray = Hsl::from_rgb([128, 128, 128]);
        assert!(close(gray.s, 0.0));
        assert!(close(gray.l, 128.0 / 255.0));
    }

    #[test]
    fn rgb_round_trip_is_exact_for_sampled_colors() {
        for rgb in [
            [0, 0, 0],
            [255, 255, 255],
            [12, 200, 99],
            [250, 5, 130],
            [77, 77, 200],
            [128, 64, 32],
        ] {
            assert_eq!(Hsl::from_rgb(rgb).to_rgb(), rgb, "round trip of {rgb:?}");
        }
    }

    #[test]
    fn shadows_darken_and_highlights_brighten() {
        let shadow = Hsl { h: 0.2, s: 0.3, l: 0.3 }.adjusted(1.0);
        assert!(close(shadow.l, 0.27));
        let highlight = Hsl { h: 0.2, s: 0.3, l: 0.6 }.adjusted(1.0);
        assert!(close(highlight.l, 0.63));
    }

    #[test]
    fn saturation_is_boosted_and_capped() {
        let boosted = Hsl { h: 0.5, s: 0.4, l: 0.5 }.adjusted(1.0);
        assert!(close(boosted.s, 0.6));
        let capped = Hsl { h: 0.5, s: 0.9, l: 0.5 }.adjusted(1.0);
        assert!(close(capped.s, 1.0));
    }

    #[test]
    fn black_and_white_are_pulled_inside_lightness_bounds() {
        let img = PixelBuffer::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let out = saturate(&img, 0.0);
        // 0.05 * 255 = 12.75 -> 13; 0.95 * 255 = 242.25 -> 242.
        assert_eq!(out.get_pixel(0, 0).0, [13, 13, 13, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [242, 242, 242, 255]);
    }

    #[test]
    fn transparent_pixels_skipped() {
        let img = PixelBuffer::from_pixel(3, 3, image::Rgba([0, 0, 0, 0]));
        assert_eq!(saturate(&img, 1.0), img);
    }

    #[test]
    fn hue_is_preserved() {
        let img = PixelBuffer::from_pixel(1, 1, image::Rgba([180, 90, 60, 255]));
        let out = saturate(&img, 1.0);
        let before = Hsl::from_rgb([180, 90, 60]);
        let p = out.get_pixel(0, 0).0;
        let after = Hsl::from_rgb([p[0], p[1], p[2]]);
        assert!((before.h - after.h).abs() < 0.01);
        assert!(after.s >= before.s);
    }

    proptest! {
        #[test]
        fn adjusted_lightness_stays_in_bounds(
            h in 0.0f32..=1.0,
            s in 0.0f32..=1.0,
            l in 0.0f32..=1.0,
            strength in -1.0f32..=2.0,
        ) {
            let out = Hsl { h, s, l }.adjusted(strength);
            prop_assert!(out.l >= MIN_LIGHTNESS && out.l <= MAX_LIGHTNESS);
            prop_assert!(out.s >= 0.0 && out.s <= 1.0);
            prop_assert!((out.h - h).abs() < f32::EPSILON);
        }

        #[test]
        fn filtered_pixels_respect_lightness_bounds(
            rgb in any::<[u8; 3]>(),
            strength in 0.0f32..=1.0,
        ) {
            let img = PixelBuffer::from_pixel(1, 1, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
            let p = saturate(&img, strength).get_pixel(0, 0).0;
            let l = Hsl::from_rgb([p[0], p[1], p[2]]).l;
            // Rounding to bytes can move lightness by up to half a step.
            let slack = 0.5 / 255.0 + 1e-6;
            prop_assert!(l >= MIN_LIGHTNESS - slack && l <= MAX_LIGHTNESS + slack);
            prop_assert_eq!(p[3], 255);
        }
    }
}
