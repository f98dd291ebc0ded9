//! Mode-specific filter sequences as data.
//!
//! A [`Recipe`] is the ordered list of [`Step`]s a run applies. Each
//! [`PipelineMode`] builds its own recipe, and the pipeline simply walks
//! the list, so adding a mode never touches the orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resize::ResampleFilter;
use crate::types::{EnhanceError, GeneralSettings, PipelineMode, PixelBuffer};

/// Share of `sharpness` used by the post-upscale sharpen pass.
pub const POST_UPSCALE_SHARPEN_SHARE: f32 = 0.6;

/// Share of `texture_preservation` used as saturation strength.
pub const TEXTURE_TO_SATURATION: f32 = 0.7;

/// Fixed strengths for the license-plate recipes.
pub mod plate_strengths {
    /// Initial and in-plate contrast.
    pub const CONTRAST: f32 = 0.7;
    /// First denoise pass.
    pub const INITIAL_DENOISE: f32 = 0.7;
    /// Denoise inside the plate sub-recipe.
    pub const PLATE_DENOISE: f32 = 0.8;
    /// Sharpen before upscaling.
    pub const SHARPEN: f32 = 0.9;
    /// Saturation boost.
    pub const SATURATION: f32 = 0.6;
    /// Sharpen after upscaling.
    pub const POST_UPSCALE_SHARPEN: f32 = 0.5;
    /// Upscale factor for the standard plate recipe.
    pub const STANDARD_UPSCALE: f64 = 3.0;
    /// Upscale factor for the advanced plate recipe.
    pub const ADVANCED_UPSCALE: f64 = 4.0;
}

/// One filter invocation with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "filter", rename_all = "snake_case")]
pub enum Step {
    /// Bilateral denoise ([`crate::denoise::denoise`]).
    Denoise {
        /// Strength in `[0, 1]` (clamped).
        strength: f32,
    },
    /// HSL saturation/lightness ([`crate::color::saturate`]).
    Saturate {
        /// Strength in `[0, 1]` (clamped).
        strength: f32,
    },
    /// Adaptive contrast ([`crate::contrast::contrast`]).
    Contrast {
        /// Strength in `[0, 1]` (clamped).
        strength: f32,
    },
    /// Unsharp-mask sharpen ([`crate::sharpen::sharpen`]).
    Sharpen {
        /// Strength in `[0, 1]` (clamped).
        strength: f32,
    },
    /// License-plate local contrast ([`crate::plate::local_contrast`]).
    LocalContrast,
    /// Smooth resize ([`crate::resize::resize`]).
    Upscale {
        /// Positive scale factor.
        factor: f64,
    },
}

impl Step {
    /// Human-readable stage label shown while this step runs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Denoise { .. } => "Reducing noise",
            Self::Saturate { .. } => "Correcting color",
            Self::Contrast { .. } => "Enhancing contrast",
            Self::Sharpen { .. } => "Sharpening details",
            Self::LocalContrast => "Enhancing plate edges",
            Self::Upscale { .. } => "Upscaling",
        }
    }

    /// Short machine-friendly name (e.g. for diagnostics tables).
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Denoise { .. } => "denoise",
            Self::Saturate { .. } => "saturate",
            Self::Contrast { .. } => "contrast",
            Self::Sharpen { .. } => "sharpen",
            Self::LocalContrast => "local_contrast",
            Self::Upscale { .. } => "upscale",
        }
    }

    /// Run this step on `image`, producing a fresh buffer.
    ///
    /// # Errors
    ///
    /// Only [`Step::Upscale`] can fail; see [`crate::resize::resize`].
    pub fn apply(
        &self,
        image: &PixelBuffer,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, EnhanceError> {
        Ok(match *self {
            Self::Denoise { strength } => crate::denoise::denoise(image, strength),
            Self::Saturate { strength } => crate::color::saturate(image, strength),
            Self::Contrast { strength } => crate::contrast::contrast(image, strength),
            Self::Sharpen { strength } => crate::sharpen::sharpen(image, strength),
            Self::LocalContrast => crate::plate::local_contrast(image),
            Self::Upscale { factor } => crate::resize::resize(image, factor, filter)?,
        })
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Denoise { strength }
            | Self::Saturate { strength }
            | Self::Contrast { strength }
            | Self::Sharpen { strength } => write!(f, "{}({strength:.2})", self.name()),
            Self::LocalContrast => f.write_str(self.name()),
            Self::Upscale { factor } => write!(f, "{}(x{factor})", self.name()),
        }
    }
}

/// An ordered list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe(Vec<Step>);

impl Recipe {
    /// Create a recipe from explicit steps.
    #[must_use]
    pub const fn new(steps: Vec<Step>) -> Self {
        Self(steps)
    }

    /// The steps in application order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the recipe has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Product of every upscale factor in the recipe.
    #[must_use]
    pub fn total_scale(&self) -> f64 {
        self.0
            .iter()
            .filter_map(|step| match step {
                Step::Upscale { factor } => Some(*factor),
                _ => None,
            })
            .product()
    }

    /// Apply every step in order.
    ///
    /// # Errors
    ///
    /// Returns the first step error; no partial output is returned.
    pub fn apply(
        &self,
        image: &PixelBuffer,
        filter: ResampleFilter,
    ) -> Result<PixelBuffer, EnhanceError> {
        let mut current = image.clone();
        for step in &self.0 {
            current = step.apply(&current, filter)?;
        }
        Ok(current)
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

/// The plate-specific sub-recipe run after the initial denoise.
fn plate_enhancement(advanced: bool) -> Vec<Step> {
    use plate_strengths as p;

    let mut steps = vec![
        Step::Contrast {
            strength: p::CONTRAST,
        },
        Step::Denoise {
            strength: p::PLATE_DENOISE,
        },
        Step::Sharpen {
            strength: p::SHARPEN,
        },
    ];
    if advanced {
        steps.push(Step::LocalContrast);
        steps.push(Step::Saturate {
            strength: p::SATURATION,
        });
    }
    steps
}

fn plate_recipe(advanced: bool) -> Recipe {
    use plate_strengths as p;

    let upscale = if advanced {
        p::ADVANCED_UPSCALE
    } else {
        p::STANDARD_UPSCALE
    };

    let mut steps = vec![Step::Denoise {
        strength: p::INITIAL_DENOISE,
    }];
    steps.extend(plate_enhancement(advanced));
    steps.extend([
        Step::Saturate {
            strength: p::SATURATION,
        },
        Step::Contrast {
            strength: p::CONTRAST,
        },
        Step::Sharpen {
            strength: p::SHARPEN,
        },
        Step::Upscale { factor: upscale },
        Step::Sharpen {
            strength: p::POST_UPSCALE_SHARPEN,
        },
    ]);
    Recipe(steps)
}

fn general_recipe(settings: &GeneralSettings) -> Recipe {
    let mut steps = vec![Step::Denoise {
        strength: settings.noise_reduction,
    }];
    if settings.color_correction {
        steps.push(Step::Saturate {
            strength: settings.texture_preservation * TEXTURE_TO_SATURATION,
        });
    }
    steps.extend([
        Step::Contrast {
            strength: settings.contrast_enhancement,
        },
        Step::Sharpen {
            strength: settings.sharpness,
        },
        Step::Upscale {
            factor: f64::from(settings.effective_upscaling_factor()),
        },
        Step::Sharpen {
            strength: settings.sharpness * POST_UPSCALE_SHARPEN_SHARE,
        },
    ]);
    Recipe(steps)
}

impl PipelineMode {
    /// Build the ordered step list for this mode.
    ///
    /// `general` is only read by [`PipelineMode::General`].
    #[must_use]
    pub fn recipe(self, general: &GeneralSettings) -> Recipe {
        match self {
            Self::General => general_recipe(general),
            Self::LicensePlateStandard => plate_recipe(false),
            Self::LicensePlateAdvanced => plate_recipe(true),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn names(recipe: &Recipe) -> Vec<&'static str> {
        recipe.steps().iter().map(Step::name).collect()
    }

    #[test]
    fn general_recipe_order_and_strengths() {
        let settings = GeneralSettings::default();
        let recipe = PipelineMode::General.recipe(&settings);
        assert_eq!(
            names(&recipe),
            [
                "denoise", "saturate", "contrast", "sharpen", "upscale", "sharpen"
            ]
        );
        let steps = recipe.steps();
        assert_eq!(steps[0], Step::Denoise { strength: 0.8 });
        assert_eq!(
            steps[1],
            Step::Saturate {
                strength: 0.9 * 0.7
            }
        );
        assert_eq!(steps[2], Step::Contrast { strength: 0.8 });
        assert_eq!(steps[3], Step::Sharpen { strength: 0.95 });
        assert_eq!(steps[4], Step::Upscale { factor: 4.0 });
        assert_eq!(
            steps[5],
            Step::Sharpen {
                strength: 0.95 * 0.6
            }
        );
    }

    #[test]
    fn general_recipe_without_color_correction_skips_saturation() {
        let settings = GeneralSettings {
            color_correction: false,
            ..GeneralSettings::default()
        };
        let recipe = PipelineMode::General.recipe(&settings);
        assert_eq!(
            names(&recipe),
            ["denoise", "contrast", "sharpen", "upscale", "sharpen"]
        );
    }

    #[test]
    fn general_recipe_clamps_upscale_factor() {
        let settings = GeneralSettings {
            upscaling_factor: 40,
            ..GeneralSettings::default()
        };
        let recipe = PipelineMode::General.recipe(&settings);
        assert!((recipe.total_scale() - 16.0).abs() < f64::EPSILON);
    }

    #[test]
    fn standard_plate_recipe() {
        let recipe = PipelineMode::LicensePlateStandard.recipe(&GeneralSettings::default());
        assert_eq!(
            recipe.steps(),
            [
                Step::Denoise { strength: 0.7 },
                Step::Contrast { strength: 0.7 },
                Step::Denoise { strength: 0.8 },
                Step::Sharpen { strength: 0.9 },
                Step::Saturate { strength: 0.6 },
                Step::Contrast { strength: 0.7 },
                Step::Sharpen { strength: 0.9 },
                Step::Upscale { factor: 3.0 },
                Step::Sharpen { strength: 0.5 },
            ]
        );
    }

    #[test]
    fn advanced_plate_recipe() {
        let recipe = PipelineMode::LicensePlateAdvanced.recipe(&GeneralSettings::default());
        assert_eq!(
            recipe.steps(),
            [
                Step::Denoise { strength: 0.7 },
                Step::Contrast { strength: 0.7 },
                Step::Denoise { strength: 0.8 },
                Step::Sharpen { strength: 0.9 },
                Step::LocalContrast,
                Step::Saturate { strength: 0.6 },
                Step::Saturate { strength: 0.6 },
                Step::Contrast { strength: 0.7 },
                Step::Sharpen { strength: 0.9 },
                Step::Upscale { factor: 4.0 },
                Step::Sharpen { strength: 0.5 },
            ]
        );
    }

    #[test]
    fn plate_recipes_ignore_general_settings() {
        let tweaked = GeneralSettings {
            sharpness: 0.0,
            upscaling_factor: 9,
            color_correction: false,
            ..GeneralSettings::default()
        };
        assert_eq!(
            PipelineMode::LicensePlateStandard.recipe(&tweaked),
            PipelineMode::LicensePlateStandard.recipe(&GeneralSettings::default()),
        );
    }

    #[test]
    fn display_lists_steps() {
        let recipe = Recipe::new(vec![
            Step::Denoise { strength: 0.5 },
            Step::LocalContrast,
            Step::Upscale { factor: 2.0 },
        ]);
        assert_eq!(
            recipe.to_string(),
            "denoise(0.50) -> local_contrast -> upscale(x2)"
        );
    }

    #[test]
    fn step_serializes_with_filter_tag() {
        let json = serde_json::to_string(&Step::Sharpen { strength: 0.5 }).unwrap();
        assert_eq!(json, r#"{"filter":"sharpen","strength":0.5}"#);
    }

    #[test]
    fn recipe_apply_matches_manual_chain() {
        #[allow(clippy::cast_possible_truncation)]
        let img = PixelBuffer::from_fn(8, 6, |x, y| {
            image::Rgba([(x * 30) as u8, (y * 40) as u8, 90, 255])
        });
        let recipe = Recipe::new(vec![
            Step::Sharpen { strength: 0.3 },
            Step::Contrast { strength: 0.6 },
        ]);
        let chained = crate::contrast::contrast(&crate::sharpen::sharpen(&img, 0.3), 0.6);
        assert_eq!(recipe.apply(&img, ResampleFilter::default()).unwrap(), chained);
    }

    #[test]
    fn recipe_apply_stops_at_failing_step() {
        let img = PixelBuffer::from_pixel(4, 4, image::Rgba([1, 2, 3, 255]));
        let recipe = Recipe::new(vec![
            Step::Upscale { factor: -1.0 },
            Step::Sharpen { strength: 0.3 },
        ]);
        let result = recipe.apply(&img, ResampleFilter::default());
        assert!(matches!(result, Err(EnhanceError::Filter { .. })));
    }
}
