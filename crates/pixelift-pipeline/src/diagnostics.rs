//! Run diagnostics: timing and sizes for every step of an enhancement.
//!
//! Every run through [`Pipeline`](crate::Pipeline) collects diagnostics
//! alongside the output image, for tuning filter strengths and spotting
//! slow steps.
//!
//! Duration measurements use [`std::time::Duration`]. Timestamps are
//! captured via the `web-time` crate, which uses `performance.now()` on
//! WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::recipe::Step;
use crate::types::{Dimensions, PipelineMode};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Mode whose recipe was applied.
    pub mode: PipelineMode,
    /// Decoding of the input bytes.
    pub decode: DecodeDiagnostics,
    /// One entry per recipe step, in application order.
    pub steps: Vec<StepDiagnostics>,
    /// PNG encoding of the result.
    pub encode: EncodeDiagnostics,
    /// Wall-clock duration from decode start to encode end (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Decode metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeDiagnostics {
    /// Size of the encoded input.
    pub input_bytes: usize,
    /// Decoded raster size.
    pub dimensions: Dimensions,
    /// Decode duration (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Metrics for one recipe step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDiagnostics {
    /// The step that ran, with its parameters.
    pub step: Step,
    /// Raster size before the step.
    pub input: Dimensions,
    /// Raster size after the step.
    pub output: Dimensions,
    /// Step duration (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Encode metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeDiagnostics {
    /// Size of the encoded PNG.
    pub output_bytes: usize,
    /// Encode duration (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl RunDiagnostics {
    /// Sum of the recipe step durations, excluding decode and encode.
    #[must_use]
    pub fn filter_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// The slowest recipe step, if any ran.
    #[must_use]
    pub fn slowest_step(&self) -> Option<&StepDiagnostics> {
        self.steps.iter().max_by_key(|s| s.duration)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Enhancement Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!("Mode: {}", self.mode));
        lines.push(format!(
            "Image: {} -> {}",
            self.decode.dimensions,
            self.steps
                .last()
                .map_or(self.decode.dimensions, |s| s.output),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Step", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let row = |name: &str, duration: Duration, details: String| {
            let ms = duration_ms(duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}")
        };

        lines.push(row(
            "Decode",
            self.decode.duration,
            format!(
                "{} bytes -> {}",
                self.decode.input_bytes, self.decode.dimensions
            ),
        ));
        for step in &self.steps {
            let details = if step.input == step.output {
                format!("{} @ {}", step.step, step.output)
            } else {
                format!("{} {} -> {}", step.step, step.input, step.output)
            };
            lines.push(row(step.step.label(), step.duration, details));
        }
        lines.push(row(
            "Encode",
            self.encode.duration,
            format!("{} bytes PNG", self.encode.output_bytes),
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
