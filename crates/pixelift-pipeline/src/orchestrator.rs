//! Run orchestration: the run state machine, progress, and the ticker.
//!
//! An [`Enhancer`] holds the active [`EnhanceConfig`] and drives one run
//! at a time through the staged [`Pipeline`]. Taking `&mut self` makes
//! overlapping runs on the same enhancer impossible.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use crate::pipeline::{EnhanceOutput, Pipeline};
use crate::progress::{ProgressReporter, ProgressSink, RUNNING_CAP, TickSchedule};
use crate::types::{EnhanceConfig, EnhanceError};

/// Percentage shown once the input has decoded.
pub const DECODED_PERCENT: f32 = 5.0;

/// Lifecycle of the most recent run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run has started yet.
    #[default]
    Idle,
    /// A run is in flight.
    Running,
    /// The last run produced an image.
    Completed,
    /// The last run failed; no output was produced.
    Failed,
}

/// Whether and how the decorative ticker runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
enum TickerSetting {
    #[default]
    Off,
    /// Follow the configured mode's schedule.
    ModeDefault,
    Custom(TickSchedule),
}

/// Percentage after `done` of `total` recipe steps.
#[allow(clippy::cast_precision_loss)]
fn step_percent(done: usize, total: usize) -> f32 {
    if total == 0 {
        return RUNNING_CAP;
    }
    let span = RUNNING_CAP - DECODED_PERCENT;
    DECODED_PERCENT + span * done as f32 / total as f32
}

/// Runs enhancements and tracks the run state.
#[derive(Debug, Clone, Default)]
pub struct Enhancer {
    config: EnhanceConfig,
    state: RunState,
    ticker: TickerSetting,
}

impl Enhancer {
    /// Create an idle enhancer with no ticker.
    #[must_use]
    pub fn new(config: EnhanceConfig) -> Self {
        Self {
            config,
            state: RunState::Idle,
            ticker: TickerSetting::Off,
        }
    }

    /// Run the decorative ticker with an explicit schedule.
    ///
    /// Ignored on `wasm32`, which has no threads.
    #[must_use]
    pub const fn with_ticker(mut self, schedule: TickSchedule) -> Self {
        self.ticker = TickerSetting::Custom(schedule);
        self
    }

    /// Run the decorative ticker with the configured mode's schedule.
    #[must_use]
    pub const fn with_mode_ticker(mut self) -> Self {
        self.ticker = TickerSetting::ModeDefault;
        self
    }

    /// State of the most recent run.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// The configuration used by the next run.
    #[must_use]
    pub const fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    /// Replace the configuration for subsequent runs.
    pub fn set_config(&mut self, config: EnhanceConfig) {
        self.config = config;
    }

    fn tick_schedule(&self) -> Option<TickSchedule> {
        match self.ticker {
            TickerSetting::Off => None,
            TickerSetting::ModeDefault => Some(self.config.mode.tick_schedule()),
            TickerSetting::Custom(schedule) => Some(schedule),
        }
    }

    /// Enhance `image_bytes`, reporting progress to `sink`.
    ///
    /// The state moves to [`RunState::Running`] and then to
    /// [`RunState::Completed`] or [`RunState::Failed`]. Progress is reset
    /// at the start, never decreases during the run, and snaps to 100 on
    /// success. Any ticker is stopped before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`EnhanceError::EmptyInput`] without starting a run when
    /// `image_bytes` is empty. Otherwise returns the decode, filter, or
    /// encode error that ended the run; no partial output is produced.
    pub fn run(
        &mut self,
        image_bytes: &[u8],
        sink: Arc<dyn ProgressSink>,
    ) -> Result<EnhanceOutput, EnhanceError> {
        if image_bytes.is_empty() {
            return Err(EnhanceError::EmptyInput);
        }

        let span = info_span!(
            "enhance",
            mode = %self.config.mode,
            input_bytes = image_bytes.len()
        );
        let _entered = span.enter();

        let reporter = Arc::new(ProgressReporter::new(sink));
        reporter.reset("Starting");
        self.state = RunState::Running;

        let result = {
            let _ticker = start_ticker(&reporter, self.tick_schedule());
            self.execute(image_bytes, &reporter)
        };

        match result {
            Ok(output) => {
                self.state = RunState::Completed;
                reporter.complete("Done");
                info!(
                    source = %output.source_dimensions,
                    output = %output.dimensions,
                    elapsed_ms = output.total_duration().as_secs_f64() * 1000.0,
                    "enhancement complete"
                );
                Ok(output)
            }
            Err(e) => {
                self.state = RunState::Failed;
                reporter.fail("Failed");
                warn!(error = %e, kind = ?e.kind(), "enhancement failed");
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        image_bytes: &[u8],
        reporter: &ProgressReporter,
    ) -> Result<EnhanceOutput, EnhanceError> {
        reporter.set_stage("Decoding image");
        let decoded = Pipeline::new(image_bytes.to_vec(), self.config.clone()).decode()?;
        reporter.advance_to(DECODED_PERCENT);

        let mut enhancing = decoded.begin();
        let total = enhancing.recipe().len();
        while let Some(step) = enhancing.next_step().copied() {
            reporter.set_stage(step.label());
            enhancing.step()?;
            reporter.advance_to(step_percent(enhancing.completed(), total));
        }

        reporter.set_stage("Encoding");
        enhancing.finish()?.encode()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn start_ticker(
    reporter: &Arc<ProgressReporter>,
    schedule: Option<TickSchedule>,
) -> Option<crate::ticker::ProgressTicker> {
    schedule.map(|s| crate::ticker::ProgressTicker::start(Arc::clone(reporter), s))
}

#[cfg(target_arch = "wasm32")]
const fn start_ticker(_reporter: &Arc<ProgressReporter>, _schedule: Option<TickSchedule>) {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::progress::{NoProgress, ProgressState};
    use crate::types::{ErrorKind, PipelineMode};

    fn gray_png(width: u32, height: u32) -> Vec<u8> {
        let img = crate::PixelBuffer::from_pixel(width, height, image::Rgba([128, 128, 128, 255]));
        crate::codec::encode_png(&img).unwrap()
    }

    fn recorder() -> (Arc<Mutex<Vec<ProgressState>>>, Arc<dyn ProgressSink>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: Arc<dyn ProgressSink> = Arc::new(move |state: &ProgressState| {
            sink_seen.lock().unwrap().push(state.clone());
        });
        (seen, sink)
    }

    #[test]
    fn new_enhancer_is_idle() {
        let enhancer = Enhancer::new(EnhanceConfig::default());
        assert_eq!(enhancer.state(), RunState::Idle);
    }

    #[test]
    fn successful_run_completes_with_full_progress() {
        let mut enhancer = Enhancer::new(EnhanceConfig::default());
        let (seen, sink) = recorder();
        let output = enhancer.run(&gray_png(10, 10), sink).unwrap();

        assert_eq!(enhancer.state(), RunState::Completed);
        assert_eq!(output.dimensions.width, 40);

        let seen = seen.lock().unwrap();
        let percentages: Vec<f32> = seen.iter().map(|s| s.percentage).collect();
        assert!(percentages.windows(2).all(|w| w[0] <= w[1]), "{percentages:?}");
        let last = seen.last().unwrap();
        assert!((last.percentage - 100.0).abs() < f32::EPSILON);
        assert_eq!(last.stage_label, "Done");
        assert!(seen.iter().any(|s| s.stage_label == "Upscaling"));
        assert!(
            seen[..seen.len() - 1]
                .iter()
                .all(|s| s.percentage <= RUNNING_CAP)
        );
    }

    #[test]
    fn empty_input_does_not_start_a_run() {
        let mut enhancer = Enhancer::new(EnhanceConfig::default());
        let (seen, sink) = recorder();
        let err = enhancer.run(&[], sink).unwrap_err();
        assert!(matches!(err, EnhanceError::EmptyInput));
        assert_eq!(enhancer.state(), RunState::Idle);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn corrupt_input_fails_and_accepts_retry() {
        let mut enhancer = Enhancer::new(EnhanceConfig::default());
        let err = enhancer
            .run(b"definitely not an image", Arc::new(NoProgress))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);
        assert_eq!(enhancer.state(), RunState::Failed);

        let output = enhancer.run(&gray_png(6, 6), Arc::new(NoProgress)).unwrap();
        assert_eq!(enhancer.state(), RunState::Completed);
        assert_eq!(output.dimensions.width, 24);
    }

    #[test]
    fn completed_enhancer_runs_again_from_zero() {
        let mut enhancer = Enhancer::new(EnhanceConfig::default());
        enhancer.run(&gray_png(6, 6), Arc::new(NoProgress)).unwrap();
        assert_eq!(enhancer.state(), RunState::Completed);

        let (seen, sink) = recorder();
        enhancer.run(&gray_png(4, 4), sink).unwrap();
        assert_eq!(enhancer.state(), RunState::Completed);
        let seen = seen.lock().unwrap();
        assert!(seen[0].percentage.abs() < f32::EPSILON);
        assert_eq!(seen[0].stage_label, "Starting");
    }

    #[test]
    fn set_config_changes_next_run() {
        let mut enhancer = Enhancer::new(EnhanceConfig::default());
        enhancer.set_config(EnhanceConfig::for_mode(PipelineMode::LicensePlateStandard));
        assert_eq!(enhancer.config().mode, PipelineMode::LicensePlateStandard);
        let output = enhancer.run(&gray_png(5, 4), Arc::new(NoProgress)).unwrap();
        assert_eq!(output.dimensions.width, 15);
        assert_eq!(output.dimensions.height, 12);
    }

    #[test]
    fn ticker_is_stopped_when_run_returns() {
        let schedule = TickSchedule {
            interval: Duration::from_millis(1),
            min_increment: 0.01,
            max_increment: 0.02,
        };
        let mut enhancer = Enhancer::new(EnhanceConfig::default()).with_ticker(schedule);
        let (seen, sink) = recorder();
        enhancer.run(&gray_png(8, 8), sink).unwrap();

        let count = seen.lock().unwrap().len();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(seen.lock().unwrap().len(), count);
        let last = seen.lock().unwrap().last().cloned().unwrap();
        assert!((last.percentage - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn mode_ticker_follows_config_changes() {
        let mut enhancer = Enhancer::new(EnhanceConfig::default()).with_mode_ticker();
        assert_eq!(
            enhancer.tick_schedule(),
            Some(PipelineMode::General.tick_schedule())
        );
        enhancer.set_config(EnhanceConfig::for_mode(PipelineMode::LicensePlateAdvanced));
        assert_eq!(
            enhancer.tick_schedule(),
            Some(PipelineMode::LicensePlateAdvanced.tick_schedule())
        );
    }

    #[test]
    fn step_percent_spans_decode_to_cap() {
        assert!((step_percent(0, 6) - DECODED_PERCENT).abs() < f32::EPSILON);
        assert!((step_percent(3, 6) - 50.0).abs() < 1e-4);
        assert!((step_percent(6, 6) - RUNNING_CAP).abs() < f32::EPSILON);
        assert!((step_percent(0, 0) - RUNNING_CAP).abs() < f32::EPSILON);
    }
}
