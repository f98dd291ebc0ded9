//! Progress reporting for enhancement runs.
//!
//! A [`ProgressReporter`] owns the current [`ProgressState`] for one run
//! and forwards every change to a caller-supplied [`ProgressSink`]. The
//! displayed percentage never decreases while a run is in flight and
//! stays below [`RUNNING_CAP`] until the run resolves. Completion snaps
//! it to 100.
//!
//! The reporter is shared between the run and the optional decorative
//! ticker thread, so all state sits behind a [`Mutex`] and the sink must
//! be `Send + Sync`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::PipelineMode;

/// Highest percentage shown while a run is still in flight.
pub const RUNNING_CAP: f32 = 95.0;

/// Percentage shown on successful completion.
pub const COMPLETE: f32 = 100.0;

/// Snapshot of what the progress display should show.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Percentage in `[0, 100]`.
    pub percentage: f32,
    /// Human-readable description of the current stage.
    pub stage_label: String,
}

/// Receives progress updates.
///
/// Implemented for every `Fn(&ProgressState) + Send + Sync` closure.
/// The sink is invoked while the reporter's lock is held, so it must not
/// call back into the same reporter.
pub trait ProgressSink: Send + Sync {
    /// Called after every change to the progress state.
    fn update(&self, state: &ProgressState);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressState) + Send + Sync,
{
    fn update(&self, state: &ProgressState) {
        self(state);
    }
}

/// A sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&self, _state: &ProgressState) {}
}

#[derive(Debug, Default)]
struct Inner {
    state: ProgressState,
    /// Set once the run has completed or failed; later updates are ignored.
    settled: bool,
}

/// Monotonic progress state for one run.
pub struct ProgressReporter {
    inner: Mutex<Inner>,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl ProgressReporter {
    /// Create a reporter at 0% that forwards to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, inner: &Inner) {
        self.sink.update(&inner.state);
    }

    /// Return to 0% with the given label and accept updates again.
    pub fn reset(&self, label: &str) {
        let mut inner = self.lock();
        inner.state = ProgressState {
            percentage: 0.0,
            stage_label: label.to_owned(),
        };
        inner.settled = false;
        self.emit(&inner);
    }

    /// Raise the percentage to `percentage`, capped at [`RUNNING_CAP`].
    ///
    /// Lower values than the current one are ignored.
    pub fn advance_to(&self, percentage: f32) {
        let mut inner = self.lock();
        let target = percentage.clamp(0.0, RUNNING_CAP);
        if inner.settled || target <= inner.state.percentage {
            return;
        }
        inner.state.percentage = target;
        self.emit(&inner);
    }

    /// Raise the percentage by `delta`, capped at [`RUNNING_CAP`].
    pub fn advance_by(&self, delta: f32) {
        let mut inner = self.lock();
        let target = (inner.state.percentage + delta).clamp(0.0, RUNNING_CAP);
        if inner.settled || target <= inner.state.percentage {
            return;
        }
        inner.state.percentage = target;
        self.emit(&inner);
    }

    /// Change the stage label without moving the percentage.
    pub fn set_stage(&self, label: &str) {
        let mut inner = self.lock();
        if inner.settled || inner.state.stage_label == label {
            return;
        }
        label.clone_into(&mut inner.state.stage_label);
        self.emit(&inner);
    }

    /// Snap to 100% and stop accepting updates.
    pub fn complete(&self, label: &str) {
        let mut inner = self.lock();
        inner.state.percentage = COMPLETE;
        label.clone_into(&mut inner.state.stage_label);
        inner.settled = true;
        self.emit(&inner);
    }

    /// Keep the current percentage, show `label`, and stop accepting
    /// updates.
    pub fn fail(&self, label: &str) {
        let mut inner = self.lock();
        label.clone_into(&mut inner.state.stage_label);
        inner.settled = true;
        self.emit(&inner);
    }

    /// The current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.lock().state.clone()
    }
}

/// Timing of the decorative progress ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSchedule {
    /// Delay between ticks.
    pub interval: Duration,
    /// Smallest random increment per tick, in percentage points.
    pub min_increment: f32,
    /// Largest random increment per tick, in percentage points.
    pub max_increment: f32,
}

impl PipelineMode {
    /// Ticker timing for this mode: the heavier the recipe, the slower
    /// the displayed progress creeps.
    #[must_use]
    pub const fn tick_schedule(self) -> TickSchedule {
        match self {
            Self::General => TickSchedule {
                interval: Duration::from_millis(150),
                min_increment: 2.0,
                max_increment: 6.0,
            },
            Self::LicensePlateStandard => TickSchedule {
                interval: Duration::from_millis(200),
                min_increment: 1.5,
                max_increment: 4.0,
            },
            Self::LicensePlateAdvanced => TickSchedule {
                interval: Duration::from_millis(250),
                min_increment: 0.5,
                max_increment: 2.5,
            },
        }
    }
}
