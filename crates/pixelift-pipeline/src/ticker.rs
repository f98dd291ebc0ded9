//! Decorative progress ticker for native targets.
//!
//! While a run is in flight, a background thread nudges the shared
//! [`ProgressReporter`] forward by a random increment on a fixed
//! interval, so long filter steps do not look frozen. The reporter's cap
//! keeps it below 100 until the run resolves.
//!
//! [`ProgressTicker`] is a drop guard: dropping it signals the thread and
//! joins it, so no tick can land after the run has returned.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};

use rand::Rng;

use crate::progress::{ProgressReporter, TickSchedule};

/// Handle to a running ticker thread.
#[derive(Debug)]
#[must_use = "the ticker stops as soon as the guard is dropped"]
pub struct ProgressTicker {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressTicker {
    /// Spawn the ticker thread.
    ///
    /// If the thread cannot be spawned a warning is logged and an inert
    /// guard is returned; the run itself is unaffected.
    pub fn start(reporter: Arc<ProgressReporter>, schedule: TickSchedule) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("pixelift-ticker".to_owned())
            .spawn(move || {
                let mut rng = rand::thread_rng();
                loop {
                    match stopped.recv_timeout(schedule.interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            reporter.advance_by(increment(&mut rng, schedule));
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        match spawned {
            Ok(handle) => Self {
                stop: Some(stop),
                handle: Some(handle),
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not start progress ticker");
                Self {
                    stop: None,
                    handle: None,
                }
            }
        }
    }

    /// Whether a ticker thread is actually running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The thread may already have exited; nothing to do then.
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("progress ticker thread panicked");
        }
    }
}

fn increment(rng: &mut impl Rng, schedule: TickSchedule) -> f32 {
    let (low, high) = (schedule.min_increment, schedule.max_increment);
    if low < high {
        rng.gen_range(low..=high)
    } else {
        low
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::progress::{NoProgress, ProgressState, RUNNING_CAP};

    fn fast_schedule() -> TickSchedule {
        TickSchedule {
            interval: Duration::from_millis(1),
            min_increment: 10.0,
            max_increment: 20.0,
        }
    }

    #[test]
    fn ticker_advances_progress_until_cap() {
        let reporter = Arc::new(ProgressReporter::new(Arc::new(NoProgress)));
        let ticker = ProgressTicker::start(Arc::clone(&reporter), fast_schedule());
        assert!(ticker.is_running());

        let mut waited = 0;
        while reporter.snapshot().percentage < RUNNING_CAP && waited < 2000 {
            thread::sleep(Duration::from_millis(1));
            waited += 1;
        }
        drop(ticker);
        assert!((reporter.snapshot().percentage - RUNNING_CAP).abs() < f32::EPSILON);
    }

    #[test]
    fn no_updates_after_drop() {
        let count = Arc::new(Mutex::new(0_usize));
        let sink_count = Arc::clone(&count);
        let reporter = Arc::new(ProgressReporter::new(Arc::new(
            move |_: &ProgressState| *sink_count.lock().unwrap() += 1,
        )));
        let ticker = ProgressTicker::start(
            Arc::clone(&reporter),
            TickSchedule {
                min_increment: 0.01,
                max_increment: 0.02,
                ..fast_schedule()
            },
        );
        thread::sleep(Duration::from_millis(20));
        drop(ticker);

        let after_drop = *count.lock().unwrap();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(*count.lock().unwrap(), after_drop);
    }

    #[test]
    fn degenerate_range_uses_minimum() {
        let mut rng = rand::thread_rng();
        let schedule = TickSchedule {
            interval: Duration::from_millis(1),
            min_increment: 3.0,
            max_increment: 1.0,
        };
        assert!((increment(&mut rng, schedule) - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn increments_stay_in_range() {
        let mut rng = rand::thread_rng();
        let schedule = fast_schedule();
        for _ in 0..200 {
            let inc = increment(&mut rng, schedule);
            assert!((schedule.min_increment..=schedule.max_increment).contains(&inc));
        }
    }
}
