//! Timing values that can change while the client runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

use crate::model::{IntervalsConfig, ServerSettings};

/// Process delay and health-check interval shared between the pass pipeline
/// and the main loop.
///
/// Each value is a single atomic, so a reader always sees either the old or
/// the new value.
#[derive(Debug)]
pub struct RuntimeTiming {
    process_delay_ms: AtomicU64,
    health_check_ms: AtomicU64,
}

/// Which values a call to [`RuntimeTiming::apply`] actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingChange {
    /// The process delay changed
    pub process_delay: bool,
    /// The health check interval changed
    pub health_check_interval: bool,
}

impl TimingChange {
    /// True if anything changed.
    pub fn any(&self) -> bool {
        self.process_delay || self.health_check_interval
    }
}

impl RuntimeTiming {
    /// Create timing with explicit values.
    pub fn new(process_delay: Duration, health_check_interval: Duration) -> Self {
        Self {
            process_delay_ms: AtomicU64::new(duration_to_ms(process_delay)),
            health_check_ms: AtomicU64::new(duration_to_ms(health_check_interval)),
        }
    }

    /// Create timing from the persisted intervals.
    pub fn from_config(intervals: &IntervalsConfig) -> Self {
        Self::new(
            Duration::from_secs(intervals.process_delay),
            Duration::from_secs(intervals.health_check),
        )
    }

    /// Delay before a newly detected directory is inspected.
    pub fn process_delay(&self) -> Duration {
        Duration::from_millis(self.process_delay_ms.load(Ordering::Acquire))
    }

    /// Interval between station health checks.
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_ms.load(Ordering::Acquire))
    }

    /// Replace the process delay. Returns true if the value changed.
    pub fn set_process_delay(&self, delay: Duration) -> bool {
        let new = duration_to_ms(delay);
        self.process_delay_ms.swap(new, Ordering::AcqRel) != new
    }

    /// Replace the health check interval. Returns true if the value changed.
    pub fn set_health_check_interval(&self, interval: Duration) -> bool {
        let new = duration_to_ms(interval);
        self.health_check_ms.swap(new, Ordering::AcqRel) != new
    }

    /// Apply server-pushed settings; zero and missing values are ignored.
    pub fn apply(&self, settings: &ServerSettings) -> TimingChange {
        let mut change = TimingChange::default();

        if let Some(secs) = settings.process_delay.filter(|s| *s > 0) {
            change.process_delay = self.set_process_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = settings.health_check_interval.filter(|s| *s > 0) {
            change.health_check_interval =
                self.set_health_check_interval(Duration::from_secs(secs));
        }

        if change.any() {
            info!(
                process_delay_secs = self.process_delay().as_secs(),
                health_check_secs = self.health_check_interval().as_secs(),
                "Applied server timing settings"
            );
        }
        change
    }
}

impl Default for RuntimeTiming {
    fn default() -> Self {
        Self::from_config(&IntervalsConfig::default())
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
