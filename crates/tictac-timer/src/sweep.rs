//! Periodic schedule for the registry cleanup sweep.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`SweepSchedule`].
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between sweeps. `Duration::ZERO` disables the schedule.
    pub interval: Duration,
    /// Upper bound of the random offset added to the *first* sweep, so
    /// several services started together do not sweep in lockstep.
    pub initial_jitter: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            initial_jitter: Duration::from_secs(1),
        }
    }
}

impl SweepConfig {
    /// A config that sweeps every `interval` with default settings.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// A schedule that never fires. Sweeps then only happen lazily.
    pub fn disabled() -> Self {
        Self::every(Duration::ZERO)
    }

    pub fn is_disabled(&self) -> bool {
        self.interval.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`SweepSchedule::wait_for_sweep`].
#[derive(Debug, Clone)]
pub struct SweepTick {
    /// Monotonically increasing sweep number (starts at 1).
    pub sweep: u64,
    /// `true` if this sweep fired more than 10% of an interval late.
    pub overrun: bool,
    /// Whole intervals that were skipped because of the overrun.
    pub skipped: u64,
}

/// Counters kept by the schedule.
#[derive(Debug, Clone, Default)]
pub struct SweepMetrics {
    pub total_sweeps: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Duration of the most recent sweep, as reported by
    /// [`SweepSchedule::record_sweep_end`].
    pub last_sweep_time: Duration,
    pub max_sweep_time: Duration,
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Drives a periodic sweep loop.
pub struct SweepSchedule {
    config: SweepConfig,
    sweep_count: u64,
    next_sweep: Option<Instant>,
    sweep_start: Option<Instant>,
    metrics: SweepMetrics,
}

impl SweepSchedule {
    /// Creates a schedule. The first sweep is one interval plus a random
    /// jitter away.
    pub fn new(config: SweepConfig) -> Self {
        let next_sweep = (!config.is_disabled()).then(|| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max = config.initial_jitter.as_millis() as u64;
                Duration::from_millis(rand::rng().random_range(0..=max))
            };
            Instant::now() + config.interval + jitter
        });

        if config.is_disabled() {
            debug!("sweep schedule disabled, sweeping lazily only");
        } else {
            debug!(
                interval_ms = config.interval.as_millis() as u64,
                "sweep schedule created"
            );
        }

        Self {
            config,
            sweep_count: 0,
            next_sweep,
            sweep_start: None,
            metrics: SweepMetrics::default(),
        }
    }

    /// Shorthand for `SweepSchedule::new(SweepConfig::every(interval))`.
    pub fn every(interval: Duration) -> Self {
        Self::new(SweepConfig::every(interval))
    }

    /// Waits until the next sweep is due.
    ///
    /// Pends forever when the schedule is disabled. Cancel-safe: dropping
    /// the future before it resolves changes nothing.
    ///
    /// A late sweep forgets the intervals it missed; the next one is
    /// scheduled a full interval from now.
    pub async fn wait_for_sweep(&mut self) -> SweepTick {
        let Some(next) = self.next_sweep else {
            return std::future::pending::<SweepTick>().await;
        };
        let interval = self.config.interval;

        time::sleep_until(next).await;

        let now = Instant::now();
        self.sweep_count += 1;
        self.sweep_start = Some(now);

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > interval / 10;
        let mut skipped = 0u64;

        if overrun {
            self.metrics.total_overruns += 1;
            skipped = (late_by.as_nanos() / interval.as_nanos()) as u64;
            if skipped > 0 {
                warn!(
                    sweep = self.sweep_count,
                    skipped,
                    late_ms = late_by.as_millis() as u64,
                    "sweep overrun, skipping ahead"
                );
            }
        }
        self.next_sweep = Some(now + interval);

        self.metrics.total_skipped += skipped;
        self.metrics.total_sweeps += 1;

        trace!(sweep = self.sweep_count, overrun, "sweep due");

        SweepTick {
            sweep: self.sweep_count,
            overrun,
            skipped,
        }
    }

    /// Records that the sweep started by the last `wait_for_sweep` is done.
    ///
    /// A sweep that takes longer than the interval is logged as a warning.
    pub fn record_sweep_end(&mut self) {
        let Some(start) = self.sweep_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.metrics.last_sweep_time = elapsed;
        if elapsed > self.metrics.max_sweep_time {
            self.metrics.max_sweep_time = elapsed;
        }
        if !self.config.is_disabled() && elapsed >= self.config.interval {
            warn!(
                sweep = self.sweep_count,
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = self.config.interval.as_millis() as u64,
                "sweep took longer than its interval"
            );
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.config.is_disabled()
    }

    pub fn sweep_count(&self) -> u64 {
        self.sweep_count
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }
}
