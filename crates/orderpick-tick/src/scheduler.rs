//! The periodic tick behind the session clock.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

/// Tick width used by the session clock unless configured otherwise.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stopped,
    Running,
    Paused,
}

/// A single logical periodic tick.
///
/// Created stopped. While stopped or paused, [`wait_for_tick`] pends
/// forever, which lets it sit in a `select!` next to other branches.
/// Late ticks are never replayed: the next deadline is always scheduled
/// from the moment the tick actually fired.
///
/// [`wait_for_tick`]: TickScheduler::wait_for_tick
pub struct TickScheduler {
    interval: Duration,
    tick_count: u64,
    next_tick: Option<Instant>,
    mode: Mode,
}

impl TickScheduler {
    /// Creates a stopped scheduler. A zero interval is raised to 1 ms.
    pub fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("tick interval of zero requested; using 1ms");
            Duration::from_millis(1)
        } else {
            interval
        };
        debug!(interval_ms = interval.as_secs_f64() * 1000.0, "tick scheduler created");
        Self {
            interval,
            tick_count: 0,
            next_tick: None,
            mode: Mode::Stopped,
        }
    }

    /// Starts ticking, first tick one interval from now.
    ///
    /// Only acts on a stopped scheduler; use [`resume`](Self::resume)
    /// after a pause.
    pub fn start(&mut self) {
        if self.mode == Mode::Stopped {
            self.mode = Mode::Running;
            self.next_tick = Some(Instant::now() + self.interval);
            debug!("tick scheduler started");
        }
    }

    /// Pauses ticking. Idempotent.
    pub fn pause(&mut self) {
        if self.mode == Mode::Running {
            self.mode = Mode::Paused;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Resumes after a pause, next tick one interval from now so the time
    /// spent paused produces no burst of ticks. Idempotent.
    pub fn resume(&mut self) {
        if self.mode == Mode::Paused {
            self.mode = Mode::Running;
            self.next_tick = Some(Instant::now() + self.interval);
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    /// Stops ticking for good (until [`start`](Self::start) is called again).
    pub fn stop(&mut self) {
        if self.mode != Mode::Stopped {
            self.mode = Mode::Stopped;
            self.next_tick = None;
            debug!(tick = self.tick_count, "tick scheduler stopped");
        }
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever while stopped or paused. A tick that fires late is
    /// not made up for: the next one is due one interval after it.
    pub async fn wait_for_tick(&mut self) {
        let next = match self.next_tick {
            Some(next) if self.mode == Mode::Running => next,
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        if late_by > self.interval / 10 {
            let skipped = late_by.as_nanos() / self.interval.as_nanos();
            if skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = skipped as u64,
                    late_ms = late_by.as_secs_f64() * 1000.0,
                    "tick overrun, skipping ahead"
                );
            }
        }
        self.next_tick = Some(now + self.interval);

        trace!(tick = self.tick_count, "tick fired");
    }

    pub fn is_running(&self) -> bool {
        self.mode == Mode::Running
    }

    pub fn is_paused(&self) -> bool {
        self.mode == Mode::Paused
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
