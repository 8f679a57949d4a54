//! The pause-aware session clock.
//!
//! `elapsed = (paused_at or now) - start - pause_duration`, rounded to
//! whole seconds for display and logging. The clock runs
//! `NotStarted -> Running <-> Paused -> Finished`; `Finished` is terminal
//! and is what guarantees the game-over signal fires once.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::scheduler::{DEFAULT_TICK_INTERVAL, TickScheduler};

/// Tuning for a [`SessionClock`].
#[derive(Debug, Clone)]
pub struct ClockConfig {
    /// Session length in seconds.
    pub time_limit_secs: u64,
    /// How often the clock republishes. Default: 10 ms.
    pub tick_interval: Duration,
    /// How far past the limit a first crossing still counts as on time.
    /// Later crossings still finish the session but are logged as
    /// overshoot. Default: 2 s.
    pub grace_secs: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 120,
            tick_interval: DEFAULT_TICK_INTERVAL,
            grace_secs: 2,
        }
    }
}

impl ClockConfig {
    pub fn with_limit(time_limit_secs: u64) -> Self {
        Self {
            time_limit_secs,
            ..Default::default()
        }
    }
}

/// Where the clock is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    NotStarted,
    Running,
    Paused,
    /// The limit was reached. Terminal.
    Finished,
}

/// A published snapshot of the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub phase: ClockPhase,
}

/// The result of observing the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTick {
    pub reading: ClockReading,
    /// `true` exactly once per clock: on the observation that finished it.
    pub game_over: bool,
}

/// Pause-aware elapsed/remaining time source for one session.
///
/// Observers either poll ([`elapsed_secs`](Self::elapsed_secs),
/// [`remaining_secs`](Self::remaining_secs)) or
/// [`subscribe`](Self::subscribe) to a `watch` channel that receives a
/// reading on every tick and every phase change, the terminal one included.
pub struct SessionClock {
    config: ClockConfig,
    scheduler: TickScheduler,
    phase: ClockPhase,
    started_at: Option<Instant>,
    paused_at: Option<Instant>,
    pause_duration: Duration,
    readings: watch::Sender<ClockReading>,
}

impl SessionClock {
    pub fn new(config: ClockConfig) -> Self {
        let scheduler = TickScheduler::new(config.tick_interval);
        let (readings, _) = watch::channel(ClockReading {
            elapsed_secs: 0,
            remaining_secs: config.time_limit_secs,
            phase: ClockPhase::NotStarted,
        });
        Self {
            config,
            scheduler,
            phase: ClockPhase::NotStarted,
            started_at: None,
            paused_at: None,
            pause_duration: Duration::ZERO,
            readings,
        }
    }

    /// Records the start instant and begins ticking. No-op unless the
    /// clock has never been started.
    pub fn start(&mut self) {
        if self.phase != ClockPhase::NotStarted {
            debug!(phase = ?self.phase, "clock start ignored");
            return;
        }
        self.started_at = Some(Instant::now());
        self.phase = ClockPhase::Running;
        self.scheduler.start();
        info!(limit_secs = self.config.time_limit_secs, "session clock started");
        self.publish();
    }

    /// Freezes elapsed time and halts the tick. No-op unless running.
    pub fn pause(&mut self) {
        if self.phase != ClockPhase::Running {
            return;
        }
        self.paused_at = Some(Instant::now());
        self.phase = ClockPhase::Paused;
        self.scheduler.pause();
        debug!(elapsed_secs = self.elapsed_secs(), "session clock paused");
        self.publish();
    }

    /// Adds the time spent paused to the pause total and restarts the
    /// tick. No-op unless paused.
    pub fn resume(&mut self) {
        if self.phase != ClockPhase::Paused {
            return;
        }
        if let Some(paused_at) = self.paused_at.take() {
            self.pause_duration += Instant::now().saturating_duration_since(paused_at);
        }
        self.phase = ClockPhase::Running;
        self.scheduler.resume();
        debug!(
            elapsed_secs = self.elapsed_secs(),
            paused_total_ms = self.pause_duration.as_millis() as u64,
            "session clock resumed"
        );
        self.publish();
    }

    /// Pauses a running clock or resumes a paused one. Returns the new
    /// phase; other phases are left alone.
    pub fn toggle(&mut self) -> ClockPhase {
        match self.phase {
            ClockPhase::Running => self.pause(),
            ClockPhase::Paused => self.resume(),
            ClockPhase::NotStarted | ClockPhase::Finished => {}
        }
        self.phase
    }

    /// Unrounded elapsed time. Zero before start, the limit once finished.
    pub fn elapsed(&self) -> Duration {
        match (self.phase, self.started_at) {
            (ClockPhase::Finished, _) => Duration::from_secs(self.config.time_limit_secs),
            (_, None) => Duration::ZERO,
            (_, Some(start)) => {
                let until = self.paused_at.unwrap_or_else(Instant::now);
                until
                    .saturating_duration_since(start)
                    .saturating_sub(self.pause_duration)
            }
        }
    }

    /// Elapsed time rounded to the nearest second (halves round up).
    pub fn elapsed_secs(&self) -> u64 {
        if self.phase == ClockPhase::Finished {
            return self.config.time_limit_secs;
        }
        let ms = self.elapsed().as_millis() as u64;
        (ms + 500) / 1000
    }

    /// `max(limit - elapsed_secs, 0)`.
    pub fn remaining_secs(&self) -> u64 {
        self.config.time_limit_secs.saturating_sub(self.elapsed_secs())
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn time_limit_secs(&self) -> u64 {
        self.config.time_limit_secs
    }

    pub fn reading(&self) -> ClockReading {
        ClockReading {
            elapsed_secs: self.elapsed_secs(),
            remaining_secs: self.remaining_secs(),
            phase: self.phase,
        }
    }

    /// A receiver of published readings, starting from the latest one.
    pub fn subscribe(&self) -> watch::Receiver<ClockReading> {
        self.readings.subscribe()
    }

    /// Recomputes the reading, detects the limit crossing and publishes.
    ///
    /// The first observation with `elapsed_secs >= limit` moves the clock
    /// to `Finished`, stops the tick and returns `game_over: true`. Every
    /// later observation returns `false` with elapsed clamped at the limit.
    pub fn observe(&mut self) -> ClockTick {
        let mut game_over = false;
        if matches!(self.phase, ClockPhase::Running | ClockPhase::Paused) {
            let elapsed_secs = self.elapsed_secs();
            let limit = self.config.time_limit_secs;
            if elapsed_secs >= limit {
                if elapsed_secs > limit + self.config.grace_secs {
                    warn!(
                        elapsed_secs,
                        limit_secs = limit,
                        "time limit crossing observed late"
                    );
                }
                self.finish();
                game_over = true;
            }
        }
        let reading = self.reading();
        self.readings.send_replace(reading);
        ClockTick { reading, game_over }
    }

    /// Waits for the next tick and observes the clock.
    ///
    /// Pends forever unless the clock is running, so it is safe to poll
    /// from a `select!` loop in any phase.
    pub async fn tick(&mut self) -> ClockTick {
        self.scheduler.wait_for_tick().await;
        self.observe()
    }

    fn finish(&mut self) {
        self.phase = ClockPhase::Finished;
        self.paused_at = None;
        self.scheduler.stop();
        info!(limit_secs = self.config.time_limit_secs, "session clock finished");
    }

    fn publish(&self) {
        self.readings.send_replace(self.reading());
    }
}
