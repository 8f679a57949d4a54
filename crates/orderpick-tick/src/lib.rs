//! Session timing for orderpick.
//!
//! Two pieces:
//!
//! - [`TickScheduler`]: one logical periodic tick that can be started,
//!   paused, resumed and stopped without ever spawning a second ticker.
//! - [`SessionClock`]: the pause-aware elapsed/remaining time source for a
//!   session. It owns a scheduler, publishes a [`ClockReading`] on every
//!   tick and state change, and reports the time-limit crossing exactly
//!   once.
//!
//! # Integration
//!
//! The clock is designed to sit inside a session actor's `tokio::select!`
//! loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         Some(cmd) = cmd_rx.recv() => { /* pause, resume, log events */ }
//!         tick = clock.tick() => {
//!             if tick.game_over {
//!                 /* persist final aggregates exactly once */
//!             }
//!         }
//!     }
//! }
//! ```

mod clock;
mod scheduler;

pub use clock::{ClockConfig, ClockPhase, ClockReading, ClockTick, SessionClock};
pub use scheduler::{DEFAULT_TICK_INTERVAL, TickScheduler};
