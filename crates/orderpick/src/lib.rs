//! # orderpick
//!
//! Session identity and timing engine for order-picking experiments.
//!
//! orderpick admits participants with codes derived from their identity,
//! spreads them over experimental conditions, runs each session on a
//! pause-aware clock with a hard time limit, and logs every gameplay
//! event to a document store without ever blocking the game.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use orderpick::prelude::*;
//!
//! # async fn run() -> Result<(), OrderpickError> {
//! orderpick::init_tracing("info");
//!
//! let store = Arc::new(MemoryStore::new());
//! let experiment = Experiment::load(store).await;
//!
//! let code = generate_token("p1");
//! let session = experiment.enroll(ParticipantId::new("p1"), code.as_str()).await?;
//! session.action("start-round", Document::new()).await?;
//! session.shutdown().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod experiment;

pub use error::OrderpickError;
pub use experiment::{Experiment, ExperimentBuilder};

pub use orderpick_game as game;
pub use orderpick_protocol as protocol;
pub use orderpick_session as session;
pub use orderpick_store as store;
pub use orderpick_tick as tick;

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when the variable is unset or invalid.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{Experiment, ExperimentBuilder, OrderpickError, init_tracing};
    pub use orderpick_game::{
        ExperimentConfig, GameError, SessionHandle, SessionInfo, SessionPhase,
    };
    pub use orderpick_protocol::{AuthToken, Order, ParticipantId, SessionAggregates};
    pub use orderpick_session::{
        AuthOutcome, Authenticator, SessionError, TokenAuthenticator, complete_id_for,
        generate_token,
    };
    pub use orderpick_store::{Document, DocumentStore, MemoryStore, StoreError};
    pub use orderpick_tick::{ClockPhase, ClockReading};
}
