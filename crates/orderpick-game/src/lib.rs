//! Session runtime for orderpick.
//!
//! Each session runs as an isolated Tokio task (actor model) that owns its
//! clock, its running totals and its logger.
//!
//! # Key types
//!
//! - [`ExperimentConfig`]: the operator's configuration, every field defaulted
//! - [`DatasetLoader`]: order, store and scenario datasets from `MasterData`
//! - [`SessionLogger`]: gameplay events to fire-and-forget store writes
//! - [`SessionOrchestrator`]: admits participants and starts sessions
//! - [`SessionHandle`]: send gameplay events to a running session actor
//! - [`SessionPhase`]: lifecycle state machine

mod config;
mod datasets;
mod error;
mod logger;
mod orchestrator;
mod picktime;
mod session;

pub use config::{ExperimentConfig, SessionPhase};
pub use datasets::{
    ConditionData, DatasetLoader, Scenario, StoreDataset, StoreLayout, current_scenario,
    dataset_name,
};
pub use error::GameError;
pub use logger::SessionLogger;
pub use orchestrator::{DEFAULT_CHANNEL_SIZE, SessionOrchestrator};
pub use picktime::{
    DEFAULT_GRAB_SECONDS, estimate_local_travel_time, estimate_local_travel_time_with,
    estimate_pick_time,
};
pub use session::{SessionHandle, SessionInfo};
