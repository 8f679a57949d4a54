//! Record formats for orderpick.
//!
//! This crate defines what the engine writes to and reads from the
//! document store:
//!
//! - **Types** ([`AuthRecord`], [`OrderLogEntry`], [`ActionRecord`], ...):
//!   the persisted records, with the wire field names analysis scripts
//!   expect.
//! - **Tokens** ([`AuthToken`]): the printable participant code format.
//! - **Collections** ([`collections`]): where each record lives.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): records to documents and back.
//!
//! ```text
//! Store (documents) → Protocol (records) → Session / Game (behaviour)
//! ```

mod codec;
pub mod collections;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    ActionRecord, AggregatesUpdate, AuthRecord, AuthStatus, AuthToken,
    ExperimentCondition, Order, OrderCompletion, OrderLogEntry, OrderStatus,
    ParticipantId, ParticipantRecord, SessionAggregates,
};
