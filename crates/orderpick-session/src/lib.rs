//! Participant identity for orderpick.
//!
//! This crate decides who may start a session and which experimental
//! condition they land in:
//!
//! 1. **Codes**: deterministic participant and completion codes derived
//!    from the identity ([`token`] module)
//! 2. **Authentication**: checking a typed code against the `Auth`
//!    collection ([`Authenticator`] trait, [`TokenAuthenticator`])
//! 3. **Assignment**: round-robin over configured conditions using the
//!    shared counter ([`ConditionAssigner`])
//! 4. **Enrollment**: writing the participant document and its `start`
//!    action ([`ParticipantRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Game Layer (above)  ← authenticates, assigns, then runs the session
//!     ↕
//! Session Layer (this crate)  ← participant identity and admission
//!     ↕
//! Protocol + Store (below)  ← record types, DocumentStore
//! ```

mod assign;
mod auth;
mod error;
mod participant;
pub mod token;

pub use assign::{Assignment, ConditionAssigner, default_conditions};
pub use auth::{AuthOutcome, Authenticator, TokenAuthenticator};
pub use error::SessionError;
pub use participant::ParticipantRegistry;
pub use token::{complete_id_for, generate_token, is_well_formed};
