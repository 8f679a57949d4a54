//! Error types for the session layer.

use orderpick_protocol::ProtocolError;
use orderpick_store::StoreError;

/// Errors that can occur while admitting and enrolling participants.
///
/// A wrong participant code is *not* one of them: that is an
/// [`AuthOutcome::Denied`](crate::AuthOutcome::Denied).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The store refused a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored record could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
