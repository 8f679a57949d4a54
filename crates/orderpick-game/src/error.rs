//! Error types for the game layer.

use orderpick_protocol::ProtocolError;
use orderpick_store::StoreError;

/// Errors that can occur while setting up or talking to a session.
///
/// Gameplay logging never produces one of these: failed writes are
/// logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The store refused a read needed to start a session.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A dataset or record had the wrong shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A condition names a dataset that is missing, empty, or of the
    /// wrong kind. The session cannot start.
    #[error("dataset {0:?} not found")]
    DatasetNotFound(String),

    /// The session actor is gone (shut down or panicked).
    #[error("session for participant {0} is no longer running")]
    SessionClosed(String),
}
