//! Unified error type for orderpick.

use orderpick_game::GameError;
use orderpick_protocol::{ParticipantId, ProtocolError};
use orderpick_session::SessionError;
use orderpick_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `orderpick` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum OrderpickError {
    /// A persistence error (unavailable, missing document).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A record could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Admission or enrollment failed on the store.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session could not start or is no longer running.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The participant's code was rejected.
    ///
    /// Store failures during authentication end up here too: the
    /// participant is only ever told "access denied".
    #[error("access denied for participant {0}")]
    AccessDenied(ParticipantId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("offline".into());
        let orderpick_err: OrderpickError = err.into();
        assert!(matches!(orderpick_err, OrderpickError::Store(_)));
        assert!(orderpick_err.to_string().contains("offline"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::MalformedToken("nope".into());
        let orderpick_err: OrderpickError = err.into();
        assert!(matches!(orderpick_err, OrderpickError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::Store(StoreError::Unavailable("down".into()));
        let orderpick_err: OrderpickError = err.into();
        assert!(matches!(orderpick_err, OrderpickError::Session(_)));
        assert!(orderpick_err.to_string().contains("down"));
    }

    #[test]
    fn test_from_game_error() {
        let err = GameError::DatasetNotFound("order_missing.json".into());
        let orderpick_err: OrderpickError = err.into();
        assert!(matches!(orderpick_err, OrderpickError::Game(_)));
        assert!(orderpick_err.to_string().contains("order_missing"));
    }

    #[test]
    fn test_access_denied_names_participant() {
        let err = OrderpickError::AccessDenied(ParticipantId::new("p7"));
        assert_eq!(err.to_string(), "access denied for participant p7");
    }
}
