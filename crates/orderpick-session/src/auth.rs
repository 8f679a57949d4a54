//! Participant authentication.
//!
//! The engine defines the [`Authenticator`] trait: one async method that
//! takes an identity and the code the participant typed, and answers
//! granted or denied. [`TokenAuthenticator`] is the production
//! implementation backed by the `Auth` collection; tests and practice
//! deployments can plug in their own.
//!
//! A wrong code is not an error. Only persistence failures come back as
//! `Err`, and callers that face the participant turn those into a denial.

use std::future::Future;
use std::sync::Arc;

use orderpick_protocol::{
    AuthRecord, AuthStatus, Codec, JsonCodec, ParticipantId, collections,
};
use orderpick_store::DocumentStore;

use crate::SessionError;
use crate::token::generate_token;

/// The binary result of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted,
    Denied,
}

impl AuthOutcome {
    pub fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Decides whether a participant may start a session.
///
/// # Example
///
/// ```rust
/// use orderpick_protocol::ParticipantId;
/// use orderpick_session::{AuthOutcome, Authenticator, SessionError};
///
/// /// Lets everyone in. Practice sessions only.
/// struct OpenDoor;
///
/// impl Authenticator for OpenDoor {
///     async fn authenticate(
///         &self,
///         _identity: &ParticipantId,
///         _presented: &str,
///     ) -> Result<AuthOutcome, SessionError> {
///         Ok(AuthOutcome::Granted)
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Checks `presented` (the code as typed) for `identity`.
    ///
    /// # Returns
    /// - `Ok(Granted)` / `Ok(Denied)`: a definite answer
    /// - `Err(_)`: the auth records could not be read or written
    fn authenticate(
        &self,
        identity: &ParticipantId,
        presented: &str,
    ) -> impl Future<Output = Result<AuthOutcome, SessionError>> + Send;
}

/// Verifies recomputed participant codes against the `Auth` collection.
///
/// 1. An existing record keyed by the identity decides alone: status 2
///    is granted, anything lower is denied. There is no elevation path
///    here; status 2 is written by whoever finalizes participants.
/// 2. With no record, the code is recomputed from the identity and
///    compared byte for byte. A match writes one `{userid, status: 1}`
///    record keyed by the *token* and is granted; a mismatch writes
///    nothing.
pub struct TokenAuthenticator<S> {
    store: Arc<S>,
    codec: JsonCodec,
}

impl<S: DocumentStore> TokenAuthenticator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            codec: JsonCodec,
        }
    }
}

impl<S: DocumentStore> Authenticator for TokenAuthenticator<S> {
    async fn authenticate(
        &self,
        identity: &ParticipantId,
        presented: &str,
    ) -> Result<AuthOutcome, SessionError> {
        if let Some(doc) = self.store.get(collections::AUTH, identity.as_str()).await? {
            let record: AuthRecord = self.codec.decode(doc)?;
            let outcome = if record.status == AuthStatus::Verified {
                AuthOutcome::Granted
            } else {
                AuthOutcome::Denied
            };
            tracing::debug!(
                participant = %identity,
                status = ?record.status,
                ?outcome,
                "existing auth record"
            );
            return Ok(outcome);
        }

        let expected = generate_token(identity.as_str());
        if expected.as_str() != presented {
            tracing::info!(participant = %identity, "participant code mismatch");
            return Ok(AuthOutcome::Denied);
        }

        let record = AuthRecord {
            userid: identity.clone(),
            status: AuthStatus::Pending,
        };
        self.store
            .set(collections::AUTH, expected.as_str(), self.codec.encode(&record)?)
            .await?;
        tracing::info!(participant = %identity, "participant code accepted on first use");
        Ok(AuthOutcome::Granted)
    }
}
