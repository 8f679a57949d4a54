//! Participant enrollment.

use std::sync::Arc;

use chrono::Utc;
use orderpick_protocol::{
    ActionRecord, Codec, JsonCodec, ParticipantId, ParticipantRecord, SessionAggregates,
    collections,
};
use orderpick_store::{Document, DocumentStore};

use crate::SessionError;

/// Writes the per-participant documents a session logs against.
pub struct ParticipantRegistry<S> {
    store: Arc<S>,
    codec: JsonCodec,
}

impl<S: DocumentStore> ParticipantRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            codec: JsonCodec,
        }
    }

    /// Creates (or resets) the participant's document with zeroed
    /// aggregates and the assigned condition index, then writes the
    /// `start` action with `gametime: 0`.
    ///
    /// Both writes are always attempted; a failed one does not keep the
    /// other from landing.
    ///
    /// # Errors
    /// The first write failure, after both writes were tried.
    pub async fn create(
        &self,
        participant: &ParticipantId,
        configuration: usize,
    ) -> Result<(), SessionError> {
        let now = Utc::now();
        let record = ParticipantRecord {
            earnings: 0.0,
            orders_complete: 0,
            unique_sets_complete: 0,
            created_at: now,
            updated_at: now,
            configuration,
        };
        let start = ActionRecord {
            button_id: None,
            user_id: None,
            created_at: now,
            updated_at: now,
            aggregates: SessionAggregates::default(),
            details: Document::new(),
        };
        let record = self.codec.encode(&record)?;
        let start = self.codec.encode(&start)?;

        let actions = collections::actions(participant.as_str());
        let user_write = self
            .write(collections::USERS, participant.as_str(), record)
            .await;
        let start_write = self
            .write(&actions, collections::START_ACTION, start)
            .await;

        user_write.and(start_write)?;
        tracing::info!(participant = %participant, configuration, "participant created");
        Ok(())
    }

    async fn write(&self, collection: &str, id: &str, doc: Document) -> Result<(), SessionError> {
        self.store.set(collection, id, doc).await.map_err(|e| {
            tracing::warn!(collection, id, error = %e, "participant write failed");
            SessionError::from(e)
        })
    }
}
