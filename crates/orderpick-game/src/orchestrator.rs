//! Session setup: admit, assign, load, start.

use std::sync::Arc;

use orderpick_protocol::{ParticipantId, collections};
use orderpick_session::{AuthOutcome, Authenticator, ConditionAssigner, ParticipantRegistry};
use orderpick_store::DocumentStore;
use orderpick_tick::SessionClock;

use crate::session::spawn_session;
use crate::{DatasetLoader, ExperimentConfig, GameError, SessionHandle, SessionLogger};

/// Default bound of a session's command queue.
pub const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Composes admission, condition assignment, dataset loading, the clock
/// and the logger into running sessions.
///
/// One orchestrator serves every session of an experiment; each session
/// it starts is an independent actor.
pub struct SessionOrchestrator<S, A> {
    store: Arc<S>,
    authenticator: A,
    config: ExperimentConfig,
    channel_size: usize,
}

impl<S: DocumentStore, A: Authenticator> SessionOrchestrator<S, A> {
    pub fn new(store: Arc<S>, authenticator: A, config: ExperimentConfig) -> Self {
        Self {
            store,
            authenticator,
            config,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    /// Sets the bound of each session's command queue.
    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size;
        self
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Checks a participant's code.
    ///
    /// Always granted when the experiment runs without authentication.
    /// A store failure is logged and treated as a denial; the participant
    /// only ever sees "access denied".
    pub async fn authenticate(&self, participant: &ParticipantId, presented: &str) -> AuthOutcome {
        if !self.config.auth {
            tracing::debug!(participant = %participant, "authentication disabled; admitting");
            return AuthOutcome::Granted;
        }
        match self.authenticator.authenticate(participant, presented).await {
            Ok(outcome) => {
                tracing::info!(participant = %participant, ?outcome, "authentication");
                outcome
            }
            Err(e) => {
                tracing::warn!(participant = %participant, error = %e, "authentication failed on store error; denying");
                AuthOutcome::Denied
            }
        }
    }

    /// Starts a session for an admitted participant.
    ///
    /// Assigns a condition, loads its datasets, creates the participant
    /// record (authenticated experiments only), then starts the clock and
    /// the session actor.
    ///
    /// # Errors
    /// Fails only when the condition's datasets cannot be loaded; the
    /// session cannot start without them.
    pub async fn begin(&self, participant: ParticipantId) -> Result<SessionHandle, GameError> {
        let assignment = ConditionAssigner::new(Arc::clone(&self.store))
            .assign(&self.config.conditions)
            .await;

        let loader = DatasetLoader::new(Arc::clone(&self.store));
        let data = loader.load_condition(&assignment).await?;
        let scenarios = loader.load_scenarios(collections::SCENARIOS_DOC).await;

        if self.config.auth {
            let registry = ParticipantRegistry::new(Arc::clone(&self.store));
            if let Err(e) = registry.create(&participant, assignment.index).await {
                tracing::warn!(participant = %participant, error = %e, "participant record not written");
            }
        }

        let clock = SessionClock::new(self.config.clock_config());
        let logger = SessionLogger::new(Arc::clone(&self.store), participant.clone(), self.config.auth);

        tracing::info!(
            participant = %participant,
            condition = %assignment.condition.name,
            index = assignment.index,
            limit_secs = self.config.time_limit,
            "session starting"
        );
        Ok(spawn_session(
            participant,
            data,
            scenarios,
            clock,
            logger,
            self.channel_size,
        ))
    }
}
