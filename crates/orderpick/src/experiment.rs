//! `Experiment` builder and entry point.
//!
//! This is the front door of an orderpick deployment. It ties together
//! all the layers: store → session (admission) → game (running sessions).

use std::sync::Arc;

use orderpick_game::{DEFAULT_CHANNEL_SIZE, ExperimentConfig, SessionHandle, SessionOrchestrator};
use orderpick_protocol::{ParticipantId, collections};
use orderpick_session::{AuthOutcome, Authenticator, TokenAuthenticator};
use orderpick_store::DocumentStore;

use crate::OrderpickError;

/// Builder for configuring an [`Experiment`].
///
/// # Example
///
/// ```rust,ignore
/// use orderpick::prelude::*;
///
/// let experiment = Experiment::builder(store)
///     .channel_size(128)
///     .build()
///     .await;
/// let session = experiment.enroll(ParticipantId::new("p1"), &code).await?;
/// ```
pub struct ExperimentBuilder<S, A> {
    store: Arc<S>,
    authenticator: A,
    config: Option<ExperimentConfig>,
    channel_size: usize,
}

impl<S: DocumentStore> ExperimentBuilder<S, TokenAuthenticator<S>> {
    /// Creates a builder that authenticates against the `Auth` collection.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            authenticator: TokenAuthenticator::new(Arc::clone(&store)),
            store,
            config: None,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }
}

impl<S: DocumentStore, A: Authenticator> ExperimentBuilder<S, A> {
    /// Replaces the authenticator.
    pub fn authenticator<B: Authenticator>(self, authenticator: B) -> ExperimentBuilder<S, B> {
        ExperimentBuilder {
            store: self.store,
            authenticator,
            config: self.config,
            channel_size: self.channel_size,
        }
    }

    /// Uses `config` instead of reading `MasterData/tutorialConfig`.
    pub fn config(mut self, config: ExperimentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the bound of each session's command queue.
    pub fn channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size;
        self
    }

    /// Builds the experiment, reading its configuration from the store
    /// unless one was given.
    ///
    /// Never fails: a missing or unreadable configuration falls back to
    /// the defaults with a warning.
    pub async fn build(self) -> Experiment<S, A> {
        let config = match self.config {
            Some(config) => config,
            None => read_config(self.store.as_ref()).await,
        };
        tracing::info!(
            auth = config.auth,
            time_limit = config.time_limit,
            conditions = config.conditions.len(),
            "experiment configured"
        );
        let orchestrator = SessionOrchestrator::new(self.store, self.authenticator, config)
            .with_channel_size(self.channel_size);
        Experiment { orchestrator }
    }
}

async fn read_config<S: DocumentStore>(store: &S) -> ExperimentConfig {
    match store
        .get(collections::MASTER_DATA, collections::CONFIG_DOC)
        .await
    {
        Ok(doc) => ExperimentConfig::from_document(doc),
        Err(e) => {
            tracing::warn!(error = %e, "experiment config could not be read; using defaults");
            ExperimentConfig::default()
        }
    }
}

/// A configured experiment that admits participants and starts their
/// sessions.
pub struct Experiment<S, A> {
    orchestrator: SessionOrchestrator<S, A>,
}

impl<S: DocumentStore> Experiment<S, TokenAuthenticator<S>> {
    /// Creates a new builder.
    pub fn builder(store: Arc<S>) -> ExperimentBuilder<S, TokenAuthenticator<S>> {
        ExperimentBuilder::new(store)
    }

    /// Reads the configuration from the store and builds the experiment
    /// with the default authenticator.
    pub async fn load(store: Arc<S>) -> Self {
        Self::builder(store).build().await
    }
}

impl<S: DocumentStore, A: Authenticator> Experiment<S, A> {
    pub fn config(&self) -> &ExperimentConfig {
        self.orchestrator.config()
    }

    /// Admits a participant and starts their session.
    ///
    /// # Errors
    /// - [`OrderpickError::AccessDenied`]: the code was rejected, or the
    ///   auth records could not be read
    /// - [`OrderpickError::Game`]: the assigned condition's datasets are
    ///   missing; the session cannot start
    pub async fn enroll(
        &self,
        participant: ParticipantId,
        code: &str,
    ) -> Result<SessionHandle, OrderpickError> {
        if self.orchestrator.authenticate(&participant, code).await == AuthOutcome::Denied {
            return Err(OrderpickError::AccessDenied(participant));
        }
        Ok(self.orchestrator.begin(participant).await?)
    }
}
