//! Session actor: an isolated Tokio task that owns one participant's run.
//!
//! The actor owns the clock, the running totals and the logger. The
//! outside world talks to it through a [`SessionHandle`]; nothing about a
//! session is shared mutable state.

use std::sync::Arc;

use orderpick_protocol::{AuthToken, Order, ParticipantId, SessionAggregates};
use orderpick_session::complete_id_for;
use orderpick_store::{Document, DocumentStore};
use orderpick_tick::{ClockPhase, ClockReading, SessionClock};
use tokio::sync::{mpsc, oneshot, watch};

use crate::datasets::{ConditionData, Scenario, current_scenario};
use crate::{GameError, SessionLogger, SessionPhase};

/// Commands sent to a session actor through its channel.
pub(crate) enum SessionCommand {
    /// A button press from the UI.
    Action { button_id: String, details: Document },

    /// The participant took one or more orders out of `options`.
    SelectOrders {
        selected: Vec<Order>,
        options: Vec<Order>,
    },

    /// The participant finished an order.
    CompleteOrder {
        order_id: String,
        earned: f64,
        unique_set: bool,
    },

    Pause,
    Resume,
    Toggle {
        reply: oneshot::Sender<ClockPhase>,
    },

    GetInfo {
        reply: oneshot::Sender<SessionInfo>,
    },

    /// Wait for queued log writes.
    Flush { reply: oneshot::Sender<()> },

    /// Flush and stop the actor.
    Shutdown { reply: oneshot::Sender<()> },
}

/// A snapshot of a running session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub participant: ParticipantId,
    /// Index of the assigned condition.
    pub condition_index: usize,
    pub phase: SessionPhase,
    pub clock: ClockReading,
    /// Running totals, `gametime` included.
    pub aggregates: SessionAggregates,
}

/// Handle to a running session actor.
///
/// Cheap to clone. Gameplay calls are fire-and-forget: they return once
/// the command is queued, and the resulting writes happen in the
/// background.
#[derive(Clone)]
pub struct SessionHandle {
    participant: ParticipantId,
    data: Arc<ConditionData>,
    scenarios: Arc<Vec<Scenario>>,
    readings: watch::Receiver<ClockReading>,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    /// The assigned condition and its datasets.
    pub fn condition(&self) -> &ConditionData {
        &self.data
    }

    /// The scenario for `round` (see [`current_scenario`]).
    pub fn scenario(&self, round: u32) -> Scenario {
        current_scenario(&self.scenarios, round)
    }

    /// The code shown to the participant when the session is over.
    pub fn completion_code(&self) -> AuthToken {
        complete_id_for(self.participant.as_str())
    }

    /// A receiver of clock readings, one per tick and per phase change.
    pub fn subscribe(&self) -> watch::Receiver<ClockReading> {
        self.readings.clone()
    }

    /// Logs a button press.
    pub async fn action(
        &self,
        button_id: impl Into<String>,
        details: Document,
    ) -> Result<(), GameError> {
        self.send(SessionCommand::Action {
            button_id: button_id.into(),
            details,
        })
        .await
    }

    /// Logs the orders taken, as one bundle when there are several.
    pub async fn select_orders(
        &self,
        selected: Vec<Order>,
        options: Vec<Order>,
    ) -> Result<(), GameError> {
        self.send(SessionCommand::SelectOrders { selected, options })
            .await
    }

    /// Records a finished order: adds `earned` to the earnings, counts the
    /// order (and a unique set if it completed one) and logs it.
    pub async fn complete_order(
        &self,
        order_id: impl Into<String>,
        earned: f64,
        unique_set: bool,
    ) -> Result<(), GameError> {
        self.send(SessionCommand::CompleteOrder {
            order_id: order_id.into(),
            earned,
            unique_set,
        })
        .await
    }

    pub async fn pause(&self) -> Result<(), GameError> {
        self.send(SessionCommand::Pause).await
    }

    pub async fn resume(&self) -> Result<(), GameError> {
        self.send(SessionCommand::Resume).await
    }

    /// Pauses a running clock or resumes a paused one; returns the new
    /// clock phase.
    pub async fn toggle(&self) -> Result<ClockPhase, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Toggle { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    pub async fn info(&self) -> Result<SessionInfo, GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Waits until every log write issued so far has landed or failed.
    pub async fn flush(&self) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Flush { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    /// Flushes pending writes and stops the actor.
    pub async fn shutdown(&self) -> Result<(), GameError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Shutdown { reply }).await?;
        rx.await.map_err(|_| self.closed())
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), GameError> {
        self.sender.send(cmd).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> GameError {
        GameError::SessionClosed(self.participant.to_string())
    }
}

#[derive(Debug, Default)]
struct Totals {
    earnings: f64,
    orders_complete: u32,
    unique_sets_complete: u32,
}

/// The internal session state. Runs inside a Tokio task.
struct SessionActor<S> {
    participant: ParticipantId,
    condition_index: usize,
    phase: SessionPhase,
    clock: SessionClock,
    logger: SessionLogger<S>,
    totals: Totals,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl<S: DocumentStore> SessionActor<S> {
    /// Runs until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::info!(
            participant = %self.participant,
            condition = self.condition_index,
            "session actor started"
        );

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    self.observe_clock();
                    match cmd {
                        SessionCommand::Flush { reply } => {
                            self.logger.flush().await;
                            let _ = reply.send(());
                        }
                        SessionCommand::Shutdown { reply } => {
                            self.close().await;
                            let _ = reply.send(());
                            break;
                        }
                        other => self.handle(other),
                    }
                }
                tick = self.clock.tick() => {
                    if tick.game_over {
                        self.finalize();
                    }
                }
            }
        }

        self.close().await;
        tracing::info!(participant = %self.participant, "session actor stopped");
    }

    fn handle(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Action { button_id, details } => {
                if self.accepts_gameplay("action") {
                    let aggregates = self.aggregates();
                    self.logger.log_action(&button_id, details, aggregates);
                }
            }
            SessionCommand::SelectOrders { selected, options } => {
                if self.accepts_gameplay("order selection") {
                    let gametime = self.clock.elapsed_secs();
                    self.logger.log_orders(&selected, &options, gametime);
                }
            }
            SessionCommand::CompleteOrder {
                order_id,
                earned,
                unique_set,
            } => {
                if self.accepts_gameplay("order completion") {
                    self.totals.earnings += earned;
                    self.totals.orders_complete += 1;
                    if unique_set {
                        self.totals.unique_sets_complete += 1;
                    }
                    let aggregates = self.aggregates();
                    self.logger.complete_order(&order_id, aggregates);
                }
            }
            SessionCommand::Pause => self.clock.pause(),
            SessionCommand::Resume => self.clock.resume(),
            SessionCommand::Toggle { reply } => {
                let _ = reply.send(self.clock.toggle());
            }
            SessionCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            // Handled in `run`, they need to await.
            SessionCommand::Flush { .. } | SessionCommand::Shutdown { .. } => {}
        }
    }

    fn accepts_gameplay(&self, what: &'static str) -> bool {
        if self.phase.is_active() {
            return true;
        }
        tracing::debug!(
            participant = %self.participant,
            phase = %self.phase,
            event = what,
            "session over; event dropped"
        );
        false
    }

    /// Lets a command arriving between ticks see the limit crossing.
    fn observe_clock(&mut self) {
        if self.clock.observe().game_over {
            self.finalize();
        }
    }

    fn finalize(&mut self) {
        if !self.phase.can_transition_to(SessionPhase::Finished) {
            return;
        }
        self.phase = SessionPhase::Finished;
        tracing::info!(
            participant = %self.participant,
            orders_complete = self.totals.orders_complete,
            "time limit reached"
        );
        let aggregates = self.aggregates();
        self.logger.record_final(aggregates);
    }

    async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }
        self.logger.flush().await;
        self.phase = SessionPhase::Closed;
    }

    fn aggregates(&self) -> SessionAggregates {
        SessionAggregates {
            earnings: self.totals.earnings,
            orders_complete: self.totals.orders_complete,
            unique_sets_complete: self.totals.unique_sets_complete,
            gametime: self.clock.elapsed_secs(),
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            participant: self.participant.clone(),
            condition_index: self.condition_index,
            phase: self.phase,
            clock: self.clock.reading(),
            aggregates: self.aggregates(),
        }
    }
}

/// Starts the clock, spawns the actor task and returns its handle.
///
/// `channel_size` bounds the command queue; callers wait when it is full.
pub(crate) fn spawn_session<S: DocumentStore>(
    participant: ParticipantId,
    data: ConditionData,
    scenarios: Vec<Scenario>,
    mut clock: SessionClock,
    logger: SessionLogger<S>,
    channel_size: usize,
) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));
    let readings = clock.subscribe();
    clock.start();

    let actor = SessionActor {
        participant: participant.clone(),
        condition_index: data.index,
        phase: SessionPhase::InProgress,
        clock,
        logger,
        totals: Totals::default(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    SessionHandle {
        participant,
        data: Arc::new(data),
        scenarios: Arc::new(scenarios),
        readings,
        sender: tx,
    }
}
