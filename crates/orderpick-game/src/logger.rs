//! Gameplay events to persisted records.
//!
//! Writes are queued to a per-session writer task and never awaited by the
//! caller, so a slow or failing store cannot stall the session. The writer
//! applies them one at a time in the order they were logged. Failed writes
//! are logged and lost. [`SessionLogger::flush`] waits until everything
//! queued so far has been applied.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use orderpick_protocol::{
    ActionRecord, AggregatesUpdate, Codec, JsonCodec, Order, OrderCompletion, OrderLogEntry,
    OrderStatus, ParticipantId, SessionAggregates, collections,
};
use orderpick_store::{Document, DocumentStore};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

/// Translates gameplay events into fire-and-forget store writes.
///
/// When logging is disabled (unauthenticated sessions) every method is a
/// no-op and nothing is written.
pub struct SessionLogger<S> {
    store: Arc<S>,
    codec: JsonCodec,
    participant: ParticipantId,
    enabled: bool,
    action_counter: u64,
    queue: Option<mpsc::UnboundedSender<WriterMsg>>,
    pending: Arc<AtomicUsize>,
}

enum Write {
    Set,
    Update,
}

enum WriterMsg {
    Write {
        kind: Write,
        collection: String,
        id: String,
        doc: Document,
    },
    Flush(oneshot::Sender<()>),
}

impl<S: DocumentStore> SessionLogger<S> {
    pub fn new(store: Arc<S>, participant: ParticipantId, enabled: bool) -> Self {
        Self {
            store,
            codec: JsonCodec,
            participant,
            enabled,
            action_counter: 0,
            queue: None,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logs a button press under the id `{counter}_{button_id}`.
    ///
    /// `details` are stored alongside the record but never replace the
    /// button, participant, timestamp or aggregate fields.
    ///
    /// Returns the id used, or `None` when logging is disabled.
    pub fn log_action(
        &mut self,
        button_id: &str,
        details: Document,
        aggregates: SessionAggregates,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let id = format!("{}_{}", self.action_counter, button_id);
        self.action_counter += 1;

        let now = Utc::now();
        let record = ActionRecord {
            button_id: Some(button_id.to_string()),
            user_id: Some(self.participant.clone()),
            created_at: now,
            updated_at: now,
            aggregates,
            details: Document::new(),
        };
        self.enqueue(
            Write::Set,
            collections::actions(self.participant.as_str()),
            id.clone(),
            &record,
            details,
        );
        Some(id)
    }

    /// Logs a single order taken at `gametime`.
    pub fn log_order(&mut self, order: &Order, options: &[Order], gametime: u64) -> usize {
        self.log_orders(std::slice::from_ref(order), options, gametime)
    }

    /// Logs two orders taken together.
    pub fn log_bundled_order(
        &mut self,
        first: &Order,
        second: &Order,
        options: &[Order],
        gametime: u64,
    ) -> usize {
        self.log_orders(&[first.clone(), second.clone()], options, gametime)
    }

    /// Logs every order in `selected` as taken together at `gametime`.
    ///
    /// Each entry gets `bundleSize = selected.len()`, and, when more than
    /// one order was taken, `bundledWith` listing every *other* member.
    /// All entries share the ids of `options`. The order's own details are
    /// kept, except where they collide with a logged field. Returns the
    /// number of entries written.
    pub fn log_orders(&mut self, selected: &[Order], options: &[Order], gametime: u64) -> usize {
        if !self.enabled || selected.is_empty() {
            return 0;
        }
        let option_ids: Vec<String> = options.iter().map(|o| o.id.clone()).collect();
        let bundled = selected.len() > 1;
        let now = Utc::now();
        let collection = collections::orders(self.participant.as_str());

        for (idx, order) in selected.iter().enumerate() {
            let bundled_with = if bundled {
                selected
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, o)| o.id.clone())
                    .collect()
            } else {
                Vec::new()
            };
            let entry = OrderLogEntry {
                id: order.id.clone(),
                startgametime: gametime,
                status: OrderStatus::Incomplete,
                bundled,
                bundle_size: selected.len(),
                bundled_with,
                options: option_ids.clone(),
                user_id: self.participant.clone(),
                created_at: now,
                updated_at: now,
                details: Document::new(),
            };
            self.enqueue(
                Write::Set,
                collection.clone(),
                order.id.clone(),
                &entry,
                order.details.clone(),
            );
        }
        tracing::debug!(
            participant = %self.participant,
            orders = selected.len(),
            gametime,
            "orders logged"
        );
        selected.len()
    }

    /// Marks an order complete and updates the participant's aggregates.
    ///
    /// Two independent writes; either may land without the other.
    pub fn complete_order(&mut self, order_id: &str, aggregates: SessionAggregates) {
        if !self.enabled {
            return;
        }
        let now = Utc::now();
        let completion = OrderCompletion {
            status: OrderStatus::Complete,
            endgametime: aggregates.gametime,
            updated_at: now,
        };
        self.enqueue(
            Write::Update,
            collections::orders(self.participant.as_str()),
            order_id.to_string(),
            &completion,
            Document::new(),
        );
        self.update_aggregates(aggregates);
    }

    /// Writes the participant's final aggregates at game over.
    pub fn record_final(&mut self, aggregates: SessionAggregates) {
        if !self.enabled {
            return;
        }
        tracing::info!(
            participant = %self.participant,
            gametime = aggregates.gametime,
            earnings = aggregates.earnings,
            "recording final aggregates"
        );
        self.update_aggregates(aggregates);
    }

    /// Waits until every write queued so far has been applied or dropped.
    pub async fn flush(&mut self) {
        let Some(queue) = &self.queue else { return };
        let (done, rx) = oneshot::channel();
        if queue.send(WriterMsg::Flush(done)).is_ok() && rx.await.is_err() {
            tracing::warn!(participant = %self.participant, "log writer stopped before flushing");
        }
    }

    /// Writes queued and not yet applied.
    pub fn pending_writes(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn update_aggregates(&mut self, aggregates: SessionAggregates) {
        let update = AggregatesUpdate {
            aggregates,
            updated_at: Utc::now(),
        };
        self.enqueue(
            Write::Update,
            collections::USERS.to_string(),
            self.participant.as_str().to_string(),
            &update,
            Document::new(),
        );
    }

    /// Encodes `record` over `details` and queues the write. Fields of
    /// `record` win over same-named `details`.
    fn enqueue<T: Serialize>(
        &mut self,
        kind: Write,
        collection: String,
        id: String,
        record: &T,
        details: Document,
    ) {
        let stamped = match self.codec.encode(record) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(collection = %collection, id = %id, error = %e, "log record could not be encoded");
                return;
            }
        };
        let mut doc = details;
        doc.extend(stamped);

        if self.queue.is_none() {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_writer(
                Arc::clone(&self.store),
                rx,
                Arc::clone(&self.pending),
            ));
            self.queue = Some(tx);
        }
        let Some(queue) = &self.queue else { return };
        self.pending.fetch_add(1, Ordering::AcqRel);
        let msg = WriterMsg::Write {
            kind,
            collection,
            id,
            doc,
        };
        if let Err(mpsc::error::SendError(WriterMsg::Write { collection, id, .. })) = queue.send(msg) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(collection = %collection, id = %id, "log writer gone; event lost");
        }
    }
}

/// Applies queued writes one at a time until the logger is dropped.
async fn run_writer<S: DocumentStore>(
    store: Arc<S>,
    mut rx: mpsc::UnboundedReceiver<WriterMsg>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(msg) = rx.recv().await {
        match msg {
            WriterMsg::Write {
                kind,
                collection,
                id,
                doc,
            } => {
                let result = match kind {
                    Write::Set => store.set(&collection, &id, doc).await,
                    Write::Update => store.update(&collection, &id, doc).await,
                };
                pending.fetch_sub(1, Ordering::AcqRel);
                match result {
                    Ok(()) => tracing::trace!(collection = %collection, id = %id, "log write landed"),
                    Err(e) => tracing::warn!(collection = %collection, id = %id, error = %e, "log write failed; event lost"),
                }
            }
            WriterMsg::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use orderpick_store::{MemoryStore, StoreError};
    use serde_json::json;

    /// A store whose writes take simulated time: every `set` takes 30ms and
    /// the first update of a `Users` document takes 50ms.
    struct SlowStore {
        inner: MemoryStore,
        first_user_update: AtomicBool,
    }

    impl SlowStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                first_user_update: AtomicBool::new(true),
            }
        }
    }

    impl DocumentStore for SlowStore {
        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
            self.inner.get(collection, id).await
        }

        async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.inner.set(collection, id, doc).await
        }

        async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
            if collection == collections::USERS && self.first_user_update.swap(false, Ordering::AcqRel) {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.inner.update(collection, id, patch).await
        }

        async fn increment(
            &self,
            collection: &str,
            id: &str,
            field: &str,
            by: i64,
        ) -> Result<(), StoreError> {
            self.inner.increment(collection, id, field, by).await
        }
    }

    fn order(id: &str) -> Order {
        let mut o = Order::new(id);
        o.details.insert("store".into(), json!("Bakery"));
        o
    }

    fn aggregates(gametime: u64) -> SessionAggregates {
        SessionAggregates {
            earnings: 12.5,
            orders_complete: 2,
            unique_sets_complete: 1,
            gametime,
        }
    }

    fn logger(store: &Arc<MemoryStore>, enabled: bool) -> SessionLogger<MemoryStore> {
        SessionLogger::new(Arc::clone(store), ParticipantId::new("p1"), enabled)
    }

    #[tokio::test]
    async fn test_log_action_numbers_ids_sequentially() {
        let store = Arc::new(MemoryStore::new());
        let mut log = logger(&store, true);

        let mut details = Document::new();
        details.insert("location".into(), json!("Bakery"));
        assert_eq!(log.log_action("enter", details, aggregates(3)).as_deref(), Some("0_enter"));
        assert_eq!(log.log_action("leave", Document::new(), aggregates(4)).as_deref(), Some("1_leave"));
        log.flush().await;

        assert_eq!(store.ids("Users/p1/Actions").await, vec!["0_enter", "1_leave"]);
        let first = store.document("Users/p1/Actions", "0_enter").await.unwrap();
        assert_eq!(first["buttonID"], "enter");
        assert_eq!(first["userID"], "p1");
        assert_eq!(first["gametime"], 3);
        assert_eq!(first["earnings"], 12.5);
        assert_eq!(first["location"], "Bakery");
    }

    #[tokio::test]
    async fn test_log_action_details_do_not_override_logged_fields() {
        let store = Arc::new(MemoryStore::new());
        let mut log = logger(&store, true);

        let mut details = Document::new();
        details.insert("gametime".into(), json!(999));
        details.insert("earnings".into(), json!(0));
        details.insert("buttonID".into(), json!("forged"));
        details.insert("location".into(), json!("Bakery"));
        log.log_action("enter", details, aggregates(3));
        log.flush().await;

        let record = store.document("Users/p1/Actions", "0_enter").await.unwrap();
        assert_eq!(record["gametime"], 3);
        assert_eq!(record["earnings"], 12.5);
        assert_eq!(record["buttonID"], "enter");
        assert_eq!(record["location"], "Bakery");
    }

    #[tokio::test]
    async fn test_log_order_details_do_not_override_logged_fields() {
        let store = Arc::new(MemoryStore::new());
        let mut log = logger(&store, true);

        let mut o = order("o1");
        o.details.insert("status".into(), json!(1));
        o.details.insert("bundled".into(), json!(true));
        o.details.insert("startgametime".into(), json!(500));
        log.log_order(&o, &[], 7);
        log.flush().await;

        let entry = store.document("Users/p1/Orders", "o1").await.unwrap();
        assert_eq!(entry["status"], 0);
        assert_eq!(entry["bundled"], false);
        assert_eq!(entry["startgametime"], 7);
        assert_eq!(entry["store"], "Bakery");
    }

    #[tokio::test]
    async fn test_log_order_single_is_not_bundled() {
        let store = Arc::new(MemoryStore::new());
        let mut log = logger(&store, true);

        log.log_order(&order("o1"), &[order("o1"), order("o2")], 7);
        log.flush().await;

        let entry = store.document("Users/p1/Orders", "o1").await.unwrap();
        assert_eq!(entry["bundled"], false);
        assert_eq!(entry["bundleSize"], 1);
        assert!(entry.get("bundledWith").is_none());
        assert_eq!(entry["options"], json!(["o1", "o2"]));
        assert_eq!(entry["startgametime"], 7);
        assert_eq!(entry["status"], 0);
        assert_eq!(entry["store"], "Bakery");
    }

    #[tokio::test]
    async fn test_log_bundled_order_references_each_other() {
        let store = Arc::new(MemoryStore::new());
        let mut log = logger(&store, true);

        log.log_bundled_order(&order("o1"), &order("o2"), &[order("o1"), order("o2")], 9);
        log.flush().await;

        let a = store.document("Users/p1/Orders", "o1").await.unwrap();
        let b = store.document("Users/p1/Orders", "o2").await.unwrap();
        assert_eq!(a["bundledWith"], json!(["o2"]));
        assert_eq!(b["bundledWith"], json!(["o1"]));
        assert_eq!(a["bundleSize"], 2);
    }

    #[tokio::test]
    async fn test_complete_order_updates_entry_and_participant() {
        let store = Arc::new(
            MemoryStore::new()
                .with_document("Users", "p1", Document::new())
                .with_document("Users/p1/Orders", "o1", Document::new()),
        );
        let mut log = logger(&store, true);

        log.complete_order("o1", aggregates(30));
        log.flush().await;

        let entry = store.document("Users/p1/Orders", "o1").await.unwrap();
        assert_eq!(entry["status"], 1);
        assert_eq!(entry["endgametime"], 30);
        let user = store.document("Users", "p1").await.unwrap();
        assert_eq!(user["ordersComplete"], 2);
        assert_eq!(user["gametime"], 30);
        assert!(user.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn test_complete_order_one_write_failing_does_not_stop_the_other() {
        // No order entry exists, so the status update fails; the aggregate
        // update still lands.
        let store = Arc::new(MemoryStore::new().with_document("Users", "p1", Document::new()));
        let mut log = logger(&store, true);

        log.complete_order("ghost", aggregates(30));
        log.flush().await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(store.document("Users", "p1").await.unwrap()["gametime"], 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_land_in_logged_order_on_slow_store() {
        let store = Arc::new(SlowStore::new(
            MemoryStore::new().with_document("Users", "p1", Document::new()),
        ));
        let mut log = SessionLogger::new(Arc::clone(&store), ParticipantId::new("p1"), true);

        log.log_order(&order("o1"), &[], 0);
        log.complete_order("o1", aggregates(30));
        log.record_final(aggregates(120));
        assert_eq!(log.pending_writes(), 4);
        log.flush().await;

        assert_eq!(log.pending_writes(), 0);
        let user = store.inner.document("Users", "p1").await.unwrap();
        assert_eq!(user["gametime"], 120);
        let entry = store.inner.document("Users/p1/Orders", "o1").await.unwrap();
        assert_eq!(entry["status"], 1);
        assert_eq!(entry["endgametime"], 30);
    }

    #[tokio::test]
    async fn test_disabled_logger_writes_nothing() {
        let store = Arc::new(MemoryStore::new().with_document("Users", "p1", Document::new()));
        let mut log = logger(&store, false);

        assert!(log.log_action("enter", Document::new(), aggregates(1)).is_none());
        assert_eq!(log.log_orders(&[order("o1"), order("o2")], &[], 1), 0);
        log.complete_order("o1", aggregates(2));
        log.record_final(aggregates(3));
        log.flush().await;

        assert_eq!(store.write_count(), 0);
        assert_eq!(log.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_failed_writes_are_dropped_not_retried() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let mut log = logger(&store, true);

        log.log_order(&order("o1"), &[], 0);
        log.flush().await;
        store.fail_writes(false);
        log.flush().await;

        assert!(store.ids("Users/p1/Orders").await.is_empty());
    }
}
