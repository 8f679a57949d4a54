//! Integration tests for admitting participants: codes, auth records, and
//! condition assignment against a shared store.

use std::sync::Arc;

use orderpick_protocol::{ExperimentCondition, ParticipantId};
use orderpick_session::{
    AuthOutcome, Authenticator, ConditionAssigner, TokenAuthenticator, complete_id_for,
    generate_token, is_well_formed,
};
use orderpick_store::{Document, DocumentStore, MemoryStore, StoreError};
use serde_json::json;
use tokio::sync::Barrier;

fn doc(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn conditions(n: usize) -> Vec<ExperimentCondition> {
    (0..n)
        .map(|i| ExperimentCondition {
            name: format!("C{i}"),
            order_file: format!("order_{i}.json"),
            store_file: "stores.json".into(),
        })
        .collect()
}

// =========================================================================
// Authentication round trip
// =========================================================================

#[tokio::test]
async fn test_round_trip_first_use_then_verified_record() {
    let store = Arc::new(MemoryStore::new());
    let auth = TokenAuthenticator::new(Arc::clone(&store));
    let p1 = ParticipantId::new("p1");
    let token = generate_token("p1");

    // First use: one pending record keyed by the token.
    let first = auth.authenticate(&p1, token.as_str()).await.unwrap();
    assert_eq!(first, AuthOutcome::Granted);
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.ids("Auth").await, vec![token.as_str().to_string()]);
    let record = store.document("Auth", token.as_str()).await.unwrap();
    assert_eq!(record["status"], 1);
    assert_eq!(record["userid"], "p1");

    // Someone outside the engine escalates the participant.
    store
        .set("Auth", "p1", doc(json!({"userid": "p1", "status": 2})))
        .await
        .unwrap();
    let writes_before = store.write_count();

    let second = auth.authenticate(&p1, token.as_str()).await.unwrap();
    assert_eq!(second, AuthOutcome::Granted);
    assert_eq!(store.write_count(), writes_before);
}

#[tokio::test]
async fn test_negative_auth_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let auth = TokenAuthenticator::new(Arc::clone(&store));

    let outcome = auth
        .authenticate(&ParticipantId::new("p1"), "WRONG-TOKN-0000-AAAA")
        .await
        .unwrap();

    assert!(!outcome.is_granted());
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_completion_code_never_authenticates() {
    let store = Arc::new(MemoryStore::new());
    let auth = TokenAuthenticator::new(Arc::clone(&store));
    let completion = complete_id_for("p1");
    assert!(is_well_formed(&completion));

    let outcome = auth
        .authenticate(&ParticipantId::new("p1"), completion.as_str())
        .await
        .unwrap();

    assert_eq!(outcome, AuthOutcome::Denied);
}

// =========================================================================
// Counter race
// =========================================================================

/// Holds every counter read until `parties` sessions have read it, forcing
/// the interleaving where all reads land before any increment.
struct LockstepStore {
    inner: MemoryStore,
    barrier: Barrier,
}

impl DocumentStore for LockstepStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let doc = self.inner.get(collection, id).await;
        if collection == "Global" {
            self.barrier.wait().await;
        }
        doc
    }

    async fn set(&self, collection: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        self.inner.set(collection, id, doc).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
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

#[tokio::test]
async fn test_concurrent_assignments_can_share_a_condition() {
    let store = Arc::new(LockstepStore {
        inner: MemoryStore::new()
            .with_document("Global", "totalusers", doc(json!({"count": 7}))),
        barrier: Barrier::new(2),
    });
    let a = ConditionAssigner::new(Arc::clone(&store));
    let b = ConditionAssigner::new(Arc::clone(&store));
    let conds = conditions(3);

    let (first, second) = tokio::join!(a.assign(&conds), b.assign(&conds));

    // Read-then-increment is two calls: both sessions saw 7.
    assert_eq!(first.index, 1);
    assert_eq!(second.index, 1);
    // Both increments still landed.
    let counter = store.inner.document("Global", "totalusers").await.unwrap();
    assert_eq!(counter["count"], 9);
}

#[tokio::test]
async fn test_sequential_assignments_spread_across_conditions() {
    let store = Arc::new(
        MemoryStore::new().with_document("Global", "totalusers", doc(json!({"count": 7}))),
    );
    let assigner = ConditionAssigner::new(Arc::clone(&store));
    let conds = conditions(3);

    let first = assigner.assign(&conds).await;
    let second = assigner.assign(&conds).await;

    assert_eq!((first.index, second.index), (1, 2));
}
