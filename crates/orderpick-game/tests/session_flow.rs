//! Integration tests for running sessions against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use orderpick_game::{ExperimentConfig, GameError, SessionOrchestrator, SessionPhase};
use orderpick_protocol::{Order, ParticipantId};
use orderpick_session::{AuthOutcome, TokenAuthenticator, complete_id_for, generate_token};
use orderpick_store::{Document, MemoryStore};
use orderpick_tick::ClockPhase;
use serde_json::json;

// =========================================================================
// Helpers
// =========================================================================

fn doc(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn seeded_store() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_document("Global", "totalusers", doc(json!({"count": 0})))
            .with_document(
                "MasterData",
                "orders_order_tutorial",
                doc(json!({"orders": [
                    {"id": "o1", "store": "Bakery", "items": ["bread"]},
                    {"id": "o2", "store": "Bakery", "items": ["cake"]},
                    {"id": "o3", "store": "Bakery", "items": ["bread", "cake"]},
                    {"id": "o4", "store": "Bakery", "items": {"bread": 2}}
                ]})),
            )
            .with_document(
                "MasterData",
                "stores_stores",
                doc(json!({"stores": [{
                    "store": "Bakery",
                    "locations": [["", "bread"], ["cake", ""]]
                }]})),
            )
            .with_document(
                "MasterData",
                "experimentScenarios",
                doc(json!({"scenarios": [
                    {"round": 1, "max_bundle": 2, "orders": ["o1", "o2"]},
                    {"round": 2, "max_bundle": 3, "orders": ["o3"]}
                ]})),
            ),
    )
}

fn config(auth: bool, time_limit: u64) -> ExperimentConfig {
    ExperimentConfig {
        auth,
        time_limit,
        ..Default::default()
    }
}

fn orchestrator(
    store: &Arc<MemoryStore>,
    config: ExperimentConfig,
) -> SessionOrchestrator<MemoryStore, TokenAuthenticator<MemoryStore>> {
    SessionOrchestrator::new(
        Arc::clone(store),
        TokenAuthenticator::new(Arc::clone(store)),
        config,
    )
}

fn orders(ids: &[&str]) -> Vec<Order> {
    ids.iter().map(|id| Order::new(*id)).collect()
}

// =========================================================================
// Admission
// =========================================================================

#[tokio::test]
async fn test_authenticate_right_code_is_granted() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(true, 120));
    let p1 = ParticipantId::new("p1");

    let outcome = orch.authenticate(&p1, generate_token("p1").as_str()).await;

    assert_eq!(outcome, AuthOutcome::Granted);
}

#[tokio::test]
async fn test_authenticate_store_failure_is_a_denial() {
    let store = seeded_store();
    store.fail_reads(true);
    let orch = orchestrator(&store, config(true, 120));

    let outcome = orch
        .authenticate(&ParticipantId::new("p1"), generate_token("p1").as_str())
        .await;

    assert_eq!(outcome, AuthOutcome::Denied);
}

#[tokio::test]
async fn test_authenticate_disabled_admits_anyone() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(false, 120));

    let outcome = orch.authenticate(&ParticipantId::new("p1"), "nonsense").await;

    assert_eq!(outcome, AuthOutcome::Granted);
    assert_eq!(store.write_count(), 0);
}

// =========================================================================
// Setup
// =========================================================================

#[tokio::test]
async fn test_begin_creates_participant_and_loads_condition() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(true, 120));

    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();

    assert_eq!(session.condition().index, 0);
    assert_eq!(session.condition().orders.len(), 4);
    assert_eq!(session.scenario(2).max_bundle, 3);
    assert_eq!(session.scenario(7).round, 2);
    let user = store.document("Users", "p1").await.unwrap();
    assert_eq!(user["configuration"], 0);
    assert!(store.document("Users/p1/Actions", "start").await.is_some());
    assert_eq!(session.completion_code(), complete_id_for("p1"));

    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_begin_rotates_conditions_via_counter() {
    let store = Arc::new(
        MemoryStore::new()
            .with_document("Global", "totalusers", doc(json!({"count": 7})))
            .with_document("MasterData", "orders_order_a", doc(json!({"orders": [{"id": "a1"}]})))
            .with_document("MasterData", "orders_order_b", doc(json!({"orders": [{"id": "b1"}]})))
            .with_document("MasterData", "stores_stores", doc(json!({"stores": [{"store": "S"}]}))),
    );
    let mut cfg = config(false, 120);
    cfg.conditions = serde_json::from_value(json!([
        {"name": "A", "order_file": "order_a.json", "store_file": "stores.json"},
        {"name": "B", "order_file": "order_b.json", "store_file": "stores.json"},
        {"name": "C", "order_file": "order_a.json", "store_file": "stores.json"}
    ]))
    .unwrap();
    let orch = orchestrator(&store, cfg);

    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();

    assert_eq!(session.condition().index, 1);
    assert_eq!(session.condition().orders[0].id, "b1");
    session.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_begin_missing_datasets_cannot_start() {
    let store = Arc::new(MemoryStore::new());
    let orch = orchestrator(&store, config(true, 120));

    let result = orch.begin(ParticipantId::new("p1")).await;

    assert!(matches!(result, Err(GameError::DatasetNotFound(_))));
    assert!(store.document("Users", "p1").await.is_none());
}

// =========================================================================
// Gameplay logging
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_select_orders_three_way_bundle_is_symmetric() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(true, 120));
    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();

    session
        .select_orders(orders(&["o1", "o2", "o3"]), orders(&["o1", "o2", "o3", "o4"]))
        .await
        .unwrap();
    session.flush().await.unwrap();

    assert_eq!(store.ids("Users/p1/Orders").await, vec!["o1", "o2", "o3"]);
    for (id, others) in [("o1", ["o2", "o3"]), ("o2", ["o1", "o3"]), ("o3", ["o1", "o2"])] {
        let entry = store.document("Users/p1/Orders", id).await.unwrap();
        assert_eq!(entry["bundleSize"], 3, "{id}");
        assert_eq!(entry["bundled"], true, "{id}");
        assert_eq!(entry["bundledWith"], json!(others), "{id}");
        assert_eq!(entry["options"], json!(["o1", "o2", "o3", "o4"]), "{id}");
    }
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_actions_and_completions_carry_running_totals() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(true, 120));
    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();

    session.select_orders(orders(&["o1"]), orders(&["o1", "o2"])).await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    session.complete_order("o1", 7.5, true).await.unwrap();
    session.action("leave-store", Document::new()).await.unwrap();
    session.flush().await.unwrap();

    let info = session.info().await.unwrap();
    assert_eq!(info.aggregates.earnings, 7.5);
    assert_eq!(info.aggregates.orders_complete, 1);
    assert_eq!(info.aggregates.unique_sets_complete, 1);
    assert_eq!(info.aggregates.gametime, 10);

    let entry = store.document("Users/p1/Orders", "o1").await.unwrap();
    assert_eq!(entry["status"], 1);
    assert_eq!(entry["endgametime"], 10);
    let user = store.document("Users", "p1").await.unwrap();
    assert_eq!(user["earnings"], 7.5);
    assert_eq!(user["ordersComplete"], 1);

    let action = store.document("Users/p1/Actions", "0_leave-store").await.unwrap();
    assert_eq!(action["uniqueSetsComplete"], 1);
    assert_eq!(action["gametime"], 10);
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_session_writes_nothing() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(false, 1));
    let session = orch.begin(ParticipantId::new("anon")).await.unwrap();
    let mut readings = session.subscribe();

    session.select_orders(orders(&["o1", "o2"]), Vec::new()).await.unwrap();
    session.complete_order("o1", 3.0, false).await.unwrap();
    readings.wait_for(|r| r.phase == ClockPhase::Finished).await.unwrap();
    session.flush().await.unwrap();

    assert_eq!(store.write_count(), 0);
    session.shutdown().await.unwrap();
}

// =========================================================================
// Clock
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_and_toggle_freeze_game_time() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(false, 120));
    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    session.pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    let paused = session.info().await.unwrap();
    assert_eq!(paused.clock.phase, ClockPhase::Paused);
    assert_eq!(paused.clock.elapsed_secs, 3);

    assert_eq!(session.toggle().await.unwrap(), ClockPhase::Running);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(session.info().await.unwrap().clock.elapsed_secs, 4);
    assert_eq!(session.toggle().await.unwrap(), ClockPhase::Paused);
    session.resume().await.unwrap();
    assert_eq!(session.info().await.unwrap().clock.phase, ClockPhase::Running);

    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_game_over_finalizes_exactly_once() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(true, 5));
    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();
    let setup_writes = store.write_count();
    let mut readings = session.subscribe();

    readings.wait_for(|r| r.phase == ClockPhase::Finished).await.unwrap();
    session.flush().await.unwrap();
    assert_eq!(store.write_count(), setup_writes + 1);
    let user = store.document("Users", "p1").await.unwrap();
    assert_eq!(user["gametime"], 5);

    // Time keeps passing and events keep arriving; nothing more is written.
    tokio::time::sleep(Duration::from_secs(10)).await;
    session.complete_order("o1", 1.0, false).await.unwrap();
    session.action("late", Document::new()).await.unwrap();
    session.flush().await.unwrap();
    assert_eq!(store.write_count(), setup_writes + 1);

    let info = session.info().await.unwrap();
    assert_eq!(info.phase, SessionPhase::Finished);
    assert_eq!(info.clock.elapsed_secs, 5);
    assert_eq!(info.clock.remaining_secs, 0);
    assert_eq!(info.aggregates.orders_complete, 0);
    session.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_handle_after_shutdown_reports_closed() {
    let store = seeded_store();
    let orch = orchestrator(&store, config(false, 120));
    let session = orch.begin(ParticipantId::new("p1")).await.unwrap();

    session.shutdown().await.unwrap();
    // Give the actor task a chance to exit.
    tokio::task::yield_now().await;

    assert!(matches!(
        session.info().await,
        Err(GameError::SessionClosed(_))
    ));
}
