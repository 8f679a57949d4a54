use std::sync::Arc;
use std::time::Duration;

use orderpick::game::{DEFAULT_GRAB_SECONDS, estimate_local_travel_time, estimate_pick_time};
use orderpick::prelude::*;
use serde_json::{Value, json};

const USAGE: &str = "usage:
  pick-session codes <participant>...
  pick-session simulate [participant] [time-limit-secs]";

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
enum Command {
    /// Print the login and completion codes of each participant.
    Codes(Vec<String>),
    /// Play one session against an in-memory store.
    Simulate { participant: String, time_limit: u64 },
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.split_first() {
        Some((cmd, rest)) if cmd == "codes" => {
            if rest.is_empty() {
                return Err("codes needs at least one participant".into());
            }
            Ok(Command::Codes(rest.to_vec()))
        }
        Some((cmd, rest)) if cmd == "simulate" => {
            let participant = rest.first().cloned().unwrap_or_else(|| "demo".to_string());
            let time_limit = match rest.get(1) {
                Some(s) => s
                    .parse()
                    .map_err(|_| format!("time limit must be whole seconds, got {s:?}"))?,
                None => 20,
            };
            Ok(Command::Simulate {
                participant,
                time_limit,
            })
        }
        Some((cmd, _)) => Err(format!("unknown command {cmd:?}")),
        None => Err("missing command".into()),
    }
}

// ---------------------------------------------------------------------------
// Demo data
// ---------------------------------------------------------------------------

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// A store holding one condition's datasets and an authenticated config.
fn demo_store(time_limit: u64) -> MemoryStore {
    MemoryStore::new()
        .with_document("Global", "totalusers", doc(json!({"count": 0})))
        .with_document(
            "MasterData",
            "tutorialConfig",
            doc(json!({"auth": true, "timeLimit": time_limit})),
        )
        .with_document(
            "MasterData",
            "orders_order_tutorial",
            doc(json!({"orders": [
                {"id": "t1", "store": "Corner Shop", "items": ["milk", "bread"], "earnings": 4},
                {"id": "t2", "store": "Corner Shop", "items": {"apples": 3}, "earnings": 6},
                {"id": "t3", "store": "Corner Shop", "items": ["eggs", "milk", "apples"], "earnings": 8}
            ]})),
        )
        .with_document(
            "MasterData",
            "stores_stores",
            doc(json!({"stores": [{
                "store": "Corner Shop",
                "Entrance": [0, 0],
                "cellDistance": 800,
                "locations": [
                    {"cells": ["", "milk", ""]},
                    {"cells": ["bread", "", "eggs"]},
                    {"cells": ["", "apples", ""]}
                ]
            }]})),
        )
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn print_codes(participants: &[String]) {
    for id in participants {
        println!("{id}\tlogin {}\tcompletion {}", generate_token(id), complete_id_for(id));
    }
}

/// Takes orders one at a time until the clock runs out, then prints the
/// participant's final record.
async fn simulate(store: Arc<MemoryStore>, participant: &str) -> Result<SessionInfo, OrderpickError> {
    let experiment = Experiment::load(Arc::clone(&store)).await;
    let code = generate_token(participant);
    let session = experiment
        .enroll(ParticipantId::new(participant), code.as_str())
        .await?;

    let orders = session.condition().orders.clone();
    let stores = session.condition().stores.clone();
    let mut readings = session.subscribe();

    'play: for order in orders.iter().cycle() {
        session
            .select_orders(vec![order.clone()], orders.clone())
            .await?;
        let work = Duration::from_secs(estimate_local_travel_time())
            + Duration::from_secs_f64(estimate_pick_time(order, &stores, DEFAULT_GRAB_SECONDS));
        tracing::info!(order = %order.id, secs = work.as_secs_f64(), "picking");

        tokio::select! {
            _ = tokio::time::sleep(work) => {
                let earned = order.details.get("earnings").and_then(Value::as_f64).unwrap_or(1.0);
                session.complete_order(order.id.clone(), earned, false).await?;
            }
            _ = readings.wait_for(|r| r.phase == ClockPhase::Finished) => break 'play,
        }
    }

    session.flush().await?;
    let info = session.info().await?;
    if let Some(record) = store.document("Users", participant).await {
        println!("{}", Value::Object(record));
    }
    println!("completion code: {}", session.completion_code());
    session.shutdown().await?;
    Ok(info)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    match command {
        Command::Codes(participants) => print_codes(&participants),
        Command::Simulate {
            participant,
            time_limit,
        } => {
            orderpick::init_tracing("info");
            let info = simulate(Arc::new(demo_store(time_limit)), &participant).await?;
            eprintln!(
                "session over after {}s: {} orders, earnings {}",
                info.clock.elapsed_secs, info.aggregates.orders_complete, info.aggregates.earnings
            );
        }
    }
    Ok(())
}
