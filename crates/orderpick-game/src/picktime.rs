//! Rough cost model for an order: walking plus grabbing.

use orderpick_protocol::Order;
use rand::Rng;
use serde_json::Value;

use crate::datasets::StoreDataset;

/// Seconds to take one unit off a shelf unless told otherwise.
pub const DEFAULT_GRAB_SECONDS: f64 = 2.0;

/// Estimated seconds to pick `order` in its store.
///
/// Walks from the store's entrance to each item in turn (Manhattan
/// distance in cells, `cell_distance` ms per cell) and adds
/// `grab_seconds_per_item` per unit. Items may be a list (one unit each)
/// or a name to quantity map. Items the store does not stock are skipped;
/// an order for an unknown store costs nothing.
pub fn estimate_pick_time(order: &Order, stores: &StoreDataset, grab_seconds_per_item: f64) -> f64 {
    let store_name = match order.details.get("store") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return 0.0,
    };
    let Some(layout) = stores.find_store(&store_name) else {
        return 0.0;
    };

    let mut position = layout.entrance;
    let mut steps = 0i64;
    let mut units = 0.0;
    for (item, qty) in line_items(order.details.get("items")) {
        let Some(next) = layout.find_item(&item) else {
            continue;
        };
        steps += (position[0] - next[0]).abs() + (position[1] - next[1]).abs();
        position = next;
        units += qty;
    }

    steps as f64 * layout.cell_distance / 1000.0 + units * grab_seconds_per_item
}

/// `(name, quantity)` pairs; a non-positive or non-numeric quantity
/// counts as one. Fractional quantities are kept as given.
fn line_items(items: Option<&Value>) -> Vec<(String, f64)> {
    match items {
        Some(Value::Array(names)) => names.iter().map(|n| (cell_text(n), 1.0)).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(name, qty)| (name.clone(), quantity(qty)))
            .collect(),
        _ => Vec::new(),
    }
}

fn quantity(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() && n > 0.0 => n,
        _ => 1.0,
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Seconds to travel between neighbouring stores: uniform in `4..=10`.
pub fn estimate_local_travel_time() -> u64 {
    estimate_local_travel_time_with(&mut rand::rng())
}

/// [`estimate_local_travel_time`] with a caller-supplied generator.
pub fn estimate_local_travel_time_with<R: Rng + ?Sized>(rng: &mut R) -> u64 {
    rng.random_range(4..=10)
}
