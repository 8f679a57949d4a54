//! Order, store and scenario datasets.
//!
//! A condition names its datasets by file name (`order_tutorial.json`,
//! `stores.json`). The `.json` suffix is dropped and the rest selects a
//! document in `MasterData`: names starting with `order` are order
//! datasets (`orders_{name}`), names starting with `stores` are store
//! datasets (`stores_{name}`).

use std::sync::Arc;

use orderpick_protocol::{Codec, ExperimentCondition, JsonCodec, Order, collections};
use orderpick_session::Assignment;
use orderpick_store::{Document, DocumentStore};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::GameError;

// ---------------------------------------------------------------------------
// Store layouts
// ---------------------------------------------------------------------------

/// One store: a grid of item names plus walking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLayout {
    /// The store's name; orders refer to it in their `store` field.
    pub store: String,
    /// Rows of cells, each cell an item name (or empty).
    #[serde(default, deserialize_with = "location_rows")]
    pub locations: Vec<Vec<String>>,
    /// `[row, column]` where every pick walk starts. Default: `[0, 0]`.
    #[serde(rename = "Entrance", default)]
    pub entrance: [i64; 2],
    /// Milliseconds to walk one cell. Default: 1000.
    #[serde(rename = "cellDistance", default = "default_cell_distance")]
    pub cell_distance: f64,
    #[serde(flatten)]
    pub details: Document,
}

fn default_cell_distance() -> f64 {
    1000.0
}

impl StoreLayout {
    /// Position of the first cell whose name matches `item`
    /// (trimmed, case-insensitive), scanning row by row.
    pub fn find_item(&self, item: &str) -> Option<[i64; 2]> {
        let needle = item.trim().to_lowercase();
        self.locations.iter().enumerate().find_map(|(r, row)| {
            row.iter()
                .position(|cell| cell.trim().to_lowercase() == needle)
                .map(|c| [r as i64, c as i64])
        })
    }
}

/// Rows are persisted either as plain arrays or wrapped as
/// `{"cells": [...]}`; anything else decodes as an empty row.
fn location_rows<'de, D>(deserializer: D) -> Result<Vec<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(rows.into_iter().map(decode_row).collect())
}

fn decode_row(row: Value) -> Vec<String> {
    let cells = match row {
        Value::Array(cells) => cells,
        Value::Object(mut map) => match map.remove("cells") {
            Some(Value::Array(cells)) => cells,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    cells
        .into_iter()
        .map(|cell| match cell {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect()
}

/// The contents of a `stores_*` dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDataset {
    #[serde(default)]
    pub stores: Vec<StoreLayout>,
    /// Where the participant stands when the session starts.
    #[serde(rename = "startinglocation", default, skip_serializing_if = "Option::is_none")]
    pub starting_location: Option<String>,
    #[serde(flatten)]
    pub details: Document,
}

impl StoreDataset {
    pub fn find_store(&self, name: &str) -> Option<&StoreLayout> {
        self.stores.iter().find(|s| s.store == name)
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// One experiment round: which orders are offered and how many may be
/// bundled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub round: u32,
    pub max_bundle: u32,
    #[serde(default)]
    pub orders: Vec<Value>,
    #[serde(flatten)]
    pub details: Document,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            round: 1,
            max_bundle: 3,
            orders: Vec::new(),
            details: Document::new(),
        }
    }
}

/// The scenario for `round`: the one with that round number, else the
/// last one, else the default single round.
pub fn current_scenario(scenarios: &[Scenario], round: u32) -> Scenario {
    scenarios
        .iter()
        .find(|s| s.round == round)
        .or_else(|| scenarios.last())
        .cloned()
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Everything a session plays with: the assigned condition and its data.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionData {
    pub index: usize,
    pub condition: ExperimentCondition,
    pub orders: Vec<Order>,
    pub stores: StoreDataset,
}

/// Strips a trailing `.json`, ignoring case.
pub fn dataset_name(file_name: &str) -> &str {
    let len = file_name.len();
    if len >= 5 && file_name.is_char_boundary(len - 5) && file_name[len - 5..].eq_ignore_ascii_case(".json") {
        &file_name[..len - 5]
    } else {
        file_name
    }
}

/// Reads datasets from `MasterData`.
pub struct DatasetLoader<S> {
    store: Arc<S>,
    codec: JsonCodec,
}

#[derive(Deserialize)]
struct OrdersDocument {
    #[serde(default)]
    orders: Option<Vec<Order>>,
}

#[derive(Deserialize)]
struct ScenariosDocument {
    #[serde(default)]
    scenarios: Option<Vec<Scenario>>,
}

impl<S: DocumentStore> DatasetLoader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            codec: JsonCodec,
        }
    }

    /// Loads an order dataset by file name.
    ///
    /// # Errors
    /// [`GameError::DatasetNotFound`] unless the name starts with `order`
    /// and the document holds a non-empty `orders` array.
    pub async fn load_orders(&self, file_name: &str) -> Result<Vec<Order>, GameError> {
        let name = dataset_name(file_name);
        if !name.starts_with("order") {
            return Err(not_found(file_name));
        }
        let Some(doc) = self
            .store
            .get(collections::MASTER_DATA, &collections::orders_dataset(name))
            .await?
        else {
            return Err(not_found(file_name));
        };
        let dataset: OrdersDocument = self.codec.decode(doc)?;
        match dataset.orders {
            Some(orders) if !orders.is_empty() => {
                tracing::debug!(dataset = name, orders = orders.len(), "order dataset loaded");
                Ok(orders)
            }
            _ => Err(not_found(file_name)),
        }
    }

    /// Loads a store dataset by file name.
    ///
    /// # Errors
    /// [`GameError::DatasetNotFound`] unless the name starts with `stores`
    /// and the document holds at least one store.
    pub async fn load_stores(&self, file_name: &str) -> Result<StoreDataset, GameError> {
        let name = dataset_name(file_name);
        if !name.starts_with("stores") {
            return Err(not_found(file_name));
        }
        let Some(doc) = self
            .store
            .get(collections::MASTER_DATA, &collections::stores_dataset(name))
            .await?
        else {
            return Err(not_found(file_name));
        };
        let dataset: StoreDataset = self.codec.decode(doc)?;
        if dataset.stores.is_empty() {
            return Err(not_found(file_name));
        }
        tracing::debug!(dataset = name, stores = dataset.stores.len(), "store dataset loaded");
        Ok(dataset)
    }

    /// Loads both datasets of an assigned condition.
    pub async fn load_condition(&self, assignment: &Assignment) -> Result<ConditionData, GameError> {
        let condition = &assignment.condition;
        let orders = self.load_orders(&condition.order_file).await;
        let stores = self.load_stores(&condition.store_file).await;
        match (orders, stores) {
            (Ok(orders), Ok(stores)) => Ok(ConditionData {
                index: assignment.index,
                condition: condition.clone(),
                orders,
                stores,
            }),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(
                    condition = %condition.name,
                    error = %e,
                    "could not load the datasets named by the condition"
                );
                Err(e)
            }
        }
    }

    /// Loads the scenario set `MasterData/{id}`.
    ///
    /// Never fails: a missing or unreadable document is an empty list.
    pub async fn load_scenarios(&self, id: &str) -> Vec<Scenario> {
        let doc = match self.store.get(collections::MASTER_DATA, id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::debug!(id, "no scenario set");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to read scenario set");
                return Vec::new();
            }
        };
        match self.codec.decode::<ScenariosDocument>(doc) {
            Ok(set) => set.scenarios.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(id, error = %e, "scenario set unreadable");
                Vec::new()
            }
        }
    }
}

fn not_found(file_name: &str) -> GameError {
    GameError::DatasetNotFound(file_name.to_string())
}
