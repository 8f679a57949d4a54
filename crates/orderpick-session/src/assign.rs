//! Round-robin condition assignment.
//!
//! Each new session reads the global counter, takes it modulo the number
//! of configured conditions, then bumps the counter. The read and the
//! increment are two separate store calls: two sessions starting at the
//! same moment can read the same value and land in the same condition.

use std::sync::Arc;

use orderpick_protocol::{ExperimentCondition, collections};
use orderpick_store::DocumentStore;

/// The condition used when none are configured.
pub fn default_conditions() -> Vec<ExperimentCondition> {
    vec![ExperimentCondition {
        name: "Tutorial".to_string(),
        order_file: "order_tutorial.json".to_string(),
        store_file: "stores.json".to_string(),
    }]
}

/// The outcome of an assignment: the index and the condition it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub index: usize,
    pub condition: ExperimentCondition,
}

/// Picks a condition for each new session from the shared counter.
pub struct ConditionAssigner<S> {
    store: Arc<S>,
}

impl<S: DocumentStore> ConditionAssigner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Assigns a condition from `conditions`.
    ///
    /// - empty list: falls back to [`default_conditions`] (warning logged)
    /// - one condition: index 0, the counter is not touched
    /// - several: `counter mod len`, then the counter is incremented
    ///
    /// Never fails: an unreadable counter counts as 0 and a failed
    /// increment is logged and ignored.
    pub async fn assign(&self, conditions: &[ExperimentCondition]) -> Assignment {
        let fallback;
        let conditions = if conditions.is_empty() {
            tracing::warn!("no conditions configured; using the default tutorial condition");
            fallback = default_conditions();
            fallback.as_slice()
        } else {
            conditions
        };

        let index = if conditions.len() > 1 {
            let value = self.read_counter().await;
            self.bump_counter().await;
            (value % conditions.len() as u64) as usize
        } else {
            0
        };

        let condition = conditions[index].clone();
        tracing::info!(index, condition = %condition.name, "condition assigned");
        Assignment { index, condition }
    }

    async fn read_counter(&self) -> u64 {
        match self
            .store
            .get(collections::GLOBAL, collections::COUNTER_DOC)
            .await
        {
            Ok(Some(doc)) => match doc.get(collections::COUNTER_FIELD).and_then(|v| v.as_u64()) {
                Some(count) => count,
                None => {
                    tracing::warn!("session counter has no usable count; treating as 0");
                    0
                }
            },
            Ok(None) => {
                tracing::warn!("session counter document missing; treating as 0");
                0
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session counter; treating as 0");
                0
            }
        }
    }

    async fn bump_counter(&self) {
        if let Err(e) = self
            .store
            .increment(
                collections::GLOBAL,
                collections::COUNTER_DOC,
                collections::COUNTER_FIELD,
                1,
            )
            .await
        {
            tracing::warn!(error = %e, "failed to increment session counter");
        }
    }
}
