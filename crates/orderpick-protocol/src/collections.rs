//! Where things live in the document store.

/// Collection holding the global counter document.
pub const GLOBAL: &str = "Global";
/// Id of the session-creation counter inside [`GLOBAL`].
pub const COUNTER_DOC: &str = "totalusers";
/// Integer field of the counter document.
pub const COUNTER_FIELD: &str = "count";

/// Auth records, keyed by raw identity or by verified token.
pub const AUTH: &str = "Auth";

/// One document per participant holding their aggregate stats.
pub const USERS: &str = "Users";

/// Operator-managed configuration and datasets.
pub const MASTER_DATA: &str = "MasterData";
/// Experiment configuration document inside [`MASTER_DATA`].
pub const CONFIG_DOC: &str = "tutorialConfig";
/// Default scenario-set document inside [`MASTER_DATA`].
pub const SCENARIOS_DOC: &str = "experimentScenarios";

/// Id of the action record written when a participant is created.
pub const START_ACTION: &str = "start";

/// The action sub-collection of a participant.
pub fn actions(participant: &str) -> String {
    format!("{USERS}/{participant}/Actions")
}

/// The order sub-collection of a participant.
pub fn orders(participant: &str) -> String {
    format!("{USERS}/{participant}/Orders")
}

/// Dataset document id for an order file, e.g. `orders_order_tutorial`.
pub fn orders_dataset(name: &str) -> String {
    format!("orders_{name}")
}

/// Dataset document id for a store file, e.g. `stores_stores`.
pub fn stores_dataset(name: &str) -> String {
    format!("stores_{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_subcollections() {
        assert_eq!(actions("p1"), "Users/p1/Actions");
        assert_eq!(orders("p1"), "Users/p1/Orders");
    }

    #[test]
    fn test_dataset_ids() {
        assert_eq!(orders_dataset("order_tutorial"), "orders_order_tutorial");
        assert_eq!(stores_dataset("stores"), "stores_stores");
    }
}
