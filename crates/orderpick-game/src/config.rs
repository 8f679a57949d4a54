//! Experiment configuration and the session state machine.

use orderpick_protocol::{Codec, ExperimentCondition, JsonCodec};
use orderpick_session::default_conditions;
use orderpick_store::Document;
use orderpick_tick::{ClockConfig, DEFAULT_TICK_INTERVAL};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// ExperimentConfig
// ---------------------------------------------------------------------------

/// The operator-managed experiment configuration, stored as
/// `MasterData/tutorialConfig`.
///
/// Every field is optional in the stored document; absent fields take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperimentConfig {
    /// Session length in seconds. Default: 120.
    pub time_limit: u64,
    /// Seconds the participant is given to think between orders. Default: 2.
    pub think_time: u64,
    /// Columns in the store grid. Default: 2.
    pub grid_size: u32,
    pub tips: bool,
    pub waiting: bool,
    pub refresh: bool,
    pub expire: bool,
    /// Whether sessions are authenticated and logged. Default: false.
    pub auth: bool,
    /// How many orders are on offer at once. Default: 4.
    pub orders_shown: usize,
    /// Conditions to rotate through. Default: the single tutorial
    /// condition.
    #[serde(deserialize_with = "nullable_list")]
    pub conditions: Vec<ExperimentCondition>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            time_limit: 120,
            think_time: 2,
            grid_size: 2,
            tips: false,
            waiting: false,
            refresh: false,
            expire: false,
            auth: false,
            orders_shown: 4,
            conditions: default_conditions(),
        }
    }
}

fn nullable_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The stored document as written by operators: any field may be absent,
/// null, or of the wrong type. Each unusable field is dropped on its own.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConfig {
    #[serde(default, deserialize_with = "lenient")]
    time_limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    think_time: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    grid_size: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    tips: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    waiting: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    refresh: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    expire: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    auth: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    orders_shown: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    conditions: Option<Vec<ExperimentCondition>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match T::deserialize(&value) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "unusable config value ignored");
            Ok(None)
        }
    }
}

impl ExperimentConfig {
    /// Builds the configuration from the stored document.
    ///
    /// A missing document yields the defaults. Within a document, each
    /// absent, null or mistyped field keeps its default while the other
    /// fields are still applied, and an empty condition list yields the
    /// default condition. All of these are logged as warnings, never errors.
    pub fn from_document(doc: Option<Document>) -> Self {
        let Some(doc) = doc else {
            tracing::warn!("experiment config not found; using defaults");
            return Self::default();
        };
        let stored: StoredConfig = match JsonCodec.decode(doc) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "experiment config unreadable; using defaults");
                return Self::default();
            }
        };

        let defaults = Self::default();
        let mut config = Self {
            time_limit: stored.time_limit.unwrap_or(defaults.time_limit),
            think_time: stored.think_time.unwrap_or(defaults.think_time),
            grid_size: stored.grid_size.unwrap_or(defaults.grid_size),
            tips: stored.tips.unwrap_or(defaults.tips),
            waiting: stored.waiting.unwrap_or(defaults.waiting),
            refresh: stored.refresh.unwrap_or(defaults.refresh),
            expire: stored.expire.unwrap_or(defaults.expire),
            auth: stored.auth.unwrap_or(defaults.auth),
            orders_shown: stored.orders_shown.unwrap_or(defaults.orders_shown),
            conditions: stored.conditions.unwrap_or_default(),
        };
        if config.conditions.is_empty() {
            tracing::warn!("experiment config has no conditions; using the default tutorial condition");
            config.conditions = defaults.conditions;
        }
        config
    }

    /// Clock settings for a session under this configuration.
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            time_limit_secs: self.time_limit,
            tick_interval: DEFAULT_TICK_INTERVAL,
            grace_secs: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The lifecycle state of a running session.
///
/// ```text
/// InProgress → Finished → Closed
/// ```
///
/// - **InProgress**: the clock is running or paused; gameplay events are
///   logged.
/// - **Finished**: the time limit was reached and the final aggregates
///   were written. Further gameplay events are dropped.
/// - **Closed**: the session actor was shut down. A session can be closed
///   straight from `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    InProgress,
    Finished,
    Closed,
}

impl SessionPhase {
    /// Returns `true` while gameplay events are accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::InProgress, Self::Finished)
                | (Self::InProgress, Self::Closed)
                | (Self::Finished, Self::Closed)
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}
