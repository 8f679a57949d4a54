//! Record types persisted by the engine.
//!
//! Field names on the wire follow the experiment's existing collections
//! (`ordersComplete`, `bundledWith`, `userID`, ...) so downstream analysis
//! scripts keep working; the Rust side uses snake_case and serde renames.

use std::fmt;

use chrono::{DateTime, Utc};
use orderpick_store::Document;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Operator-supplied participant identity (e.g. a recruitment-platform id).
///
/// Opaque: uniqueness is the document store's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// AuthToken
// ---------------------------------------------------------------------------

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A participant code: four hyphen-separated groups of four uppercase hex
/// digits, `AAAA-BBBB-CCCC-DDDD`.
///
/// This type only guarantees the *shape*. Whether the groups carry the
/// right checksums is checked by the session layer, which also derives
/// tokens from identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AuthToken(String);

impl AuthToken {
    /// Length of the printed token, hyphens included.
    pub const LEN: usize = 19;

    /// Parses a printed token, rejecting anything that is not
    /// `^[0-9A-F]{4}(-[0-9A-F]{4}){3}$`.
    pub fn parse(s: &str) -> Result<Self, ProtocolError> {
        let bytes = s.as_bytes();
        if bytes.len() != Self::LEN {
            return Err(ProtocolError::MalformedToken(s.to_string()));
        }
        let well_formed = bytes.iter().enumerate().all(|(i, b)| {
            if i % 5 == 4 {
                *b == b'-'
            } else {
                HEX_DIGITS.contains(b)
            }
        });
        if !well_formed {
            return Err(ProtocolError::MalformedToken(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    /// Renders four groups of hex digit values (each `0..16`).
    ///
    /// Only the low nibble of each value is used.
    pub fn from_digits(groups: [[u8; 4]; 4]) -> Self {
        let mut out = String::with_capacity(Self::LEN);
        for (i, group) in groups.iter().enumerate() {
            if i > 0 {
                out.push('-');
            }
            for digit in group {
                out.push(char::from(HEX_DIGITS[usize::from(digit & 0x0F)]));
            }
        }
        Self(out)
    }

    /// The digit values of each group.
    pub fn groups(&self) -> [[u8; 4]; 4] {
        let mut groups = [[0u8; 4]; 4];
        for (g, chunk) in self.0.split('-').enumerate().take(4) {
            for (d, c) in chunk.chars().enumerate().take(4) {
                // Shape was validated on construction.
                groups[g][d] = c.to_digit(16).unwrap_or(0) as u8;
            }
        }
        groups
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AuthToken {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AuthToken> for String {
    fn from(token: AuthToken) -> Self {
        token.0
    }
}

// ---------------------------------------------------------------------------
// Auth records
// ---------------------------------------------------------------------------

/// How far a participant has progressed through authentication.
///
/// Stored as the integers `1` and `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuthStatus {
    /// Token verified on first use; written keyed by the token.
    Pending = 1,
    /// Fully authenticated. Set outside this engine.
    Verified = 2,
}

impl TryFrom<u8> for AuthStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Pending),
            2 => Ok(Self::Verified),
            other => Err(format!("unknown auth status {other}")),
        }
    }
}

impl From<AuthStatus> for u8 {
    fn from(status: AuthStatus) -> Self {
        status as u8
    }
}

/// Document in the `Auth` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub userid: ParticipantId,
    pub status: AuthStatus,
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// One experimental condition: which order and store datasets to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentCondition {
    pub name: String,
    pub order_file: String,
    pub store_file: String,
}

// ---------------------------------------------------------------------------
// Session records
// ---------------------------------------------------------------------------

/// The running totals stamped onto every log record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAggregates {
    pub earnings: f64,
    pub orders_complete: u32,
    pub unique_sets_complete: u32,
    /// Elapsed game time in whole seconds.
    pub gametime: u64,
}

/// The participant's document in `Users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub earnings: f64,
    pub orders_complete: u32,
    pub unique_sets_complete: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Index of the assigned condition.
    pub configuration: usize,
}

/// Partial update of the participant's aggregate fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatesUpdate {
    #[serde(flatten)]
    pub aggregates: SessionAggregates,
    pub updated_at: DateTime<Utc>,
}

/// A record in a participant's `Actions` sub-collection.
///
/// Gameplay actions carry the button that triggered them plus whatever
/// extra fields the UI attached; the `start` record written at creation
/// has neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    #[serde(rename = "buttonID", default, skip_serializing_if = "Option::is_none")]
    pub button_id: Option<String>,
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ParticipantId>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub aggregates: SessionAggregates,
    #[serde(flatten)]
    pub details: Document,
}

/// An order as presented to the participant.
///
/// Only `id` is interpreted; everything else (store, items, earnings, ...)
/// is carried through to the log untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(flatten)]
    pub details: Document,
}

impl Order {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            details: Document::new(),
        }
    }
}

/// Whether a logged order has been completed. Stored as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    Incomplete = 0,
    Complete = 1,
}

impl TryFrom<u8> for OrderStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Incomplete),
            1 => Ok(Self::Complete),
            other => Err(format!("unknown order status {other}")),
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status as u8
    }
}

/// A record in a participant's `Orders` sub-collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLogEntry {
    pub id: String,
    /// Elapsed game seconds when the order was taken.
    pub startgametime: u64,
    pub status: OrderStatus,
    pub bundled: bool,
    #[serde(rename = "bundleSize")]
    pub bundle_size: usize,
    /// Ids of the other orders taken in the same bundle.
    #[serde(rename = "bundledWith", default, skip_serializing_if = "Vec::is_empty")]
    pub bundled_with: Vec<String>,
    /// Ids of every order that was on offer when this one was chosen.
    pub options: Vec<String>,
    #[serde(rename = "userID")]
    pub user_id: ParticipantId,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: Document,
}

/// Status update merged into an order record when it is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCompletion {
    pub status: OrderStatus,
    pub endgametime: u64,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}
