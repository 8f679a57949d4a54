//! Error types for the protocol layer.
//!
//! A `ProtocolError` means a value could not be turned into a stored
//! document or back, or that a string does not have the shape the
//! record format requires.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization into a document failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// A stored document did not match the expected record shape.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value serialized to something other than a JSON object, so it
    /// cannot be stored as a document.
    #[error("not a document: {0}")]
    NotADocument(String),

    /// A string is not a `XXXX-XXXX-XXXX-XXXX` uppercase hex token.
    #[error("malformed token: {0:?}")]
    MalformedToken(String),
}
