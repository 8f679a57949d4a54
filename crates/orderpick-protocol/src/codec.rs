//! Conversion between typed records and stored documents.
//!
//! Everything the engine persists goes through a [`Codec`]: records are
//! plain serde types, the store only understands [`Document`]s.

use orderpick_store::Document;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::ProtocolError;

/// Encodes records into documents and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a record into a document.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if serialization fails,
    /// [`ProtocolError::NotADocument`] if the value is not an object.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Document, ProtocolError>;

    /// Deserializes a document into a record.
    ///
    /// # Errors
    /// [`ProtocolError::Decode`] if the document has the wrong shape.
    fn decode<T: DeserializeOwned>(&self, doc: Document) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that maps records through `serde_json::Value`.
///
/// ```rust
/// use orderpick_protocol::{AuthRecord, AuthStatus, Codec, JsonCodec, ParticipantId};
///
/// let codec = JsonCodec;
/// let record = AuthRecord {
///     userid: ParticipantId::new("p1"),
///     status: AuthStatus::Pending,
/// };
///
/// let doc = codec.encode(&record).unwrap();
/// assert_eq!(doc["status"], 1);
///
/// let decoded: AuthRecord = codec.decode(doc).unwrap();
/// assert_eq!(decoded, record);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Document, ProtocolError> {
        match serde_json::to_value(value).map_err(ProtocolError::Encode)? {
            Value::Object(doc) => Ok(doc),
            other => Err(ProtocolError::NotADocument(other.to_string())),
        }
    }

    fn decode<T: DeserializeOwned>(&self, doc: Document) -> Result<T, ProtocolError> {
        serde_json::from_value(Value::Object(doc)).map_err(ProtocolError::Decode)
    }
}
