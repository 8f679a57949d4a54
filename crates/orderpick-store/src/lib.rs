//! Persistence abstraction for orderpick.
//!
//! The experiment keeps everything in a hosted document database: one
//! document per participant, sub-collections for their actions and orders,
//! a global counter, and the auth records. This crate defines the
//! [`DocumentStore`] trait, the only surface the rest of the workspace
//! talks to, with the four calls the engine needs:
//!
//! - `get`: read a whole document (or learn that it is absent)
//! - `set`: upsert, replacing the whole document
//! - `update`: merge top-level fields into an existing document
//! - `increment`: add to an integer field atomically
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryStore`], an in-process implementation
//!   used by tests and the demo binary.

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::StoreError;
#[cfg(feature = "memory")]
pub use memory::MemoryStore;

use std::future::Future;

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// A hosted document database addressed by `(collection path, document id)`.
///
/// Collection paths may be nested (`Users/p1/Actions`); the store treats
/// them as opaque strings.
///
/// The methods return `Send` futures so callers can move writes into
/// a writer task and never block gameplay on them.
pub trait DocumentStore: Send + Sync + 'static {
    /// Reads a document. `Ok(None)` means it does not exist.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Creates or fully replaces a document.
    fn set(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merges `patch` into an existing document, field by field.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the document does not exist.
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically adds `by` to an integer field of an existing document.
    /// A missing field counts as zero.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the document does not exist,
    /// [`StoreError::NotAnInteger`] if the field holds something else.
    fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
