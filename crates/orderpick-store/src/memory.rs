//! In-process [`DocumentStore`] backed by a `HashMap`.
//!
//! Besides serving tests and the demo, it can be told to fail reads or
//! writes so callers' degradation paths can be exercised, and it counts
//! successful writes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Document, DocumentStore, StoreError};

type Key = (String, String);

/// A [`DocumentStore`] that keeps every document in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<Key, Document>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document before the store is shared.
    pub fn with_document(
        mut self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> Self {
        self.docs
            .get_mut()
            .insert((collection.to_string(), id.to_string()), doc);
        self
    }

    /// Makes every subsequent `get` fail with [`StoreError::Unavailable`].
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with [`StoreError::Unavailable`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of writes (`set`, `update`, `increment`) that succeeded.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns a copy of a document, if present.
    pub async fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.docs
            .read()
            .await
            .get(&(collection.to_string(), id.to_string()))
            .cloned()
    }

    /// Ids of every document in a collection, sorted.
    pub async fn ids(&self, collection: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .docs
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn key(collection: &str, id: &str) -> Key {
    (collection.to_string(), id.to_string())
}

fn not_found(collection: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(self.docs.read().await.get(&key(collection, id)).cloned())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        doc: Document,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        self.docs.write().await.insert(key(collection, id), doc);
        self.record_write();
        tracing::trace!(collection, id, "document set");
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(&key(collection, id))
            .ok_or_else(|| not_found(collection, id))?;
        for (field, value) in patch {
            doc.insert(field, value);
        }
        self.record_write();
        tracing::trace!(collection, id, "document updated");
        Ok(())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError> {
        self.check_write()?;
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(&key(collection, id))
            .ok_or_else(|| not_found(collection, id))?;
        let current = match doc.get(field) {
            None => 0,
            Some(value) => value.as_i64().ok_or_else(|| StoreError::NotAnInteger {
                collection: collection.to_string(),
                id: id.to_string(),
                field: field.to_string(),
            })?,
        };
        doc.insert(field.to_string(), Value::from(current + by));
        self.record_write();
        Ok(())
    }
}
