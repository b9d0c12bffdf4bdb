//! Document store trait definition.

use crate::error::StorageResult;
use crate::query::{Projection, Query};
use crate::update::UpdateDocument;
use deltadoc_codec::Value;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lazy sequence of stored documents returned by [`DocumentStore::find`].
pub type DocumentStream = Box<dyn Iterator<Item = Value> + Send>;

/// Per-write acknowledgement options.
///
/// Stores that talk to a remote server forward these; in-process stores
/// may ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Wait for the server to acknowledge the write.
    pub safe: bool,
    /// Wait for the write to reach durable storage.
    pub fsync: bool,
    /// Give up waiting for acknowledgement after this long.
    pub timeout: Duration,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            safe: true,
            fsync: false,
            timeout: Duration::from_millis(20_000),
        }
    }
}

impl WriteOptions {
    /// Sets whether writes are acknowledged.
    #[must_use]
    pub const fn safe(mut self, value: bool) -> Self {
        self.safe = value;
        self
    }

    /// Sets whether writes wait for durability.
    #[must_use]
    pub const fn fsync(mut self, value: bool) -> Self {
        self.fsync = value;
        self
    }

    /// Sets the acknowledgement timeout.
    #[must_use]
    pub const fn timeout(mut self, value: Duration) -> Self {
        self.timeout = value;
        self
    }
}

/// A document store that accepts whole-document writes and operator-shaped
/// partial updates.
///
/// Documents are maps using on-wire field names. The store owns identity:
/// `insert` assigns an `_id` when the document carries none.
///
/// # Invariants
///
/// - `insert` fails with [`crate::StorageError::DuplicateKey`] if a document
///   with the same `_id` exists in the collection
/// - `update` applies every operator of the update to each matching
///   document, or to none of them
/// - `find` returns documents in insertion order
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing and embedding
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its `_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a map, the `_id` is taken,
    /// or the transport fails.
    fn insert(&self, collection: &str, document: Value, options: &WriteOptions)
        -> StorageResult<Value>;

    /// Replaces the first document matching `query`. With `upsert`, inserts
    /// when nothing matches. Returns the number of documents written.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a map or the transport fails.
    fn replace(
        &self,
        collection: &str,
        query: &Query,
        document: Value,
        upsert: bool,
        options: &WriteOptions,
    ) -> StorageResult<u64>;

    /// Applies `update` to the first document matching `query`. Returns the
    /// number of documents modified.
    ///
    /// # Errors
    ///
    /// Returns an error if an operator cannot be applied or the transport
    /// fails.
    fn update(
        &self,
        collection: &str,
        query: &Query,
        update: &UpdateDocument,
        options: &WriteOptions,
    ) -> StorageResult<u64>;

    /// Returns the first document matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    fn find_one(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> StorageResult<Option<Value>>;

    /// Returns every document matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    fn find(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> StorageResult<DocumentStream>;

    /// Removes every document matching `query`. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    fn remove(&self, collection: &str, query: &Query, options: &WriteOptions) -> StorageResult<u64>;

    /// Counts the documents matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails.
    fn count(&self, collection: &str, query: &Query) -> StorageResult<u64> {
        Ok(self.find(collection, query, None)?.count() as u64)
    }
}
