//! Store doubles.

use deltadoc_codec::Value;
use deltadoc_storage::{
    DocumentStore, DocumentStream, InMemoryStore, Projection, Query, StorageError, StorageResult,
    UpdateDocument, WriteOptions,
};
use parking_lot::Mutex;

/// A store whose every call fails with a backend error.
#[derive(Debug, Clone)]
pub struct FailingStore {
    message: String,
}

impl FailingStore {
    /// Creates a store that fails with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn fail<T>(&self) -> StorageResult<T> {
        Err(StorageError::backend(self.message.clone()))
    }
}

impl DocumentStore for FailingStore {
    fn insert(&self, _: &str, _: Value, _: &WriteOptions) -> StorageResult<Value> {
        self.fail()
    }

    fn replace(
        &self,
        _: &str,
        _: &Query,
        _: Value,
        _: bool,
        _: &WriteOptions,
    ) -> StorageResult<u64> {
        self.fail()
    }

    fn update(
        &self,
        _: &str,
        _: &Query,
        _: &UpdateDocument,
        _: &WriteOptions,
    ) -> StorageResult<u64> {
        self.fail()
    }

    fn find_one(
        &self,
        _: &str,
        _: &Query,
        _: Option<&Projection>,
    ) -> StorageResult<Option<Value>> {
        self.fail()
    }

    fn find(&self, _: &str, _: &Query, _: Option<&Projection>) -> StorageResult<DocumentStream> {
        self.fail()
    }

    fn remove(&self, _: &str, _: &Query, _: &WriteOptions) -> StorageResult<u64> {
        self.fail()
    }
}

/// A store call, as seen by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    /// `insert` with the wire document.
    Insert(Value),
    /// `replace` with the wire document.
    Replace(Value),
    /// `update` with the operator document.
    Update(Value),
    /// `find_one` with the query conditions.
    FindOne(Value),
    /// `find` with the query conditions.
    Find(Value),
    /// `remove` with the query conditions.
    Remove(Value),
}

/// An [`InMemoryStore`] that records every call made to it.
#[derive(Debug, Default)]
pub struct RecordingStore {
    inner: InMemoryStore,
    calls: Mutex<Vec<StoreCall>>,
    write_options: Mutex<Vec<WriteOptions>>,
}

impl RecordingStore {
    /// Creates an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The calls made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// The stored documents of `collection`.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.inner.documents(collection)
    }

    /// The options passed with each write, oldest first.
    #[must_use]
    pub fn write_options(&self) -> Vec<WriteOptions> {
        self.write_options.lock().clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }

    fn record_write(&self, call: StoreCall, options: &WriteOptions) {
        self.write_options.lock().push(*options);
        self.record(call);
    }
}

fn conditions(query: &Query) -> Value {
    Value::Map(query.conditions().clone())
}

impl DocumentStore for RecordingStore {
    fn insert(
        &self,
        collection: &str,
        document: Value,
        options: &WriteOptions,
    ) -> StorageResult<Value> {
        self.record_write(StoreCall::Insert(document.clone()), options);
        self.inner.insert(collection, document, options)
    }

    fn replace(
        &self,
        collection: &str,
        query: &Query,
        document: Value,
        upsert: bool,
        options: &WriteOptions,
    ) -> StorageResult<u64> {
        self.record_write(StoreCall::Replace(document.clone()), options);
        self.inner.replace(collection, query, document, upsert, options)
    }

    fn update(
        &self,
        collection: &str,
        query: &Query,
        update: &UpdateDocument,
        options: &WriteOptions,
    ) -> StorageResult<u64> {
        self.record_write(StoreCall::Update(update.to_value()), options);
        self.inner.update(collection, query, update, options)
    }

    fn find_one(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> StorageResult<Option<Value>> {
        self.record(StoreCall::FindOne(conditions(query)));
        self.inner.find_one(collection, query, projection)
    }

    fn find(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> StorageResult<DocumentStream> {
        self.record(StoreCall::Find(conditions(query)));
        self.inner.find(collection, query, projection)
    }

    fn remove(
        &self,
        collection: &str,
        query: &Query,
        options: &WriteOptions,
    ) -> StorageResult<u64> {
        self.record_write(StoreCall::Remove(conditions(query)), options);
        self.inner.remove(collection, query, options)
    }
}
