//! In-memory document store.

use crate::error::{StorageError, StorageResult};
use crate::query::{Projection, Query, ID_FIELD};
use crate::store::{DocumentStore, DocumentStream, WriteOptions};
use crate::update::UpdateDocument;
use deltadoc_codec::{DocumentId, Value};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A document store that keeps every collection in memory.
///
/// Suitable for:
/// - Unit and integration tests
/// - Embedding where persistence is not needed
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use deltadoc_codec::Value;
/// use deltadoc_storage::{DocumentStore, InMemoryStore, Query, WriteOptions};
///
/// let store = InMemoryStore::new();
/// let doc = Value::map([("title", Value::from("A"))]);
/// let id = store.insert("posts", doc, &WriteOptions::default()).unwrap();
/// let found = store.find_one("posts", &Query::by_id(id), None).unwrap();
/// assert_eq!(found.unwrap().get("title"), Some(&Value::from("A")));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every document in `collection`.
    ///
    /// Useful for testing and debugging.
    #[must_use]
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes every collection.
    pub fn clear(&self) {
        self.collections.write().clear();
    }
}

fn ensure_map(document: &Value) -> StorageResult<()> {
    if document.as_map().is_some() {
        Ok(())
    } else {
        Err(StorageError::InvalidDocument(
            "top-level value must be a map".to_string(),
        ))
    }
}

fn render_id(id: &Value) -> String {
    match id {
        Value::Id(id) => id.to_string(),
        Value::Text(text) => text.clone(),
        other => format!("{other:?}"),
    }
}

impl DocumentStore for InMemoryStore {
    fn insert(
        &self,
        collection: &str,
        mut document: Value,
        _options: &WriteOptions,
    ) -> StorageResult<Value> {
        ensure_map(&document)?;
        let id = match document.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Value::Id(DocumentId::new());
                if let Some(fields) = document.as_map_mut() {
                    fields.shift_insert(0, ID_FIELD.to_string(), id.clone());
                }
                id
            }
        };

        let mut collections = self.collections.write();
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.iter().any(|d| d.get(ID_FIELD) == Some(&id)) {
            return Err(StorageError::DuplicateKey {
                collection: collection.to_string(),
                id: render_id(&id),
            });
        }
        documents.push(document);
        Ok(id)
    }

    fn replace(
        &self,
        collection: &str,
        query: &Query,
        document: Value,
        upsert: bool,
        options: &WriteOptions,
    ) -> StorageResult<u64> {
        ensure_map(&document)?;
        {
            let mut collections = self.collections.write();
            let documents = collections.entry(collection.to_string()).or_default();
            if let Some(slot) = documents.iter_mut().find(|d| query.matches(d)) {
                let mut document = document;
                // a replacement keeps the stored identity
                let stored_id = slot.get(ID_FIELD).cloned();
                if let (Some(id), Some(fields)) = (stored_id, document.as_map_mut()) {
                    fields.shift_insert(0, ID_FIELD.to_string(), id);
                }
                *slot = document;
                return Ok(1);
            }
        }
        if upsert {
            self.insert(collection, document, options)?;
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn update(
        &self,
        collection: &str,
        query: &Query,
        update: &UpdateDocument,
        _options: &WriteOptions,
    ) -> StorageResult<u64> {
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(slot) = documents.iter_mut().find(|d| query.matches(d)) else {
            return Ok(0);
        };
        let mut next = slot.clone();
        update.apply_to(&mut next)?;
        *slot = next;
        Ok(1)
    }

    fn find_one(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> StorageResult<Option<Value>> {
        let collections = self.collections.read();
        Ok(collections.get(collection).and_then(|documents| {
            documents
                .iter()
                .find(|d| query.matches(d))
                .map(|d| projection.map_or_else(|| d.clone(), |p| p.apply(d)))
        }))
    }

    fn find(
        &self,
        collection: &str,
        query: &Query,
        projection: Option<&Projection>,
    ) -> StorageResult<DocumentStream> {
        let collections = self.collections.read();
        let matched: Vec<Value> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| query.matches(d))
                    .map(|d| projection.map_or_else(|| d.clone(), |p| p.apply(d)))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Box::new(matched.into_iter()))
    }

    fn remove(
        &self,
        collection: &str,
        query: &Query,
        _options: &WriteOptions,
    ) -> StorageResult<u64> {
        let mut collections = self.collections.write();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|d| !query.matches(d));
        Ok((before - documents.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::Operator;
    use serde_json::json;

    fn opts() -> WriteOptions {
        WriteOptions::default()
    }

    #[test]
    fn insert_assigns_id() {
        let store = InMemoryStore::new();
        let id = store
            .insert("posts", Value::from(json!({"title": "A"})), &opts())
            .unwrap();
        assert!(matches!(id, Value::Id(_)));
        let stored = store.documents("posts");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get(ID_FIELD), Some(&id));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        let doc = Value::from(json!({"_id": "p1"}));
        store.insert("posts", doc.clone(), &opts()).unwrap();
        let err = store.insert("posts", doc, &opts()).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateKey { .. }));
    }

    #[test]
    fn non_map_is_rejected() {
        let store = InMemoryStore::new();
        assert!(store.insert("posts", Value::Int(1), &opts()).is_err());
    }

    #[test]
    fn replace_and_upsert() {
        let store = InMemoryStore::new();
        let query = Query::by_id(Value::from("p1"));
        let written = store
            .replace("posts", &query, Value::from(json!({"_id": "p1", "n": 1})), true, &opts())
            .unwrap();
        assert_eq!(written, 1);
        store
            .replace("posts", &query, Value::from(json!({"n": 2})), false, &opts())
            .unwrap();
        let found = store.find_one("posts", &query, None).unwrap().unwrap();
        assert_eq!(found, Value::from(json!({"_id": "p1", "n": 2})));
    }

    #[test]
    fn update_applies_operators() {
        let store = InMemoryStore::new();
        store
            .insert("posts", Value::from(json!({"_id": "p1", "n": 4, "tags": ["a"]})), &opts())
            .unwrap();
        let mut update = UpdateDocument::new();
        update.slot_mut(Operator::Inc).insert("n".into(), Value::Int(5));
        update
            .slot_mut(Operator::PushAll)
            .insert("tags".into(), Value::from(json!(["b"])));
        let modified = store
            .update("posts", &Query::by_id(Value::from("p1")), &update, &opts())
            .unwrap();
        assert_eq!(modified, 1);
        assert_eq!(
            store.documents("posts")[0],
            Value::from(json!({"_id": "p1", "n": 9, "tags": ["a", "b"]}))
        );
    }

    #[test]
    fn failed_update_leaves_document_untouched() {
        let store = InMemoryStore::new();
        let original = Value::from(json!({"_id": "p1", "n": 4, "title": "A"}));
        store.insert("posts", original.clone(), &opts()).unwrap();
        let mut update = UpdateDocument::new();
        update.slot_mut(Operator::Inc).insert("n".into(), Value::Int(1));
        update.slot_mut(Operator::PushAll).insert("title".into(), Value::from(json!(["x"])));
        assert!(store
            .update("posts", &Query::all(), &update, &opts())
            .is_err());
        assert_eq!(store.documents("posts")[0], original);
    }

    #[test]
    fn find_and_remove() {
        let store = InMemoryStore::new();
        for (id, kind) in [("a", "x"), ("b", "y"), ("c", "x")] {
            store
                .insert("items", Value::from(json!({"_id": id, "kind": kind})), &opts())
                .unwrap();
        }
        let query = Query::all().field("kind", "x");
        assert_eq!(store.count("items", &query).unwrap(), 2);
        let ids: Vec<Value> = store
            .find("items", &query, None)
            .unwrap()
            .filter_map(|d| d.get(ID_FIELD).cloned())
            .collect();
        assert_eq!(ids, vec![Value::from("a"), Value::from("c")]);
        assert_eq!(store.remove("items", &query, &opts()).unwrap(), 2);
        assert_eq!(store.documents("items").len(), 1);
    }
}
