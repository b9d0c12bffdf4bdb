//! # deltadoc Storage
//!
//! The document store interface deltadoc writes through, and an in-memory
//! implementation of it.
//!
//! The engine never talks to a database directly. It hands whole documents
//! and operator-shaped partial updates to a [`DocumentStore`]:
//!
//! - [`Query`] - equality match over dotted paths
//! - [`Projection`] - subset of fields to read back
//! - [`UpdateDocument`] - `$set`/`$unset`/`$inc`/`$pushAll`/`$pop` plus the
//!   pass-through `$addToSet`/`$pullAll`/`$bit` slots
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and embedding
//!
//! ## Example
//!
//! ```rust
//! use deltadoc_codec::Value;
//! use deltadoc_storage::{DocumentStore, InMemoryStore, Operator, Query, UpdateDocument, WriteOptions};
//!
//! let store = InMemoryStore::new();
//! let doc = Value::map([("_id", Value::from("p1")), ("count", Value::Int(4))]);
//! store.insert("posts", doc, &WriteOptions::default()).unwrap();
//!
//! let mut update = UpdateDocument::new();
//! update.slot_mut(Operator::Inc).insert("count".into(), Value::Int(5));
//! let query = Query::by_id(Value::from("p1"));
//! store.update("posts", &query, &update, &WriteOptions::default()).unwrap();
//!
//! let stored = store.find_one("posts", &query, None).unwrap().unwrap();
//! assert_eq!(stored.get("count"), Some(&Value::Int(9)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod query;
mod store;
mod update;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use query::{Projection, Query, ID_FIELD};
pub use store::{DocumentStore, DocumentStream, WriteOptions};
pub use update::{Operator, UpdateDocument};
