//! # deltadoc Core
//!
//! Typed documents that track their own changes.
//!
//! This crate provides:
//! - Field schemas with wire-name aliases
//! - Change tracking between the persisted snapshot and pending writes
//! - Compilation of mutations into a minimal atomic operator document
//! - A validation bridge to an external rule engine, plus filters
//! - A [`Database`] facade and lazy [`Cursor`]s over query results
//!
//! # Example
//!
//! ```
//! use deltadoc_codec::Value;
//! use deltadoc_core::{Database, DefinitionBuilder, Model};
//! use deltadoc_storage::InMemoryStore;
//! use std::sync::Arc;
//!
//! struct Post;
//!
//! impl Model for Post {
//!     const COLLECTION: &'static str = "posts";
//!
//!     fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
//!         definition.field("title").field("views").field("tags.$")
//!     }
//! }
//!
//! let db = Database::new(Arc::new(InMemoryStore::new()));
//! let mut post = db.document::<Post>().unwrap();
//! post.set("title", "Hello").unwrap();
//! post.set("views", 4).unwrap();
//! post.create().unwrap();
//!
//! post.inc("views", 5).unwrap();
//! post.push("tags", ["rust"]).unwrap();
//! assert_eq!(
//!     post.next_update(),
//!     Value::from(serde_json::json!({
//!         "$inc": {"views": 5},
//!         "$pushAll": {"tags": ["rust"]}
//!     }))
//! );
//! post.update().unwrap();
//! assert_eq!(post.get("views"), Some(Value::Int(9)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod database;
mod document;
mod error;
mod filter;
mod model;
mod schema;
mod tracker;
mod update;
mod validation;

pub use config::Config;
pub use cursor::Cursor;
pub use database::Database;
pub use document::Document;
pub use error::{CoreError, CoreResult};
pub use filter::{FilterFn, FilterRegistry};
pub use model::{DefinitionBuilder, Model, ModelDefinition};
pub use schema::{FieldSchema, NodeKind, SchemaNode};
pub use tracker::ChangeTracker;
pub use update::{AppendTarget, PopOutcome, UpdateBuilder};
pub use validation::{
    expand_path, FlatRules, Predicate, Rule, RuleEngine, RuleTable, StandardRules,
    ValidationReport,
};
