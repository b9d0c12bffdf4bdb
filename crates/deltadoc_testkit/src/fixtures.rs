//! Fixture models and database helpers.
//!
//! Three models cover the schema shapes the engine distinguishes: a
//! declared schema with an open subtree, a fully aliased schema, and a
//! schemaless one.

use deltadoc_codec::ScalarKind;
use deltadoc_core::{Config, Database, DefinitionBuilder, Model, Rule};
use deltadoc_storage::InMemoryStore;
use std::sync::Arc;

/// Blog post with comments, rules and filters. Anything below `meta` is
/// accepted.
#[derive(Debug)]
pub struct BlogPost;

impl Model for BlogPost {
    const COLLECTION: &'static str = "posts";

    fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
        definition
            .field("title")
            .field("body")
            .field("slug")
            .field("views")
            .field("tags.$")
            .field("comments.$.author")
            .field("comments.$.body")
            .field("comments.$.votes")
            .open_prefix("meta")
            .rule("title", Rule::Required)
            .rule("title", Rule::MaxLength(80))
            .rule("slug", Rule::AlphaDash)
            .rule("views", Rule::Kind(ScalarKind::Number))
            .rule("comments.$.author", Rule::NotEmpty)
            .filter("title", "trim")
            .filter("slug", "slug")
    }
}

/// Blog post stored under short wire names.
///
/// | field | wire |
/// |---|---|
/// | `title` | `t` |
/// | `body` | `b` |
/// | `tags.$` | `tg.$` |
/// | `comments.$.author` | `c.$.a` |
/// | `comments.$.body` | `c.$.b` |
#[derive(Debug)]
pub struct AliasedPost;

impl Model for AliasedPost {
    const COLLECTION: &'static str = "aliased_posts";

    fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
        definition
            .alias("title", "t")
            .alias("body", "b")
            .alias("tags.$", "tg.$")
            .alias("comments.$.author", "c.$.a")
            .alias("comments.$.body", "c.$.b")
            .field("views")
    }
}

/// Schemaless resource: every path is legal and nothing is renamed.
#[derive(Debug)]
pub struct Resource;

impl Model for Resource {
    const COLLECTION: &'static str = "resources";

    fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
        definition.schemaless()
    }
}

/// A database over an in-memory store that the test can inspect.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The store behind `db`.
    pub store: Arc<InMemoryStore>,
}

impl TestDatabase {
    /// Creates a database with the default configuration.
    #[must_use]
    pub fn memory() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a database with a custom configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            db: Database::with_config(store.clone(), config),
            store,
        }
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test against a fresh in-memory database.
pub fn with_memory_db<F, R>(f: F) -> R
where
    F: FnOnce(&TestDatabase) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db)
}
