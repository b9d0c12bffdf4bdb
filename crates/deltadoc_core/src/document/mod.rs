//! Typed document instances.
//!
//! A [`Document<M>`] pairs a [`ChangeTracker`] with an [`UpdateBuilder`]:
//! every mutation is checked against the model's schema, recorded in the
//! tracker under its field path and compiled into the pending operator
//! document under its wire path.

mod mutate;
mod persist;

use crate::config::Config;
use crate::model::{Model, ModelDefinition};
use crate::schema::FieldSchema;
use crate::tracker::ChangeTracker;
use crate::update::UpdateBuilder;
use crate::validation::RuleEngine;
use crate::CoreResult;
use deltadoc_codec::{inflate, FlatMap, Path, Value};
use deltadoc_storage::{DocumentStore, ID_FIELD};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Collaborators shared by every document of one model.
pub(crate) struct Binding {
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) definition: Arc<ModelDefinition>,
    pub(crate) rules: Arc<dyn RuleEngine>,
    pub(crate) config: Config,
}

/// A document of model `M`.
///
/// Created through [`Database::document`](crate::Database::document),
/// [`Database::document_from`](crate::Database::document_from) or a
/// [`Cursor`](crate::Cursor). Paths are dotted field paths such as
/// `comments.0.author`; wire names never appear in this API.
///
/// A document is not meant to be shared between threads while it is being
/// mutated. Two instances of the same stored document do not coordinate:
/// the last `save` wins.
pub struct Document<M: Model> {
    binding: Arc<Binding>,
    tracker: ChangeTracker,
    builder: UpdateBuilder,
    last_update: Option<Value>,
    _model: PhantomData<M>,
}

impl<M: Model> fmt::Debug for Document<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("collection", &M::COLLECTION)
            .field("tracker", &self.tracker)
            .field("pending", self.builder.pending())
            .finish()
    }
}

impl<M: Model> Clone for Document<M> {
    fn clone(&self) -> Self {
        Self {
            binding: Arc::clone(&self.binding),
            tracker: self.tracker.clone(),
            builder: self.builder.clone(),
            last_update: self.last_update.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> Document<M> {
    pub(crate) fn new(binding: Arc<Binding>) -> Self {
        Self {
            binding,
            tracker: ChangeTracker::new(),
            builder: UpdateBuilder::new(),
            last_update: None,
            _model: PhantomData,
        }
    }

    /// Builds a loaded document from a stored (wire-named) document.
    pub(crate) fn from_stored(binding: Arc<Binding>, stored: &Value, partial: bool) -> Self {
        let mut document = Self::new(binding);
        let fields = document.schema().from_wire(stored);
        document.tracker.load(&fields, partial);
        document
    }

    /// The model's compiled definition.
    #[must_use]
    pub fn definition(&self) -> &ModelDefinition {
        &self.binding.definition
    }

    pub(crate) fn schema(&self) -> &FieldSchema {
        self.binding.definition.schema()
    }

    /// Current value at `path`. Removed fields and empty results are `None`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path).ok()?;
        self.tracker.get(&path)
    }

    /// The whole current document, without removed fields.
    #[must_use]
    pub fn get_all(&self) -> Value {
        self.tracker.merged()
    }

    /// True if `path` currently holds a value.
    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// The `_id` field, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<Value> {
        self.get(ID_FIELD)
    }

    /// Pending value at `path`. A null means the path will be removed.
    #[must_use]
    pub fn changed(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path).ok()?;
        self.tracker.changed(&path)
    }

    /// All pending writes as a document, nulls included.
    #[must_use]
    pub fn changed_all(&self) -> Value {
        inflate(self.tracker.changes())
    }

    /// All pending writes keyed by field path.
    #[must_use]
    pub fn changes(&self) -> &FlatMap {
        self.tracker.changes()
    }

    /// Last persisted value at `path`.
    #[must_use]
    pub fn original(&self, path: &str) -> Option<Value> {
        let path = Path::parse(path).ok()?;
        self.tracker.original(&path)
    }

    /// The last persisted document.
    #[must_use]
    pub fn original_all(&self) -> Value {
        inflate(self.tracker.snapshot())
    }

    /// True once the document has been created, saved or loaded.
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.tracker.loaded()
    }

    /// True if the last load used a projection.
    #[must_use]
    pub fn partial(&self) -> bool {
        self.tracker.partial()
    }

    /// The pending operator document, non-empty slots only.
    #[must_use]
    pub fn next_update(&self) -> Value {
        self.builder.pending().to_value()
    }

    /// Entries of one operator slot, by name (`set`, `$inc`, `pushAll`...).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOperator`](crate::CoreError::UnknownOperator)
    /// for names outside the fixed operator set.
    pub fn next_update_for(&self, operator: &str) -> CoreResult<&FlatMap> {
        self.builder.slot(operator)
    }

    /// The operator document sent by the last successful `update`.
    #[must_use]
    pub fn last_update(&self) -> Option<&Value> {
        self.last_update.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Binding;
    use crate::config::Config;
    use crate::filter::FilterRegistry;
    use crate::model::{DefinitionBuilder, Model};
    use crate::validation::{Rule, StandardRules};
    use crate::Document;
    use deltadoc_storage::InMemoryStore;
    use std::sync::Arc;

    pub(crate) struct Post;

    impl Model for Post {
        const COLLECTION: &'static str = "posts";

        fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
            definition
                .field("title")
                .field("slug")
                .field("count")
                .field("tags.$")
                .field("meta")
                .field("comments.$.author")
                .field("comments.$.likes.$")
                .alias("comments.$.body", "c.$.b")
                .rule("title", Rule::NotEmpty)
                .filter("slug", "slug")
        }
    }

    pub(crate) fn post_with(store: Arc<InMemoryStore>, config: Config) -> Document<Post> {
        let definition = Post::definition(&FilterRegistry::new()).unwrap();
        Document::new(Arc::new(Binding {
            store,
            definition: Arc::new(definition),
            rules: Arc::new(StandardRules::new()),
            config,
        }))
    }

    pub(crate) fn post(store: Arc<InMemoryStore>) -> Document<Post> {
        post_with(store, Config::default())
    }
}
