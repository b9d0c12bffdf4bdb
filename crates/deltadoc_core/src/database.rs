//! Database facade.

use crate::config::Config;
use crate::document::{Binding, Document};
use crate::error::CoreResult;
use crate::filter::FilterRegistry;
use crate::model::{Model, ModelDefinition};
use crate::validation::{RuleEngine, StandardRules};
use deltadoc_codec::Value;
use deltadoc_storage::DocumentStore;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The entry point: a store plus the collaborators every document uses.
///
/// Model definitions are compiled on first use and cached per model type.
///
/// # Example
///
/// ```
/// use deltadoc_core::{Database, DefinitionBuilder, Model};
/// use deltadoc_storage::InMemoryStore;
/// use std::sync::Arc;
///
/// struct Note;
///
/// impl Model for Note {
///     const COLLECTION: &'static str = "notes";
///
///     fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
///         definition.field("text")
///     }
/// }
///
/// let db = Database::new(Arc::new(InMemoryStore::new()));
/// let mut note = db.document::<Note>().unwrap();
/// note.set("text", "hello").unwrap();
/// note.create().unwrap();
/// assert!(note.loaded());
/// ```
pub struct Database {
    store: Arc<dyn DocumentStore>,
    config: Config,
    filters: FilterRegistry,
    rules: Arc<dyn RuleEngine>,
    /// Compiled definitions by model type.
    definitions: RwLock<HashMap<TypeId, Arc<ModelDefinition>>>,
}

impl Database {
    /// Creates a database over `store` with the default configuration.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_config(store, Config::default())
    }

    /// Creates a database over `store` with a custom configuration.
    #[must_use]
    pub fn with_config(store: Arc<dyn DocumentStore>, config: Config) -> Self {
        Self {
            store,
            config,
            filters: FilterRegistry::new(),
            rules: Arc::new(StandardRules::new()),
            definitions: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the filter registry models resolve their filters against.
    #[must_use]
    pub fn filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self.definitions.get_mut().clear();
        self
    }

    /// Replaces the rule engine.
    #[must_use]
    pub fn rule_engine(mut self, rules: Arc<dyn RuleEngine>) -> Self {
        self.rules = rules;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Returns the compiled definition of `M`, building it on first use.
    ///
    /// # Errors
    ///
    /// Fails if `M`'s declarations are malformed or name an unknown filter.
    pub fn definition<M: Model>(&self) -> CoreResult<Arc<ModelDefinition>> {
        let key = TypeId::of::<M>();
        if let Some(definition) = self.definitions.read().get(&key) {
            return Ok(Arc::clone(definition));
        }
        let built = Arc::new(M::definition(&self.filters)?);
        let mut definitions = self.definitions.write();
        Ok(Arc::clone(definitions.entry(key).or_insert(built)))
    }

    fn binding<M: Model>(&self) -> CoreResult<Arc<Binding>> {
        Ok(Arc::new(Binding {
            store: Arc::clone(&self.store),
            definition: self.definition::<M>()?,
            rules: Arc::clone(&self.rules),
            config: self.config.clone(),
        }))
    }

    /// Creates an empty, unsaved document of model `M`.
    ///
    /// # Errors
    ///
    /// Fails if `M`'s definition cannot be built.
    pub fn document<M: Model>(&self) -> CoreResult<Document<M>> {
        Ok(Document::new(self.binding::<M>()?))
    }

    /// Creates an unsaved document of model `M` holding `data`.
    ///
    /// # Errors
    ///
    /// Fails if `M`'s definition cannot be built or `data` is rejected by
    /// [`Document::set_all`].
    pub fn document_from<M: Model>(&self, data: impl Into<Value>) -> CoreResult<Document<M>> {
        let mut document = self.document::<M>()?;
        document.set_all(data)?;
        Ok(document)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("filters", &self.filters)
            .field("models", &self.definitions.read().len())
            .finish_non_exhaustive()
    }
}
