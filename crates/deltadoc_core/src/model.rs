//! Model declarations.

use crate::error::CoreResult;
use crate::filter::{FilterFn, FilterRegistry};
use crate::schema::FieldSchema;
use crate::validation::{Rule, RuleTable};
use deltadoc_codec::Path;
use std::fmt;

/// A document type stored in one collection.
///
/// Implementors declare the collection name and describe their fields,
/// aliases, rules and filters on a [`DefinitionBuilder`]. The definition is
/// built once per [`Database`](crate::Database) and shared by every
/// document of the type.
///
/// # Example
///
/// ```
/// use deltadoc_core::{DefinitionBuilder, FilterRegistry, Model, Rule};
///
/// struct Post;
///
/// impl Model for Post {
///     const COLLECTION: &'static str = "posts";
///
///     fn define(definition: DefinitionBuilder) -> DefinitionBuilder {
///         definition
///             .field("title")
///             .field("tags.$")
///             .alias("title", "t")
///             .rule("title", Rule::NotEmpty)
///             .filter("title", "trim")
///     }
/// }
///
/// let definition = Post::definition(&FilterRegistry::new()).unwrap();
/// assert_eq!(definition.collection(), "posts");
/// ```
pub trait Model: Send + Sync + 'static {
    /// Collection the documents are stored in.
    const COLLECTION: &'static str;

    /// Adds the model's declarations to `definition`.
    fn define(definition: DefinitionBuilder) -> DefinitionBuilder;

    /// Builds the model's definition against a filter registry.
    ///
    /// # Errors
    ///
    /// Fails on malformed schema or alias declarations and on unknown
    /// filter names.
    fn definition(filters: &FilterRegistry) -> CoreResult<ModelDefinition> {
        Self::define(DefinitionBuilder::new(Self::COLLECTION)).build(filters)
    }
}

/// Collects model declarations. Nothing is checked until
/// [`DefinitionBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct DefinitionBuilder {
    collection: String,
    fields: Vec<String>,
    aliases: Vec<(String, String)>,
    open: Vec<String>,
    schemaless: bool,
    rules: Vec<(String, Rule)>,
    filters: Vec<(String, String)>,
}

impl DefinitionBuilder {
    /// Starts a definition for `collection`.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    /// Declares a schema path such as `comments.$.author`.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>) -> Self {
        self.fields.push(path.into());
        self
    }

    /// Stores `path` under the wire name `wire`.
    #[must_use]
    pub fn alias(mut self, path: impl Into<String>, wire: impl Into<String>) -> Self {
        self.aliases.push((path.into(), wire.into()));
        self
    }

    /// Accepts any field below `prefix`.
    #[must_use]
    pub fn open_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.open.push(prefix.into());
        self
    }

    /// Accepts any field at all.
    #[must_use]
    pub fn schemaless(mut self) -> Self {
        self.schemaless = true;
        self
    }

    /// Adds a validation rule for a schema path.
    #[must_use]
    pub fn rule(mut self, path: impl Into<String>, rule: Rule) -> Self {
        self.rules.push((path.into(), rule));
        self
    }

    /// Runs the named filter over a schema path before validation.
    #[must_use]
    pub fn filter(mut self, path: impl Into<String>, name: impl Into<String>) -> Self {
        self.filters.push((path.into(), name.into()));
        self
    }

    /// Compiles the declarations.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`](crate::CoreError::Schema) for bad
    /// field or alias declarations and
    /// [`CoreError::UnknownFilter`](crate::CoreError::UnknownFilter) for
    /// filter names missing from `registry`.
    pub fn build(self, registry: &FilterRegistry) -> CoreResult<ModelDefinition> {
        let mut schema = FieldSchema::new();
        for field in &self.fields {
            schema.declare(field)?;
        }
        for (path, wire) in &self.aliases {
            schema.alias(path, wire)?;
        }
        for prefix in &self.open {
            schema.open(prefix)?;
        }
        if self.schemaless {
            schema.set_schemaless();
        }

        let mut rules = RuleTable::new();
        for (path, rule) in self.rules {
            rules.add(Path::parse(&path)?.to_schema_form(), rule);
        }

        let mut filters: Vec<(Path, Vec<FilterFn>)> = Vec::new();
        for (path, name) in &self.filters {
            let path = Path::parse(path)?.to_schema_form();
            let filter = registry.resolve(name)?;
            match filters.iter_mut().find(|(p, _)| *p == path) {
                Some((_, list)) => list.push(filter),
                None => filters.push((path, vec![filter])),
            }
        }

        Ok(ModelDefinition {
            collection: self.collection,
            schema,
            rules,
            filters,
        })
    }
}

/// A compiled model: schema, rules and resolved filters.
#[derive(Clone)]
pub struct ModelDefinition {
    collection: String,
    schema: FieldSchema,
    rules: RuleTable,
    filters: Vec<(Path, Vec<FilterFn>)>,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("collection", &self.collection)
            .field("schema", &self.schema)
            .field("rules", &self.rules)
            .field(
                "filters",
                &self
                    .filters
                    .iter()
                    .map(|(path, list)| (path.to_string(), list.len()))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ModelDefinition {
    /// Collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Field schema.
    #[must_use]
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Validation rules by schema path.
    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Filters by schema path, in declaration order.
    #[must_use]
    pub fn filters(&self) -> &[(Path, Vec<FilterFn>)] {
        &self.filters
    }
}
