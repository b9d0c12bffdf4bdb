//! Validation and persistence.

use super::Document;
use crate::cursor::Cursor;
use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use crate::validation::{expand_path, ValidationReport};
use deltadoc_codec::{flatten, DocumentId, Path, Value};
use deltadoc_storage::{DocumentStore, Projection, Query, StorageError, WriteOptions, ID_FIELD};
use std::sync::Arc;
use tracing::debug;

impl<M: Model> Document<M> {
    /// Checks the current document against the model's rules.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let merged = self.tracker.merged();
        let rules = self.definition().rules().expand(&merged);
        self.binding.rules.check(&flatten(&merged), &rules)
    }

    fn ensure_valid(&self) -> CoreResult<()> {
        if !self.binding.config.validate_on_write {
            return Ok(());
        }
        let report = self.validate();
        if report.passed() {
            return Ok(());
        }
        debug!(
            collection = M::COLLECTION,
            fields = ?report.errors().keys().collect::<Vec<_>>(),
            "validation failed"
        );
        Err(CoreError::ValidationFailed {
            errors: report.into_errors(),
        })
    }

    /// Runs the model's filters over the current values, writing back the
    /// values they change.
    fn apply_filters(&mut self) -> CoreResult<()> {
        let definition = Arc::clone(&self.binding.definition);
        if definition.filters().is_empty() {
            return Ok(());
        }
        let merged = self.tracker.merged();
        for (schema_path, filters) in definition.filters() {
            for path in expand_path(schema_path, &merged) {
                let Some(current) = self.tracker.get(&path) else {
                    continue;
                };
                let filtered = filters.iter().fold(current.clone(), |value, f| f(&value));
                if filtered != current {
                    self.assign(&path, filtered)?;
                }
            }
        }
        Ok(())
    }

    fn store(&self) -> &dyn DocumentStore {
        self.binding.store.as_ref()
    }

    /// The configured options, used when a call passes none of its own.
    fn write_options(&self) -> WriteOptions {
        self.binding.config.write_options
    }

    /// The document to write, with an `_id`. The second value is true when
    /// the id was generated here.
    fn with_id(&self) -> (Value, Value, bool) {
        let mut document = self.tracker.merged();
        if let Some(id) = document.get(ID_FIELD).cloned() {
            return (document, id, false);
        }
        let id = Value::Id(DocumentId::new());
        if let Value::Map(fields) = &mut document {
            fields.shift_insert(0, ID_FIELD.to_string(), id.clone());
        }
        (document, id, true)
    }

    fn finish_write(&mut self, generated_id: Option<Value>) {
        if let Some(id) = generated_id {
            self.tracker.write(&Path::root().key(ID_FIELD), id);
        }
        self.tracker.commit();
        self.builder.clear();
    }

    /// Inserts the document, assigning an `_id` if it has none.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidState`] if the document is already loaded or
    ///   its `_id` is taken
    /// - [`CoreError::ValidationFailed`] before anything is written
    /// - storage errors, unchanged
    pub fn create(&mut self) -> CoreResult<Value> {
        let options = self.write_options();
        self.create_with(&options)
    }

    /// [`Document::create`] with `options` in place of the configured
    /// write options.
    ///
    /// # Errors
    ///
    /// Same as [`Document::create`].
    pub fn create_with(&mut self, options: &WriteOptions) -> CoreResult<Value> {
        if self.loaded() {
            return Err(CoreError::invalid_state(
                "cannot create a document that is already loaded",
            ));
        }
        self.apply_filters()?;
        self.ensure_valid()?;

        let (document, id, generated) = self.with_id();
        let wire = self.schema().to_wire(&document);
        debug!(collection = M::COLLECTION, id = ?id, "create");
        match self.store().insert(M::COLLECTION, wire, options) {
            Ok(_) => {}
            Err(StorageError::DuplicateKey { .. }) => {
                return Err(CoreError::invalid_state(format!(
                    "a document with _id {id:?} already exists"
                )));
            }
            Err(other) => return Err(other.into()),
        }
        self.finish_write(generated.then(|| id.clone()));
        Ok(id)
    }

    /// Writes the whole document, inserting it if it is not stored yet.
    /// Does nothing when there are no pending changes.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidState`] for a partially loaded document
    /// - [`CoreError::ValidationFailed`] before anything is written
    /// - storage errors, unchanged
    pub fn save(&mut self) -> CoreResult<()> {
        let options = self.write_options();
        self.save_with(&options)
    }

    /// [`Document::save`] with `options` in place of the configured write
    /// options.
    ///
    /// # Errors
    ///
    /// Same as [`Document::save`].
    pub fn save_with(&mut self, options: &WriteOptions) -> CoreResult<()> {
        if self.partial() {
            return Err(CoreError::invalid_state(
                "cannot save a partially loaded document; use update or load it in full",
            ));
        }
        if !self.tracker.has_changes() {
            return Ok(());
        }
        self.apply_filters()?;
        self.ensure_valid()?;

        let (document, id, generated) = self.with_id();
        let wire = self.schema().to_wire(&document);
        debug!(collection = M::COLLECTION, id = ?id, "save");
        self.store().replace(
            M::COLLECTION,
            &Query::by_id(id.clone()),
            wire,
            true,
            options,
        )?;
        self.finish_write(generated.then_some(id));
        Ok(())
    }

    /// Sends only the pending operator document.
    /// Does nothing when there are no pending changes.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidState`] if the document was never loaded,
    ///   created or saved
    /// - [`CoreError::ValidationFailed`] before anything is written
    /// - storage errors, unchanged
    pub fn update(&mut self) -> CoreResult<()> {
        let options = self.write_options();
        self.update_with(&options)
    }

    /// [`Document::update`] with `options` in place of the configured
    /// write options.
    ///
    /// # Errors
    ///
    /// Same as [`Document::update`].
    pub fn update_with(&mut self, options: &WriteOptions) -> CoreResult<()> {
        if !self.loaded() {
            return Err(CoreError::invalid_state(
                "cannot update a document that has not been loaded",
            ));
        }
        if !self.tracker.has_changes() {
            return Ok(());
        }
        self.apply_filters()?;
        self.ensure_valid()?;

        if !self.builder.pending().is_empty() {
            let id = self.tracker.original(&Path::root().key(ID_FIELD)).ok_or_else(|| {
                CoreError::invalid_state("cannot update a document without an _id")
            })?;
            let update = self.builder.pending().clone();
            debug!(collection = M::COLLECTION, id = ?id, update = ?update.to_value(), "update");
            self.store().update(
                M::COLLECTION,
                &Query::by_id(id),
                &update,
                options,
            )?;
            self.last_update = Some(update.to_value());
        }
        self.finish_write(None);
        Ok(())
    }

    /// Equality query on the current field values, in wire names.
    fn data_query(&self) -> Query {
        let flat = flatten(&self.tracker.merged());
        Query::from_flat(self.schema().flat_to_wire(&flat))
    }

    fn id_query(&self) -> Option<Query> {
        self.tracker
            .original(&Path::root().key(ID_FIELD))
            .map(Query::by_id)
    }

    /// Reads the stored document back.
    ///
    /// A loaded document without pending changes is looked up by `_id`;
    /// otherwise the current field values are the query. With a non-empty
    /// projection only those fields are read and merged into the current
    /// data, and the document becomes partial. Returns false when nothing
    /// matched, leaving the document unchanged.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidState`] if the document has neither been loaded
    /// nor been given any values; storage errors, unchanged.
    pub fn load(&mut self, projection: Option<&Projection>) -> CoreResult<bool> {
        if !self.loaded() && !self.tracker.has_changes() {
            return Err(CoreError::invalid_state(
                "cannot load a document without an _id or field values",
            ));
        }
        let query = match self.id_query() {
            Some(query) if !self.tracker.has_changes() => query,
            _ => self.data_query(),
        };
        let wire_projection = projection.map(|p| self.schema().projection_to_wire(p));
        debug!(collection = M::COLLECTION, query = ?query.conditions(), "load");
        let Some(stored) = self
            .store()
            .find_one(M::COLLECTION, &query, wire_projection.as_ref())?
        else {
            return Ok(false);
        };
        let fields = self.schema().from_wire(&stored);
        let projected = projection.is_some_and(|p| !p.is_empty());
        self.tracker.load(&fields, projected);
        self.builder.clear();
        Ok(true)
    }

    /// Finds every stored document matching the current field values.
    ///
    /// # Errors
    ///
    /// Storage errors from issuing the query.
    pub fn find(&self, projection: Option<&Projection>) -> CoreResult<Cursor<M>> {
        let query = self.data_query();
        debug!(collection = M::COLLECTION, query = ?query.conditions(), "find");
        Cursor::open(
            Arc::clone(&self.binding),
            query,
            projection.map(|p| self.schema().projection_to_wire(p)),
        )
    }

    /// Removes the stored document, by `_id` when loaded and by the current
    /// field values otherwise. Returns the number of documents removed.
    ///
    /// The instance keeps its in-memory state, which no longer matches
    /// storage.
    ///
    /// # Errors
    ///
    /// [`CoreError::InvalidState`] when there is nothing to build a query
    /// from; storage errors, unchanged.
    pub fn delete(&mut self) -> CoreResult<u64> {
        let options = self.write_options();
        self.delete_with(None, &options)
    }

    /// Removes every stored document matching `query`, given in field
    /// names. An absent or empty query falls back to the one
    /// [`Document::delete`] builds.
    ///
    /// # Errors
    ///
    /// Same as [`Document::delete`].
    pub fn delete_with(
        &mut self,
        query: Option<&Query>,
        options: &WriteOptions,
    ) -> CoreResult<u64> {
        let query = match (query, self.id_query()) {
            (Some(given), _) if !given.is_empty() => {
                Query::from_flat(self.schema().flat_to_wire(given.conditions()))
            }
            (_, Some(by_id)) if self.loaded() => by_id,
            _ => self.data_query(),
        };
        if query.is_empty() {
            return Err(CoreError::invalid_state(
                "cannot delete a document without an _id or field values",
            ));
        }
        debug!(collection = M::COLLECTION, query = ?query.conditions(), "delete");
        Ok(self.store().remove(M::COLLECTION, &query, options)?)
    }
}
