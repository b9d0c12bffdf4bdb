//! Lazy iteration over query results.

use crate::document::{Binding, Document};
use crate::error::CoreResult;
use crate::model::Model;
use deltadoc_storage::{DocumentStream, Projection, Query};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Iterator over the stored documents matching a query.
///
/// Each stored document is un-aliased and yielded as a loaded
/// [`Document<M>`]. Documents read through a non-empty projection are
/// partial.
pub struct Cursor<M: Model> {
    binding: Arc<Binding>,
    query: Query,
    projection: Option<Projection>,
    partial: bool,
    stream: DocumentStream,
    _model: PhantomData<M>,
}

impl<M: Model> Cursor<M> {
    /// Issues `query` and wraps the resulting stream. Query and projection
    /// are already in wire names.
    pub(crate) fn open(
        binding: Arc<Binding>,
        query: Query,
        projection: Option<Projection>,
    ) -> CoreResult<Self> {
        let stream = binding
            .store
            .find(M::COLLECTION, &query, projection.as_ref())?;
        let partial = projection.as_ref().is_some_and(|p| !p.is_empty());
        Ok(Self {
            binding,
            query,
            projection,
            partial,
            stream,
            _model: PhantomData,
        })
    }

    /// The query in wire names.
    #[must_use]
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Number of stored documents matching the query, regardless of how
    /// far the cursor has advanced.
    ///
    /// # Errors
    ///
    /// Storage errors, unchanged.
    pub fn count_matches(&self) -> CoreResult<u64> {
        Ok(self.binding.store.count(M::COLLECTION, &self.query)?)
    }

    /// Issues the query again and starts over.
    ///
    /// # Errors
    ///
    /// Storage errors, unchanged.
    pub fn rewind(&mut self) -> CoreResult<()> {
        self.stream = self
            .binding
            .store
            .find(M::COLLECTION, &self.query, self.projection.as_ref())?;
        Ok(())
    }
}

impl<M: Model> Iterator for Cursor<M> {
    type Item = Document<M>;

    fn next(&mut self) -> Option<Self::Item> {
        let stored = self.stream.next()?;
        Some(Document::from_stored(
            Arc::clone(&self.binding),
            &stored,
            self.partial,
        ))
    }
}

impl<M: Model> fmt::Debug for Cursor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("collection", &M::COLLECTION)
            .field("query", &self.query)
            .field("projection", &self.projection)
            .finish_non_exhaustive()
    }
}
