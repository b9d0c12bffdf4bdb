//! Change tracking between the persisted snapshot and pending writes.

use deltadoc_codec::{
    covers, flat_get, flatten, inflate, overlaps, strip_nulls, FlatMap, Path, Value,
};

/// Persisted snapshot plus the writes made since.
///
/// Both sides are flat path maps. In `changed`, a null leaf means "remove
/// this path" while a missing key means "unmodified".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeTracker {
    original: FlatMap,
    changed: FlatMap,
    loaded: bool,
    partial: bool,
}

impl ChangeTracker {
    /// An empty, never-persisted tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the snapshot matches a stored document.
    #[must_use]
    pub fn loaded(&self) -> bool {
        self.loaded
    }

    /// True if the snapshot came from a projected read.
    #[must_use]
    pub fn partial(&self) -> bool {
        self.partial
    }

    /// True if there are pending writes.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Pending writes, nulls included.
    #[must_use]
    pub fn changes(&self) -> &FlatMap {
        &self.changed
    }

    /// Persisted snapshot, flattened.
    #[must_use]
    pub fn snapshot(&self) -> &FlatMap {
        &self.original
    }

    /// Records a write of a leaf (scalar, null or empty container).
    ///
    /// Earlier writes below `path` are superseded. An earlier write of a
    /// null or scalar above `path` becomes an empty container, so that the
    /// persisted children it replaced stay hidden.
    pub fn write(&mut self, path: &Path, value: Value) {
        let key = path.to_string();
        self.changed
            .retain(|existing, _| existing.len() <= key.len() || !covers(&key, existing));
        for depth in 1..path.len() {
            let ancestor = path.prefix(depth).to_string();
            if let Some(slot) = self.changed.get_mut(&ancestor) {
                if !slot.is_container() {
                    *slot = path.segments()[depth].empty_container();
                }
            }
        }
        self.changed.insert(key, value);
    }

    /// The snapshot with pending writes laid over it, nulls kept.
    #[must_use]
    pub fn overlay(&self) -> FlatMap {
        let mut merged = self.original.clone();
        for (key, value) in &self.changed {
            let keep_empty_ancestors = value.is_null();
            let position = merged.keys().position(|existing| overlaps(existing, key));
            merged.retain(|existing, current| {
                if !overlaps(existing, key) {
                    return true;
                }
                keep_empty_ancestors
                    && existing.len() < key.len()
                    && current.is_empty_container()
            });
            match position {
                Some(index) if index < merged.len() => {
                    merged.shift_insert(index, key.clone(), value.clone());
                }
                _ => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
        merged
    }

    fn visible(&self) -> FlatMap {
        let mut flat = self.overlay();
        strip_nulls(&mut flat);
        flat
    }

    /// The logical current document.
    #[must_use]
    pub fn merged(&self) -> Value {
        inflate(&self.visible())
    }

    /// Current value at `path`, without nulls. `None` if absent or empty.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Value> {
        flat_get(&self.visible(), &path.to_string())
    }

    /// Highest array position visible directly below `path`.
    ///
    /// Positions are flat-map positions, so an element removed from the
    /// middle of an array leaves a gap rather than shifting its successors.
    #[must_use]
    pub fn last_position(&self, path: &Path) -> Option<usize> {
        let prefix = path.to_string();
        self.visible()
            .keys()
            .filter_map(|key| {
                let rest = if prefix.is_empty() {
                    key.as_str()
                } else {
                    key.strip_prefix(prefix.as_str())?.strip_prefix('.')?
                };
                rest.split('.').next()?.parse::<usize>().ok()
            })
            .max()
    }

    /// First free array position below `path`.
    #[must_use]
    pub fn next_position(&self, path: &Path) -> usize {
        self.last_position(path).map_or(0, |last| last + 1)
    }

    /// Persisted value at `path`, nulls included.
    #[must_use]
    pub fn original(&self, path: &Path) -> Option<Value> {
        flat_get(&self.original, &path.to_string())
    }

    /// Pending value at `path`, nulls included.
    #[must_use]
    pub fn changed(&self, path: &Path) -> Option<Value> {
        flat_get(&self.changed, &path.to_string())
    }

    /// Makes the current view the persisted snapshot.
    pub fn commit(&mut self) {
        self.original = self.visible();
        self.changed.clear();
        self.loaded = true;
    }

    /// Replaces the snapshot with a stored document.
    ///
    /// A projected read only holds some fields, so its top-level fields are
    /// laid over the current view instead of replacing it.
    pub fn load(&mut self, document: &Value, projected: bool) {
        let base = if projected {
            let mut current = self.merged();
            if let (Value::Map(fields), Value::Map(loaded)) = (&mut current, document) {
                for (key, value) in loaded {
                    fields.insert(key.clone(), value.clone());
                }
            }
            current
        } else {
            document.clone()
        };
        self.original = flatten(&base);
        self.changed.clear();
        self.loaded = true;
        self.partial = projected;
    }
}
