//! Field mutations.

use super::Document;
use crate::error::{CoreError, CoreResult};
use crate::model::Model;
use crate::update::{AppendTarget, PopOutcome};
use deltadoc_codec::{flatten_at, Path, Segment, Value};

impl<M: Model> Document<M> {
    /// Writes `value` at `path`.
    ///
    /// Maps and arrays are flattened first, so `set("meta", {"k": 1})` and
    /// `set("meta.k", 1)` are the same write and existing siblings of `k`
    /// are kept. A null value removes the path, like [`Document::unset`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownField`] if any written path is not in
    /// the schema; nothing is written in that case.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> CoreResult<()> {
        self.assign(&Path::parse(path)?, value.into())
    }

    /// Writes every field of a map, in order. Keys may be dotted paths.
    ///
    /// # Errors
    ///
    /// Same as [`Document::set`]. A non-map value is rejected.
    pub fn set_all(&mut self, fields: impl Into<Value>) -> CoreResult<()> {
        self.assign(&Path::root(), fields.into())
    }

    pub(crate) fn assign(&mut self, path: &Path, value: Value) -> CoreResult<()> {
        let leaves = leaves(path, value)?;
        if let Some((root, _)) = leaves.iter().find(|(leaf, _)| leaf.is_empty()) {
            return Err(CoreError::invalid_state(format!(
                "'{root}' is the document root and only accepts a map"
            )));
        }
        for (leaf, _) in &leaves {
            self.check_legal(leaf)?;
        }
        for (leaf, value) in leaves {
            self.set_leaf(&leaf, value)?;
        }
        Ok(())
    }

    fn set_leaf(&mut self, path: &Path, value: Value) -> CoreResult<()> {
        if value.is_null() {
            return self.unset_path(path);
        }
        let wire = self.schema().wire_path(path);
        let wire_value = self.schema().value_to_wire(path, &value);
        let appended = self.append_target(path, &wire);
        if let Some(depth) = self.array_to_replace(&wire, appended.as_ref(), false) {
            self.tracker.write(path, value);
            self.replace_array(path, &wire, depth);
            return Ok(());
        }
        let original = self.tracker.original(path);
        self.builder
            .set(&wire, wire_value, original.as_ref(), appended.as_ref())?;
        self.tracker.write(path, value);
        Ok(())
    }

    /// Removes `path`.
    ///
    /// A no-op when the path holds no value and has no pending write. A
    /// field that only ever existed as a pending write is dropped from the
    /// pending operators instead of being sent as `$unset`.
    ///
    /// # Errors
    ///
    /// Returns an error only for a malformed path.
    pub fn unset(&mut self, path: &str) -> CoreResult<()> {
        self.unset_path(&Path::parse(path)?)
    }

    fn unset_path(&mut self, path: &Path) -> CoreResult<()> {
        if self.tracker.get(path).is_none() && self.tracker.changed(path).is_none() {
            return Ok(());
        }
        let wire = self.schema().wire_path(path);
        let appended = self.append_target(path, &wire);
        if let Some(depth) = self.array_to_replace(&wire, appended.as_ref(), false) {
            self.tracker.write(path, Value::Null);
            self.replace_array(path, &wire, depth);
            return Ok(());
        }
        let persisted = self
            .tracker
            .original(path)
            .is_some_and(|value| !value.is_null());
        self.builder.unset(&wire, persisted, appended.as_ref())?;
        self.tracker.write(path, Value::Null);
        Ok(())
    }

    /// Adds `amount` to the number at `path` and returns the new value.
    /// A missing field counts as zero.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NonNumericOperand`] or
    /// [`CoreError::NonNumericTarget`] when either side is not a number,
    /// and the errors of [`Document::set`].
    pub fn inc(&mut self, path: &str, amount: impl Into<Value>) -> CoreResult<Value> {
        let parsed = Path::parse(path)?;
        let amount = amount.into();
        if !amount.is_numeric() {
            return Err(CoreError::NonNumericOperand {
                path: path.to_string(),
            });
        }
        let current = self.tracker.get(&parsed).unwrap_or(Value::Int(0));
        let next = current
            .add(&amount)
            .ok_or_else(|| CoreError::NonNumericTarget {
                path: path.to_string(),
            })?;
        self.assign(&parsed, next.clone())?;
        Ok(next)
    }

    /// Appends `values` to the array at `path` and returns its new length.
    /// A missing array is created.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownField`] for undeclared paths and
    /// [`CoreError::NotAnArray`] if the field holds something else.
    pub fn push<I, V>(&mut self, path: &str, values: I) -> CoreResult<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let path = Path::parse(path)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.check_legal(&path)?;
        let len = match self.tracker.get(&path) {
            None => 0,
            Some(Value::Array(items)) => items.len(),
            Some(_) => return Err(CoreError::not_an_array(path.to_string())),
        };
        let start = self.tracker.next_position(&path);

        let elements: Vec<(Path, Value)> = values
            .into_iter()
            .enumerate()
            .map(|(offset, value)| (path.index(start + offset), value))
            .collect();
        for (at, value) in &elements {
            for (leaf, _) in leaves(at, value.clone())? {
                self.check_legal(&leaf)?;
            }
        }
        if elements.is_empty() {
            return Ok(len);
        }

        let wire = self.schema().wire_path(&path);
        let appended = self.append_target(&path, &wire);
        let wire_values = elements
            .iter()
            .map(|(at, value)| self.schema().value_to_wire(at, value))
            .collect();
        let replaced = self.array_to_replace(&wire, appended.as_ref(), true);
        if replaced.is_none() {
            self.builder.push(&wire, wire_values, appended.as_ref())?;
        }

        let added = elements.len();
        for (at, value) in elements {
            for (leaf, value) in leaves(&at, value)? {
                self.tracker.write(&leaf, value);
            }
        }
        if let Some(depth) = replaced {
            self.replace_array(&path, &wire, depth);
        }
        Ok(len + added)
    }

    /// Removes and returns the last element of the array at `path`.
    /// Returns `None` for an empty array.
    ///
    /// Popping an element that was pushed since the last persistence call
    /// retracts the push instead of emitting a removal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotAnArray`] if `path` does not hold an array.
    pub fn pop(&mut self, path: &str) -> CoreResult<Option<Value>> {
        let path = Path::parse(path)?;
        let Some(Value::Array(mut items)) = self.tracker.get(&path) else {
            return Err(CoreError::not_an_array(path.to_string()));
        };
        let Some(last) = items.pop() else {
            return Ok(None);
        };
        let position = self.tracker.last_position(&path).unwrap_or(items.len());

        let wire = self.schema().wire_path(&path);
        let appended = self.append_target(&path, &wire);
        let remaining = self.schema().value_to_wire(&path, &Value::Array(items.clone()));
        let replaced = self.array_to_replace(&wire, appended.as_ref(), false);
        let outcome = match replaced {
            Some(_) => PopOutcome::Removed,
            None => self.builder.pop(&wire, remaining, appended.as_ref())?,
        };

        if items.is_empty() {
            let stored = self.tracker.original(&path).is_some();
            let emptied = if outcome == PopOutcome::Retracted && !stored {
                Value::Null
            } else {
                Value::Array(Vec::new())
            };
            self.tracker.write(&path, emptied);
        } else {
            self.tracker.write(&path.index(position), Value::Null);
        }
        if let Some(depth) = replaced {
            self.replace_array(&path, &wire, depth);
        }
        Ok(Some(last))
    }

    pub(crate) fn check_legal(&self, path: &Path) -> CoreResult<()> {
        if !self.binding.config.strict_schema || self.schema().is_legal(path) {
            Ok(())
        } else {
            Err(CoreError::unknown_field(path.to_string()))
        }
    }

    /// Depth of the array whose pending operators a write at `wire` would
    /// conflict with. Writes inside pushed elements never conflict.
    fn array_to_replace(
        &self,
        wire: &Path,
        appended: Option<&AppendTarget>,
        inclusive: bool,
    ) -> Option<usize> {
        if appended.is_some() {
            return None;
        }
        self.builder.array_to_replace(wire, inclusive)
    }

    /// Sends the array at `depth` as a whole, taken from the tracker after
    /// the write has been applied there.
    fn replace_array(&mut self, path: &Path, wire: &Path, depth: usize) {
        let array = path.prefix(depth);
        let current = self
            .tracker
            .get(&array)
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let wire_value = self.schema().value_to_wire(&array, &current);
        self.builder.replace(&wire.prefix(depth), wire_value);
    }

    /// Finds the pending push, if any, that `path` points into.
    ///
    /// Pushed elements sit at the end of their array, so a position at or
    /// past `next_position - pushed` lands inside the pending operand.
    fn append_target(&self, path: &Path, wire: &Path) -> Option<AppendTarget> {
        for (depth, segment) in path.segments().iter().enumerate() {
            let Segment::Index(index) = segment else {
                continue;
            };
            let array_wire = wire.prefix(depth).to_string();
            let pushed = self.builder.appended_len(&array_wire);
            if pushed == 0 {
                continue;
            }
            let base = self
                .tracker
                .next_position(&path.prefix(depth))
                .saturating_sub(pushed);
            if *index >= base {
                return Some(AppendTarget {
                    array: array_wire,
                    position: index - base,
                    rest: wire.suffix(depth + 1),
                });
            }
        }
        None
    }
}

/// Splits a write into leaf writes. Empty containers and scalars are
/// leaves.
fn leaves(path: &Path, value: Value) -> CoreResult<Vec<(Path, Value)>> {
    if !value.is_container() || value.is_empty_container() {
        if path.is_empty() && value.is_empty_container() {
            return Ok(Vec::new());
        }
        return Ok(vec![(path.clone(), value)]);
    }
    flatten_at(&path.to_string(), &value)
        .into_iter()
        .map(|(key, leaf)| Ok((Path::parse(&key)?, leaf)))
        .collect()
}
