//! Atomic operation compiler.
//!
//! [`UpdateBuilder`] keeps the pending operator document up to date as each
//! mutation happens, instead of diffing snapshots at flush time. Every
//! method takes the resolved on-wire path and leaves at most one operator
//! per path:
//!
//! - numeric writes become a net `$inc` against the persisted value
//! - other writes become `$set`
//! - removing a value that never reached storage cancels the pending write
//! - popping an element that was only pushed retracts the push
//! - writes below a pending `$set` container, or below a pushed element,
//!   are folded into that operand
//! - writes that would share an array with a pending `$pop` or `$pushAll`
//!   collapse into one `$set` of the whole array (see
//!   [`UpdateBuilder::array_to_replace`])

use crate::error::{CoreError, CoreResult};
use deltadoc_codec::{covers, get_path_mut, remove_path, set_path, FlatMap, Path, Segment, Value};
use deltadoc_storage::{Operator, UpdateDocument};
use tracing::trace;

/// Location of a path inside a pending `$pushAll` operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendTarget {
    /// Wire path of the array being pushed to.
    pub array: String,
    /// Position inside the pending operand (not the logical array).
    pub position: usize,
    /// Wire path below the pushed element; empty for the element itself.
    pub rest: Path,
}

/// What a pop did to the pending operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    /// A pending push was undone; storage never sees the element.
    Retracted,
    /// A removal will reach storage.
    Removed,
}

/// Builds the pending operator document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateBuilder {
    pending: UpdateDocument,
}

impl UpdateBuilder {
    /// Creates a builder with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The pending operator document.
    #[must_use]
    pub fn pending(&self) -> &UpdateDocument {
        &self.pending
    }

    /// Entries of the slot named `name` (`set`, `$pushAll`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOperator`] for names outside the fixed
    /// operator set.
    pub fn slot(&self, name: &str) -> CoreResult<&FlatMap> {
        Operator::from_wire(name)
            .map(|op| self.pending.slot(op))
            .ok_or_else(|| CoreError::UnknownOperator {
                name: name.to_string(),
            })
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of values pending in `$pushAll` for `array`.
    #[must_use]
    pub fn appended_len(&self, array: &str) -> usize {
        self.pending
            .slot(Operator::PushAll)
            .get(array)
            .and_then(Value::as_array)
            .map_or(0, <[Value]>::len)
    }

    /// Records a write of `value` at `wire`.
    ///
    /// `original` is the persisted value at the path, used to turn numeric
    /// writes into increments.
    ///
    /// # Errors
    ///
    /// Fails if the path cannot be written inside a pending container
    /// operand. Nothing changes on error.
    pub fn set(
        &mut self,
        wire: &Path,
        value: Value,
        original: Option<&Value>,
        appended: Option<&AppendTarget>,
    ) -> CoreResult<()> {
        if let Some(target) = appended {
            return self.edit_appended(target, |element| {
                Ok(set_path(element, &target.rest, value)?)
            });
        }
        if let Some((key, rest)) = self.absorbing_entry(wire, false) {
            return self.edit_entry(Operator::Set, &key, |container| {
                Ok(set_path(container, &rest, value)?)
            });
        }

        let key = wire.to_string();
        self.discard(&key, &Operator::ALL);
        if !value.is_numeric() {
            self.slot_mut(Operator::Set).insert(key, value);
            return Ok(());
        }
        let delta = match original {
            None | Some(Value::Null) => Some(value.clone()),
            Some(previous) if previous.is_numeric() => value.sub(previous),
            Some(_) => None,
        };
        match delta {
            Some(delta) if delta.is_zero() && original == Some(&value) => {
                trace!(path = %key, "numeric write matches the stored value");
            }
            Some(delta) if !delta.is_zero() => {
                trace!(path = %key, delta = ?delta, "numeric write becomes $inc");
                self.slot_mut(Operator::Inc).insert(key, delta);
            }
            _ => {
                self.slot_mut(Operator::Set).insert(key, value);
            }
        }
        Ok(())
    }

    /// Records the removal of `wire`.
    ///
    /// Pending writes at or below the path are dropped. `$unset` is only
    /// emitted when `persisted` says storage holds a value there.
    ///
    /// # Errors
    ///
    /// Same as [`UpdateBuilder::set`].
    pub fn unset(
        &mut self,
        wire: &Path,
        persisted: bool,
        appended: Option<&AppendTarget>,
    ) -> CoreResult<()> {
        if let Some(target) = appended {
            if target.rest.is_empty() {
                trace!(path = %wire, "unset retracts a pushed element");
                self.remove_appended(&target.array, target.position);
                return Ok(());
            }
            return self.edit_appended(target, |element| {
                remove_path(element, &target.rest);
                Ok(())
            });
        }
        if let Some((key, rest)) = self.absorbing_entry(wire, false) {
            return self.edit_entry(Operator::Set, &key, |container| {
                remove_path(container, &rest);
                Ok(())
            });
        }

        let key = wire.to_string();
        let cancelled = self.discard(&key, &Operator::ALL);
        if persisted {
            self.slot_mut(Operator::Unset).insert(key, Value::Int(1));
        } else if cancelled {
            trace!(path = %key, "unset cancels a pending write");
        }
        Ok(())
    }

    /// Records an append of `values` to the array at `wire`.
    ///
    /// # Errors
    ///
    /// Same as [`UpdateBuilder::set`].
    pub fn push(
        &mut self,
        wire: &Path,
        values: Vec<Value>,
        appended: Option<&AppendTarget>,
    ) -> CoreResult<()> {
        if let Some(target) = appended {
            return self.edit_appended(target, |element| extend_at(element, &target.rest, values));
        }
        if let Some((key, rest)) = self.absorbing_entry(wire, true) {
            return self.edit_entry(Operator::Set, &key, |container| {
                extend_at(container, &rest, values)
            });
        }
        let key = wire.to_string();
        match self.slot_mut(Operator::PushAll).get_mut(&key) {
            Some(Value::Array(items)) => items.extend(values),
            _ => {
                self.slot_mut(Operator::PushAll)
                    .insert(key, Value::Array(values));
            }
        }
        Ok(())
    }

    /// Records the removal of the last element of the array at `wire`.
    ///
    /// `remaining` is the wire form of the array after the pop. It is sent
    /// as `$set` when a single `$pop` can no longer express the change.
    ///
    /// # Errors
    ///
    /// Same as [`UpdateBuilder::set`].
    pub fn pop(
        &mut self,
        wire: &Path,
        remaining: Value,
        appended: Option<&AppendTarget>,
    ) -> CoreResult<PopOutcome> {
        if let Some(target) = appended {
            self.edit_appended(target, |element| {
                if let Some(Value::Array(items)) = get_path_mut(element, &target.rest) {
                    items.pop();
                }
                Ok(())
            })?;
            return Ok(PopOutcome::Retracted);
        }
        if let Some((key, rest)) = self.absorbing_entry(wire, true) {
            self.edit_entry(Operator::Set, &key, |container| {
                if let Some(Value::Array(items)) = get_path_mut(container, &rest) {
                    items.pop();
                }
                Ok(())
            })?;
            return Ok(PopOutcome::Removed);
        }

        let key = wire.to_string();
        let pushed = self.appended_len(&key);
        if pushed > 0 {
            trace!(path = %key, "pop retracts a pending push");
            self.remove_appended(&key, pushed - 1);
            return Ok(PopOutcome::Retracted);
        }

        let popped_before = self.pending.slot(Operator::Pop).contains_key(&key);
        let below = self.discard_below(&key);
        if popped_before || below {
            self.slot_mut(Operator::Pop).shift_remove(&key);
            self.slot_mut(Operator::Unset).shift_remove(&key);
            self.slot_mut(Operator::Set).insert(key, remaining);
        } else {
            self.slot_mut(Operator::Pop).insert(key, Value::Int(1));
        }
        Ok(PopOutcome::Removed)
    }

    /// Depth of the array that a write at `wire` would share with another
    /// pending operator, if any.
    ///
    /// An array with a pending `$pop` or `$pushAll` above `wire` conflicts
    /// with any write inside it. With `inclusive`, `wire` itself is checked
    /// as the target of a push: a pending `$pop` there, or any entry below
    /// it, conflicts with `$pushAll`. Writes inside pushed elements are
    /// folded by the caller before asking.
    #[must_use]
    pub fn array_to_replace(&self, wire: &Path, inclusive: bool) -> Option<usize> {
        let pop = self.pending.slot(Operator::Pop);
        let push = self.pending.slot(Operator::PushAll);
        for depth in 1..wire.len() {
            let key = wire.prefix(depth).to_string();
            if pop.contains_key(&key) || push.contains_key(&key) {
                return Some(depth);
            }
        }
        if !inclusive {
            return None;
        }
        let key = wire.to_string();
        let below = [Operator::Set, Operator::Unset, Operator::Inc]
            .into_iter()
            .flat_map(|op| self.pending.slot(op).keys())
            .any(|existing| existing.len() > key.len() && covers(&key, existing));
        (pop.contains_key(&key) || below).then_some(wire.len())
    }

    /// Replaces every pending entry at or below `wire` with one `$set` of
    /// `value`.
    pub fn replace(&mut self, wire: &Path, value: Value) {
        let key = wire.to_string();
        trace!(path = %key, "conflicting array operators collapse into $set");
        self.discard(&key, &Operator::ALL);
        self.slot_mut(Operator::Set).insert(key, value);
    }

    fn slot_mut(&mut self, operator: Operator) -> &mut FlatMap {
        self.pending.slot_mut(operator)
    }

    /// Drops entries at or below `key` from `operators`. Returns true if
    /// anything was dropped.
    fn discard(&mut self, key: &str, operators: &[Operator]) -> bool {
        let mut dropped = false;
        for op in operators {
            let slot = self.pending.slot_mut(*op);
            let before = slot.len();
            slot.retain(|existing, _| !covers(key, existing));
            dropped |= slot.len() != before;
        }
        dropped
    }

    /// Drops `$set`, `$unset` and `$inc` entries strictly below `key`.
    fn discard_below(&mut self, key: &str) -> bool {
        let mut dropped = false;
        for op in [Operator::Set, Operator::Unset, Operator::Inc] {
            let slot = self.pending.slot_mut(op);
            let before = slot.len();
            slot.retain(|existing, _| {
                existing.len() <= key.len() || !covers(key, existing)
            });
            dropped |= slot.len() != before;
        }
        dropped
    }

    /// Finds a `$set` or `$unset` entry above `wire` (or at it, when
    /// `inclusive`) that must absorb a write at `wire`.
    ///
    /// An `$unset` ancestor is turned into a `$set` of an empty container,
    /// and a scalar `$set` ancestor is replaced the same way. Returns the
    /// entry key and the path of `wire` relative to it.
    fn absorbing_entry(&mut self, wire: &Path, inclusive: bool) -> Option<(String, Path)> {
        let last = if inclusive { wire.len() } else { wire.len().saturating_sub(1) };
        for depth in 1..=last {
            let key = wire.prefix(depth).to_string();
            let rest = wire.suffix(depth);
            let container = rest
                .segments()
                .first()
                .map_or_else(|| Value::Array(Vec::new()), Segment::empty_container);

            if let Some(existing) = self.pending.slot(Operator::Set).get(&key) {
                if rest.is_empty() && !matches!(existing, Value::Array(_)) {
                    continue;
                }
                if !existing.is_container() {
                    self.slot_mut(Operator::Set).insert(key.clone(), container);
                }
                return Some((key, rest));
            }
            if self.slot_mut(Operator::Unset).shift_remove(&key).is_some() {
                trace!(path = %key, "write below an unset field becomes $set");
                self.slot_mut(Operator::Set).insert(key.clone(), container);
                return Some((key, rest));
            }
        }
        None
    }

    fn edit_entry(
        &mut self,
        operator: Operator,
        key: &str,
        edit: impl FnOnce(&mut Value) -> CoreResult<()>,
    ) -> CoreResult<()> {
        let Some(entry) = self.slot_mut(operator).get_mut(key) else {
            return Ok(());
        };
        let mut edited = entry.clone();
        edit(&mut edited)?;
        *entry = edited;
        Ok(())
    }

    fn edit_appended(
        &mut self,
        target: &AppendTarget,
        edit: impl FnOnce(&mut Value) -> CoreResult<()>,
    ) -> CoreResult<()> {
        let element = self
            .slot_mut(Operator::PushAll)
            .get_mut(&target.array)
            .and_then(Value::as_array_mut)
            .and_then(|items| items.get_mut(target.position));
        let Some(element) = element else {
            return Ok(());
        };
        let mut edited = element.clone();
        edit(&mut edited)?;
        *element = edited;
        Ok(())
    }

    fn remove_appended(&mut self, array: &str, position: usize) {
        let slot = self.slot_mut(Operator::PushAll);
        let now_empty = match slot.get_mut(array).and_then(Value::as_array_mut) {
            Some(items) => {
                if position < items.len() {
                    items.remove(position);
                }
                items.is_empty()
            }
            None => false,
        };
        if now_empty {
            slot.shift_remove(array);
        }
    }
}

fn extend_at(container: &mut Value, rest: &Path, values: Vec<Value>) -> CoreResult<()> {
    match get_path_mut(container, rest) {
        Some(Value::Array(items)) => {
            items.extend(values);
            Ok(())
        }
        _ => Ok(set_path(container, rest, Value::Array(values))?),
    }
}
