//! Partial-update operator documents.

use crate::error::{StorageError, StorageResult};
use deltadoc_codec::{get_path, get_path_mut, remove_path, set_path, FlatMap, Path, Value};
use std::fmt;
use std::str::FromStr;

/// An update operator from the partial-update vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// Overwrite a field.
    Set,
    /// Remove a field.
    Unset,
    /// Add to a numeric field.
    Inc,
    /// Remove the last (or first) element of an array.
    Pop,
    /// Append values to an array.
    PushAll,
    /// Append values not already present.
    AddToSet,
    /// Remove all occurrences of values.
    PullAll,
    /// Bitwise and/or/xor on an integer.
    Bit,
}

impl Operator {
    /// All operators, in the order they are applied.
    ///
    /// `$pop` runs before `$pushAll` so that a removal always targets an
    /// element that was stored before the pending appends.
    pub const ALL: [Operator; 8] = [
        Operator::Set,
        Operator::Unset,
        Operator::Inc,
        Operator::Pop,
        Operator::PushAll,
        Operator::AddToSet,
        Operator::PullAll,
        Operator::Bit,
    ];

    /// The operator's name on the wire.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Operator::Set => "$set",
            Operator::Unset => "$unset",
            Operator::Inc => "$inc",
            Operator::PushAll => "$pushAll",
            Operator::Pop => "$pop",
            Operator::AddToSet => "$addToSet",
            Operator::PullAll => "$pullAll",
            Operator::Bit => "$bit",
        }
    }

    /// Looks up an operator by wire name. The leading `$` is optional.
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        let bare = name.strip_prefix('$').unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|op| &op.wire_name()[1..] == bare)
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| s.to_string())
    }
}

/// An operator-keyed partial update.
///
/// Every operator always has a slot, possibly empty, so the shape of the
/// document is uniform. Each slot maps a dotted wire path to the operand
/// for that path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDocument {
    slots: [FlatMap; 8],
}

impl UpdateDocument {
    /// Creates an update with every slot empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entries for `operator`.
    #[must_use]
    pub fn slot(&self, operator: Operator) -> &FlatMap {
        &self.slots[operator.slot()]
    }

    /// Returns the entries for `operator` mutably.
    pub fn slot_mut(&mut self, operator: Operator) -> &mut FlatMap {
        &mut self.slots[operator.slot()]
    }

    /// True when no slot has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(FlatMap::is_empty)
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(FlatMap::clear);
    }

    /// Iterates over the non-empty slots in application order.
    pub fn active(&self) -> impl Iterator<Item = (Operator, &FlatMap)> + '_ {
        Operator::ALL
            .into_iter()
            .map(|op| (op, self.slot(op)))
            .filter(|(_, entries)| !entries.is_empty())
    }

    /// Renders the non-empty slots as `{"$set": {...}, ...}`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.active()
                .map(|(op, entries)| (op.wire_name().to_string(), Value::Map(entries.clone())))
                .collect(),
        )
    }

    /// Applies every operator to `document`.
    ///
    /// Slots are applied in [`Operator::ALL`] order and entries in insertion
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OperatorMisapplied`] when an operand or
    /// target has the wrong type, and a codec error when a path cannot be
    /// written. The document may be partially updated on error.
    pub fn apply_to(&self, document: &mut Value) -> StorageResult<()> {
        for (operator, entries) in self.active() {
            for (key, operand) in entries {
                let path = Path::parse(key)?;
                apply_one(document, operator, &path, operand)?;
            }
        }
        Ok(())
    }
}

fn apply_one(
    document: &mut Value,
    operator: Operator,
    path: &Path,
    operand: &Value,
) -> StorageResult<()> {
    let misapplied = |message: &str| {
        StorageError::operator_misapplied(operator.wire_name(), path.to_string(), message)
    };

    match operator {
        Operator::Set => set_path(document, path, operand.clone())?,
        Operator::Unset => {
            let parent_is_array = path.len() > 1
                && matches!(
                    get_path(document, &path.prefix(path.len() - 1)),
                    Some(Value::Array(_))
                );
            if parent_is_array {
                // array positions are nulled, not shifted
                if get_path(document, path).is_some() {
                    set_path(document, path, Value::Null)?;
                }
            } else {
                remove_path(document, path);
            }
        }
        Operator::Inc => {
            if !operand.is_numeric() {
                return Err(misapplied("operand is not numeric"));
            }
            let next = match get_path(document, path) {
                None | Some(Value::Null) => operand.clone(),
                Some(current) => current
                    .add(operand)
                    .ok_or_else(|| misapplied("target is not numeric"))?,
            };
            set_path(document, path, next)?;
        }
        Operator::PushAll => {
            let Value::Array(values) = operand else {
                return Err(misapplied("operand is not an array"));
            };
            match get_path_mut(document, path) {
                None => set_path(document, path, operand.clone())?,
                Some(Value::Array(items)) => items.extend(values.iter().cloned()),
                Some(_) => return Err(misapplied("target is not an array")),
            }
        }
        Operator::Pop => match get_path_mut(document, path) {
            None => {}
            Some(Value::Array(items)) => {
                if operand.as_f64().is_some_and(|n| n < 0.0) {
                    if !items.is_empty() {
                        items.remove(0);
                    }
                } else {
                    items.pop();
                }
            }
            Some(_) => return Err(misapplied("target is not an array")),
        },
        Operator::AddToSet => {
            let values = match operand.get("$each") {
                Some(Value::Array(each)) => each.clone(),
                _ => vec![operand.clone()],
            };
            match get_path_mut(document, path) {
                None => set_path(document, path, Value::Array(dedup(values)))?,
                Some(Value::Array(items)) => {
                    for value in values {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                }
                Some(_) => return Err(misapplied("target is not an array")),
            }
        }
        Operator::PullAll => {
            let Value::Array(values) = operand else {
                return Err(misapplied("operand is not an array"));
            };
            match get_path_mut(document, path) {
                None => {}
                Some(Value::Array(items)) => items.retain(|item| !values.contains(item)),
                Some(_) => return Err(misapplied("target is not an array")),
            }
        }
        Operator::Bit => {
            let mut current = match get_path(document, path) {
                None | Some(Value::Null) => 0,
                Some(Value::Int(n)) => *n,
                Some(_) => return Err(misapplied("target is not an integer")),
            };
            let Value::Map(ops) = operand else {
                return Err(misapplied("operand must be a map of and/or/xor"));
            };
            for (name, mask) in ops {
                let mask = mask
                    .as_int()
                    .ok_or_else(|| misapplied("bit mask is not an integer"))?;
                current = match name.as_str() {
                    "and" => current & mask,
                    "or" => current | mask,
                    "xor" => current ^ mask,
                    _ => return Err(misapplied("unknown bitwise operation")),
                };
            }
            set_path(document, path, Value::Int(current))?;
        }
    }
    Ok(())
}

fn dedup(values: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn update(entries: &[(Operator, &str, Value)]) -> UpdateDocument {
        let mut update = UpdateDocument::new();
        for (op, path, value) in entries {
            update.slot_mut(*op).insert((*path).to_string(), value.clone());
        }
        update
    }

    #[test]
    fn operator_names() {
        assert_eq!(Operator::from_wire("$pushAll"), Some(Operator::PushAll));
        assert_eq!(Operator::from_wire("inc"), Some(Operator::Inc));
        assert_eq!(Operator::from_wire("$rename"), None);
        assert_eq!("$bit".parse::<Operator>(), Ok(Operator::Bit));
    }

    #[test]
    fn empty_update_renders_as_empty_map() {
        let update = UpdateDocument::new();
        assert!(update.is_empty());
        assert_eq!(update.to_value(), Value::empty_map());
    }

    #[test]
    fn to_value_skips_empty_slots() {
        let update = update(&[(Operator::Inc, "n", Value::Int(8))]);
        assert_eq!(update.to_value(), doc(json!({"$inc": {"n": 8}})));
    }

    #[test]
    fn set_unset_inc() {
        let mut target = doc(json!({"a": 1, "b": {"c": 2}, "n": 4}));
        update(&[
            (Operator::Set, "b.d", Value::from("x")),
            (Operator::Unset, "a", Value::Int(1)),
            (Operator::Inc, "n", Value::Int(5)),
            (Operator::Inc, "fresh", Value::Float(0.5)),
        ])
        .apply_to(&mut target)
        .unwrap();
        assert_eq!(
            target,
            doc(json!({"b": {"c": 2, "d": "x"}, "n": 9, "fresh": 0.5}))
        );
    }

    #[test]
    fn unset_array_element_nulls_it() {
        let mut target = doc(json!({"l": [1, 2, 3]}));
        update(&[(Operator::Unset, "l.1", Value::Int(1))])
            .apply_to(&mut target)
            .unwrap();
        assert_eq!(target, doc(json!({"l": [1, null, 3]})));
    }

    #[test]
    fn array_operators() {
        let mut target = doc(json!({"t": ["a", "b"], "u": [1, 2, 1, 3], "s": ["x"]}));
        update(&[
            (Operator::PushAll, "t", doc(json!(["c", "d"]))),
            (Operator::PushAll, "new", doc(json!([1]))),
            (Operator::PullAll, "u", doc(json!([1]))),
            (Operator::AddToSet, "s", doc(json!({"$each": ["x", "y"]}))),
        ])
        .apply_to(&mut target)
        .unwrap();
        assert_eq!(
            target,
            doc(json!({"t": ["a", "b", "c", "d"], "u": [2, 3], "s": ["x", "y"], "new": [1]}))
        );
    }

    #[test]
    fn pop_last_and_first() {
        let mut target = doc(json!({"a": [1, 2, 3], "b": [1, 2, 3]}));
        update(&[
            (Operator::Pop, "a", Value::Int(1)),
            (Operator::Pop, "b", Value::Int(-1)),
        ])
        .apply_to(&mut target)
        .unwrap();
        assert_eq!(target, doc(json!({"a": [1, 2], "b": [2, 3]})));
    }

    #[test]
    fn bitwise() {
        let mut target = doc(json!({"flags": 0b1100}));
        update(&[(Operator::Bit, "flags", doc(json!({"and": 0b0100, "or": 0b0001})))])
            .apply_to(&mut target)
            .unwrap();
        assert_eq!(target, doc(json!({"flags": 0b0101})));
    }

    #[test]
    fn inc_on_text_is_rejected() {
        let mut target = doc(json!({"title": "A"}));
        let err = update(&[(Operator::Inc, "title", Value::Int(1))])
            .apply_to(&mut target)
            .unwrap_err();
        assert!(matches!(err, StorageError::OperatorMisapplied { .. }));
    }

    #[test]
    fn push_onto_scalar_is_rejected() {
        let mut target = doc(json!({"t": 1}));
        assert!(update(&[(Operator::PushAll, "t", doc(json!([2])))])
            .apply_to(&mut target)
            .is_err());
    }
}
