//! Translation of whole values between field names and wire names.

use super::node::{Direction, SchemaNode};
use super::FieldSchema;
use deltadoc_codec::{FlatMap, Path, Value};
use deltadoc_storage::Projection;

impl FieldSchema {
    /// Renames the keys of a document to their wire names.
    #[must_use]
    pub fn to_wire(&self, document: &Value) -> Value {
        self.translate_root(document, Direction::ToWire)
    }

    /// Renames the keys of a stored document back to field names.
    #[must_use]
    pub fn from_wire(&self, document: &Value) -> Value {
        self.translate_root(document, Direction::FromWire)
    }

    /// Renames the keys of `value` as if it were stored at `at`.
    #[must_use]
    pub fn value_to_wire(&self, at: &Path, value: &Value) -> Value {
        if !self.is_aliased() {
            return value.clone();
        }
        translate(self.node(at), value, Direction::ToWire)
    }

    /// Resolves every key of a flat map to its wire path.
    #[must_use]
    pub fn flat_to_wire(&self, flat: &FlatMap) -> FlatMap {
        if !self.is_aliased() {
            return flat.clone();
        }
        flat.iter()
            .map(|(key, value)| {
                let wire = Path::parse(key)
                    .map(|path| self.wire_path(&path).to_string())
                    .unwrap_or_else(|_| key.clone());
                (wire, value.clone())
            })
            .collect()
    }

    /// Resolves every projected field to its wire path.
    #[must_use]
    pub fn projection_to_wire(&self, projection: &Projection) -> Projection {
        if !self.is_aliased() {
            return projection.clone();
        }
        Projection::new(projection.fields().iter().map(|field| {
            Path::parse(field)
                .map(|path| self.wire_path(&path).to_string())
                .unwrap_or_else(|_| field.clone())
        }))
    }

    fn translate_root(&self, document: &Value, direction: Direction) -> Value {
        if !self.is_aliased() {
            return document.clone();
        }
        translate(Some(self.root()), document, direction)
    }
}

fn translate(node: Option<&SchemaNode>, value: &Value, direction: Direction) -> Value {
    let Some(node) = node else {
        return value.clone();
    };
    match value {
        Value::Map(fields) => Value::Map(
            fields
                .iter()
                .map(|(key, child)| {
                    let (name, child_node) = node.translate_key(key, direction);
                    (name, translate(child_node, child, direction))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| translate(node.element(), item, direction))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}
