//! Equality queries and field projections.

use deltadoc_codec::{get_path, set_path, FlatMap, Path, Segment, Value};
use serde::{Deserialize, Serialize};

/// Name of the identity field.
pub const ID_FIELD: &str = "_id";

/// An equality query over dotted paths.
///
/// A document matches when every entry matches. Where a path crosses an
/// array without an index, each element is tried, and an array value
/// matches when any of its elements equals the expected value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: FlatMap,
}

impl Query {
    /// The empty query, matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches the document whose `_id` equals `id`.
    #[must_use]
    pub fn by_id(id: Value) -> Self {
        Self::all().field(ID_FIELD, id)
    }

    /// Builds a query from flattened field values.
    #[must_use]
    pub fn from_flat(conditions: FlatMap) -> Self {
        Self { conditions }
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn field(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(path.into(), value.into());
        self
    }

    /// True when the query has no conditions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the conditions.
    #[must_use]
    pub fn conditions(&self) -> &FlatMap {
        &self.conditions
    }

    /// Tests `document` against every condition.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|(key, expected)| {
            Path::parse(key)
                .map(|path| {
                    let mut found = Vec::new();
                    collect(document, path.segments(), &mut found);
                    found.into_iter().any(|value| {
                        value == expected
                            || matches!(value, Value::Array(items) if items.contains(expected))
                    })
                })
                .unwrap_or(false)
        })
    }
}

fn collect<'a>(value: &'a Value, segments: &[Segment], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };
    match (value, head) {
        (Value::Map(fields), Segment::Key(key)) => {
            if let Some(child) = fields.get(key) {
                collect(child, rest, out);
            }
        }
        (Value::Array(items), Segment::Index(index)) => {
            if let Some(child) = items.get(*index) {
                collect(child, rest, out);
            }
        }
        (Value::Array(items), Segment::Key(_)) => {
            for item in items {
                collect(item, segments, out);
            }
        }
        (Value::Map(fields), Segment::Index(index)) => {
            if let Some(child) = fields.get(&index.to_string()) {
                collect(child, rest, out);
            }
        }
        _ => {}
    }
}

/// A list of dotted paths to return from a read. `_id` is always returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    fields: Vec<String>,
}

impl Projection {
    /// Creates a projection over `fields`.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the projected paths.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// True when no fields are listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copies the projected fields of `document` into a new document.
    #[must_use]
    pub fn apply(&self, document: &Value) -> Value {
        if self.is_empty() {
            return document.clone();
        }
        let mut out = Value::empty_map();
        let id = std::iter::once(ID_FIELD);
        for field in id.chain(self.fields.iter().map(String::as_str)) {
            let Ok(path) = Path::parse(field) else {
                continue;
            };
            if let Some(value) = get_path(document, &path) {
                // only fails on wildcards, which get_path never resolves
                let _ = set_path(&mut out, &path, value.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post() -> Value {
        Value::from(json!({
            "_id": 1,
            "title": "A",
            "tags": ["x", "y"],
            "comments": [{"author": "bob"}, {"author": "ann"}],
        }))
    }

    #[test]
    fn empty_query_matches_everything() {
        assert!(Query::all().matches(&post()));
    }

    #[test]
    fn equality_on_scalars_and_paths() {
        assert!(Query::all().field("title", "A").matches(&post()));
        assert!(!Query::all().field("title", "B").matches(&post()));
        assert!(Query::all().field("comments.1.author", "ann").matches(&post()));
        assert!(!Query::all().field("missing", "A").matches(&post()));
    }

    #[test]
    fn array_membership() {
        assert!(Query::all().field("tags", "y").matches(&post()));
        assert!(Query::all().field("tags.0", "x").matches(&post()));
        assert!(Query::all().field("comments.author", "bob").matches(&post()));
    }

    #[test]
    fn projection_keeps_id() {
        let projected = Projection::new(["title"]).apply(&post());
        assert_eq!(projected, Value::from(json!({"_id": 1, "title": "A"})));
    }

    #[test]
    fn empty_projection_is_identity() {
        assert_eq!(Projection::default().apply(&post()), post());
    }
}
