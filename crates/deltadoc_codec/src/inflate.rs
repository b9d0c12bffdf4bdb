//! Flat path map to nested document, plus in-place path editing.

use crate::error::{CodecError, CodecResult};
use crate::flatten::FlatMap;
use crate::path::{Path, Segment};
use crate::value::Value;
use indexmap::IndexMap;

/// Intermediate tree used while inflating. A branch becomes an array when
/// all of its keys are numeric, otherwise a map.
enum Node {
    Leaf(Value),
    Branch(IndexMap<String, Node>),
}

/// Rebuilds a nested document from a flat path map.
///
/// Integer segments create arrays and field segments create maps. Array
/// order follows the iteration order of `flat`, and positions are compacted
/// so that gaps left by removed indexes disappear. The root is always a map.
///
/// A parent that receives both integer and field segments becomes a map
/// keyed by the segment text. Documents that mix the two under one parent
/// have no defined round trip.
#[must_use]
pub fn inflate(flat: &FlatMap) -> Value {
    inflate_entries(flat.iter().map(|(path, value)| (path.as_str(), value)))
}

pub(crate) fn inflate_entries<'a, I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    Value::Map(
        build(entries)
            .into_iter()
            .map(|(key, node)| (key, node.into_value()))
            .collect(),
    )
}

/// Like [`inflate_entries`], but a root whose keys are all positions
/// becomes an array.
pub(crate) fn inflate_subtree<'a, I>(entries: I) -> Value
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    Node::Branch(build(entries)).into_value()
}

fn build<'a, I>(entries: I) -> IndexMap<String, Node>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut root = IndexMap::new();
    for (path, value) in entries {
        insert(&mut root, path, value.clone());
    }
    root
}

fn insert(root: &mut IndexMap<String, Node>, path: &str, value: Value) {
    let mut level = root;
    let mut parts = path.split('.').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            level.insert(part.to_string(), Node::Leaf(value));
            return;
        }
        let entry = level
            .entry(part.to_string())
            .or_insert_with(|| Node::Branch(IndexMap::new()));
        // a deeper path wins over an earlier leaf at its prefix
        if let Node::Leaf(_) = entry {
            *entry = Node::Branch(IndexMap::new());
        }
        let Node::Branch(children) = entry else {
            return;
        };
        level = children;
    }
}

impl Node {
    fn into_value(self) -> Value {
        match self {
            Node::Leaf(value) => value,
            Node::Branch(children) => {
                let sequence = children
                    .keys()
                    .all(|k| !k.is_empty() && k.bytes().all(|b| b.is_ascii_digit()));
                if sequence {
                    Value::Array(children.into_values().map(Node::into_value).collect())
                } else {
                    Value::Map(
                        children
                            .into_iter()
                            .map(|(key, node)| (key, node.into_value()))
                            .collect(),
                    )
                }
            }
        }
    }
}

/// Returns the value at `path`, if present.
#[must_use]
pub fn get_path<'a>(document: &'a Value, path: &Path) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(document, |current, segment| match (current, segment) {
            (Value::Map(fields), Segment::Key(key)) => fields.get(key),
            (Value::Map(fields), Segment::Index(index)) => fields.get(&index.to_string()),
            (Value::Array(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        })
}

/// Mutable variant of [`get_path`].
#[must_use]
pub fn get_path_mut<'a>(document: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = document;
    for segment in path.segments() {
        current = match (current, segment) {
            (Value::Map(fields), Segment::Key(key)) => fields.get_mut(key)?,
            (Value::Map(fields), Segment::Index(index)) => fields.get_mut(&index.to_string())?,
            (Value::Array(items), Segment::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at `path`, creating missing parents.
///
/// A missing parent is created as an array when the next segment is an
/// index and as a map otherwise. Writing past the end of an array pads it
/// with nulls.
///
/// # Errors
///
/// Returns an error if the path contains a wildcard, crosses a scalar, or
/// uses a field name against an array.
pub fn set_path(document: &mut Value, path: &Path, value: Value) -> CodecResult<()> {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        *document = value;
        return Ok(());
    };
    let mut current = document;
    for (depth, segment) in parents.iter().enumerate() {
        let next = &segments[depth + 1];
        let slot = child_slot(current, segment, path, depth)?;
        if !slot.is_container() {
            if !slot.is_null() {
                return Err(CodecError::not_a_container(path.prefix(depth + 1).to_string()));
            }
            *slot = next.empty_container();
        }
        current = slot;
    }
    *child_slot(current, last, path, parents.len())? = value;
    Ok(())
}

/// Returns the slot for `segment` under `parent`, creating it as null.
fn child_slot<'a>(
    parent: &'a mut Value,
    segment: &Segment,
    path: &Path,
    depth: usize,
) -> CodecResult<&'a mut Value> {
    match (parent, segment) {
        (Value::Map(fields), Segment::Key(key)) => {
            Ok(fields.entry(key.clone()).or_insert(Value::Null))
        }
        (Value::Map(fields), Segment::Index(index)) => {
            Ok(fields.entry(index.to_string()).or_insert(Value::Null))
        }
        (Value::Array(items), Segment::Index(index)) => {
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            Ok(&mut items[*index])
        }
        (_, Segment::Wildcard) => Err(CodecError::invalid_path(
            path.to_string(),
            "wildcard segments cannot be written",
        )),
        (Value::Array(_), segment) => Err(CodecError::segment_mismatch(
            path.prefix(depth).to_string(),
            segment.to_string(),
        )),
        _ => Err(CodecError::not_a_container(path.prefix(depth).to_string())),
    }
}

/// Removes and returns the value at `path`.
///
/// Array elements are removed, shifting later elements down.
pub fn remove_path(document: &mut Value, path: &Path) -> Option<Value> {
    let (last, _) = path.segments().split_last()?;
    let parent = get_path_mut(document, &path.prefix(path.len() - 1))?;
    match (parent, last) {
        (Value::Map(fields), Segment::Key(key)) => fields.shift_remove(key),
        (Value::Map(fields), Segment::Index(index)) => fields.shift_remove(&index.to_string()),
        (Value::Array(items), Segment::Index(index)) if *index < items.len() => {
            Some(items.remove(*index))
        }
        _ => None,
    }
}
