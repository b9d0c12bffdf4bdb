//! Dotted path addressing.
//!
//! A path such as `comments.0.author` is a sequence of segments joined by
//! `.`. Purely numeric segments address array positions; the `$` segment is
//! the wildcard used by schema paths to mean "any index".

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use std::fmt;

/// The wildcard segment used in schema paths.
pub const WILDCARD: &str = "$";

/// A single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Map field name.
    Key(String),
    /// Array position.
    Index(usize),
    /// Any array position (schema paths only).
    Wildcard,
}

impl Segment {
    /// Parses one segment.
    fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        if text == WILDCARD {
            return Some(Segment::Wildcard);
        }
        if text.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = text.parse() {
                return Some(Segment::Index(index));
            }
        }
        Some(Segment::Key(text.to_string()))
    }

    /// True for index and wildcard segments.
    pub fn is_positional(&self) -> bool {
        matches!(self, Segment::Index(_) | Segment::Wildcard)
    }

    /// The empty container this segment addresses into.
    #[must_use]
    pub fn empty_container(&self) -> Value {
        if self.is_positional() {
            Value::Array(Vec::new())
        } else {
            Value::empty_map()
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{index}"),
            Segment::Wildcard => f.write_str(WILDCARD),
        }
    }
}

/// A parsed dotted path. The empty path addresses the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a dotted path. The empty string is the root path.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidPath`] if any segment is empty
    /// (`a..b`, a leading or trailing dot).
    pub fn parse(text: &str) -> CodecResult<Self> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let segments = text
            .split('.')
            .map(Segment::parse)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| CodecError::invalid_path(text, "empty segment"))?;
        Ok(Self { segments })
    }

    /// Builds a path from segments.
    #[must_use]
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Returns the segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the last segment.
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns a new path extended with a field name.
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(Segment::Key(key.into()))
    }

    /// Returns a new path extended with an array position.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(Segment::Index(index))
    }

    /// Returns a new path extended with `segment`.
    #[must_use]
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// The first `len` segments.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    /// The segments after the first `len`.
    #[must_use]
    pub fn suffix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[len.min(self.segments.len())..].to_vec(),
        }
    }

    /// True if `self` equals `other` or is one of its ancestors.
    #[must_use]
    pub fn covers(&self, other: &Path) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Replaces every index segment with the wildcard.
    #[must_use]
    pub fn to_schema_form(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|s| match s {
                    Segment::Index(_) => Segment::Wildcard,
                    other => other.clone(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Path {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Joins a parent dotted path and a child segment.
#[must_use]
pub fn join(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

/// True if `path` equals `ancestor` or lies below it.
///
/// Works on dotted strings so that flat maps can be scanned without
/// parsing every key.
#[must_use]
pub fn covers(ancestor: &str, path: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'.')
}

/// True if one of the two paths covers the other.
#[must_use]
pub fn overlaps(a: &str, b: &str) -> bool {
    covers(a, b) || covers(b, a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_segments() {
        let path = Path::parse("comments.12.$.author").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("comments".into()),
                Segment::Index(12),
                Segment::Wildcard,
                Segment::Key("author".into()),
            ]
        );
        assert_eq!(path.to_string(), "comments.12.$.author");
    }

    #[test]
    fn empty_string_is_root() {
        assert!(Path::parse("").unwrap().is_empty());
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!(matches!(
            Path::parse("a..b"),
            Err(CodecError::InvalidPath { .. })
        ));
        assert!(Path::parse(".a").is_err());
        assert!(Path::parse("a.").is_err());
    }

    #[test]
    fn positional_segments_open_arrays() {
        assert_eq!(Segment::Index(0).empty_container(), Value::Array(Vec::new()));
        assert_eq!(Segment::Wildcard.empty_container(), Value::Array(Vec::new()));
        assert_eq!(Segment::Key("k".into()).empty_container(), Value::empty_map());
    }

    #[test]
    fn schema_form_replaces_indexes() {
        let path = Path::parse("c.3.l.0").unwrap();
        assert_eq!(path.to_schema_form().to_string(), "c.$.l.$");
    }

    #[test]
    fn string_covers() {
        assert!(covers("a", "a"));
        assert!(covers("a", "a.b"));
        assert!(!covers("a", "ab"));
        assert!(!covers("a.b", "a"));
        assert!(covers("", "anything"));
        assert!(overlaps("a.b", "a"));
    }

    #[test]
    fn path_covers() {
        let parent = Path::parse("c.0").unwrap();
        assert!(parent.covers(&Path::parse("c.0.x").unwrap()));
        assert!(!parent.covers(&Path::parse("c.1").unwrap()));
        assert_eq!(Path::parse("c.0.x").unwrap().suffix(2).to_string(), "x");
    }
}
