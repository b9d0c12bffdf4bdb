//! Field schema: which dotted paths a document type accepts, and the
//! on-wire names they are stored under.
//!
//! Schema paths use `$` for "any position of this embedded array", so
//! `comments.$.author` declares the `author` field of every comment. The
//! declarations are compiled into a [`SchemaNode`] tree and legality checks
//! are a walk of that tree.
//!
//! ```
//! use deltadoc_codec::Path;
//! use deltadoc_core::FieldSchema;
//!
//! let mut schema = FieldSchema::new();
//! schema.declare("title").unwrap();
//! schema.alias("comments.$.author", "c.$.a").unwrap();
//!
//! let path = Path::parse("comments.3.author").unwrap();
//! assert!(schema.is_legal(&path));
//! assert_eq!(schema.resolve_alias(&path).unwrap().to_string(), "c.3.a");
//! assert!(!schema.is_legal(&Path::parse("body").unwrap()));
//! ```

mod alias;
mod node;

pub use node::{NodeKind, SchemaNode};

use crate::error::{CoreError, CoreResult};
use deltadoc_codec::{Path, Segment};
use deltadoc_storage::ID_FIELD;
use std::collections::HashSet;

/// Declared fields of a document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    root: SchemaNode,
    schemaless: bool,
    aliased: bool,
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self {
            root: SchemaNode::group(),
            schemaless: false,
            aliased: false,
        }
    }
}

impl FieldSchema {
    /// Creates an empty schema. Nothing but `_id` is legal until fields
    /// are declared.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a schema path.
    ///
    /// # Errors
    ///
    /// Fails on malformed paths, on array positions instead of `$`, and
    /// when a path uses `$` where another declared named fields (or the
    /// reverse).
    pub fn declare(&mut self, path: &str) -> CoreResult<()> {
        self.root.declare(&Path::parse(path)?)?;
        Ok(())
    }

    /// Accepts any field below `prefix`. The empty prefix opens the whole
    /// document.
    ///
    /// # Errors
    ///
    /// Same as [`FieldSchema::declare`].
    pub fn open(&mut self, prefix: &str) -> CoreResult<()> {
        self.root.declare(&Path::parse(prefix)?)?.set_open();
        Ok(())
    }

    /// Accepts every path.
    pub fn set_schemaless(&mut self) {
        self.schemaless = true;
    }

    /// True if every path is accepted.
    #[must_use]
    pub fn is_schemaless(&self) -> bool {
        self.schemaless
    }

    /// True if at least one alias was declared.
    #[must_use]
    pub fn is_aliased(&self) -> bool {
        self.aliased
    }

    /// Root of the schema tree.
    #[must_use]
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Schema node addressed by a document path.
    #[must_use]
    pub fn node(&self, path: &Path) -> Option<&SchemaNode> {
        self.root.lookup(path)
    }

    /// Maps `path` to the on-wire path `wire`, declaring `path` if needed.
    ///
    /// Both paths must have the same depth and `$` in the same positions.
    /// Every named segment gets the wire name at the same depth, so
    /// `comments.$.author -> c.$.a` also maps `comments` to `c`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Schema`] if the shapes differ, `_id` is
    /// aliased, a node already has a different alias, or two siblings
    /// would share a wire name.
    pub fn alias(&mut self, path: &str, wire: &str) -> CoreResult<()> {
        let path = Path::parse(path)?;
        let wire = Path::parse(wire)?;
        if path.len() != wire.len() || path.is_empty() {
            return Err(CoreError::schema(format!(
                "alias '{wire}' must have the same depth as '{path}'"
            )));
        }
        if is_id_path(&path) || is_id_path(&wire) {
            return Err(CoreError::schema("'_id' cannot be aliased"));
        }
        let shapes_match = path.segments().iter().zip(wire.segments()).all(|pair| {
            matches!(
                pair,
                (Segment::Key(_), Segment::Key(_)) | (Segment::Wildcard, Segment::Wildcard)
            )
        });
        if !shapes_match {
            return Err(CoreError::schema(format!(
                "alias '{wire}' must keep the '$' positions of '{path}'"
            )));
        }

        self.root.declare(&path)?;
        for (depth, segment) in wire.segments().iter().enumerate() {
            let Segment::Key(wire_key) = segment else {
                continue;
            };
            let at = path.prefix(depth + 1);
            if let Some(node) = self.root.lookup_mut(&at) {
                node.set_alias(wire_key, &at)?;
            }
            self.check_siblings(&path.prefix(depth))?;
        }
        self.aliased = true;
        Ok(())
    }

    fn check_siblings(&self, parent: &Path) -> CoreResult<()> {
        let Some(NodeKind::Group(children)) = self.root.lookup(parent).map(SchemaNode::kind) else {
            return Ok(());
        };
        let mut seen = HashSet::new();
        for (name, child) in children {
            let wire = child.wire_name(name);
            if !seen.insert(wire) {
                return Err(CoreError::schema(format!(
                    "wire name '{wire}' is used twice under '{parent}'"
                )));
            }
        }
        Ok(())
    }

    /// True if `path` may be written.
    ///
    /// A path is legal when it is a declared schema path (with positions
    /// in place of `$`), a prefix of one, or continues below a declared
    /// leaf or an open prefix. `_id` is always legal.
    #[must_use]
    pub fn is_legal(&self, path: &Path) -> bool {
        if self.schemaless || is_id_path(path) {
            return true;
        }
        let mut node = &self.root;
        for segment in path.segments() {
            if node.is_open() || *node.kind() == NodeKind::Field {
                return true;
            }
            match node.child(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        true
    }

    /// Returns the on-wire path for `path`.
    ///
    /// Without aliases the path is returned unchanged. Otherwise each named
    /// segment is replaced by its wire name and positions are kept. Below a
    /// declared leaf or an open prefix the remaining segments pass through.
    /// Returns `None` when the path leaves the declared tree; callers then
    /// use the path as given.
    #[must_use]
    pub fn resolve_alias(&self, path: &Path) -> Option<Path> {
        if !self.aliased || is_id_path(path) {
            return Some(path.clone());
        }
        let segments = path.segments();
        let mut out = Vec::with_capacity(segments.len());
        let mut node = &self.root;
        for (depth, segment) in segments.iter().enumerate() {
            if node.is_open() || *node.kind() == NodeKind::Field {
                out.extend_from_slice(&segments[depth..]);
                break;
            }
            let child = node.child(segment)?;
            out.push(match segment {
                Segment::Key(key) => Segment::Key(child.wire_name(key).to_string()),
                positional => positional.clone(),
            });
            node = child;
        }
        Some(Path::from_segments(out))
    }

    /// [`FieldSchema::resolve_alias`], falling back to `path` itself.
    #[must_use]
    pub fn wire_path(&self, path: &Path) -> Path {
        self.resolve_alias(path).unwrap_or_else(|| path.clone())
    }
}

fn is_id_path(path: &Path) -> bool {
    matches!(path.segments().first(), Some(Segment::Key(key)) if key == ID_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    fn blog() -> FieldSchema {
        let mut schema = FieldSchema::new();
        schema.declare("title").unwrap();
        schema.declare("tags.$").unwrap();
        schema.declare("meta").unwrap();
        schema.declare("comments.$.author").unwrap();
        schema.declare("comments.$.body").unwrap();
        schema
    }

    #[test]
    fn declared_paths_and_positions_are_legal() {
        let schema = blog();
        for ok in [
            "title",
            "tags",
            "tags.0",
            "tags.12",
            "comments",
            "comments.1",
            "comments.1.author",
            "_id",
        ] {
            assert!(schema.is_legal(&path(ok)), "{ok}");
        }
    }

    #[test]
    fn continuation_below_a_leaf_is_legal() {
        let schema = blog();
        assert!(schema.is_legal(&path("meta.keywords")));
        assert!(schema.is_legal(&path("meta.a.b.c")));
    }

    #[test]
    fn undeclared_paths_are_rejected() {
        let schema = blog();
        for bad in ["body", "comments.1.likes", "comments.author", "tags.x", "title2"] {
            assert!(!schema.is_legal(&path(bad)), "{bad}");
        }
    }

    #[test]
    fn open_prefix_accepts_anything_below() {
        let mut schema = blog();
        schema.open("extra").unwrap();
        assert!(schema.is_legal(&path("extra.x.y")));
        assert!(!schema.is_legal(&path("other")));
        schema.set_schemaless();
        assert!(schema.is_legal(&path("other")));
    }

    #[test]
    fn unaliased_schema_resolves_to_itself() {
        let schema = blog();
        assert_eq!(schema.resolve_alias(&path("nope.1")), Some(path("nope.1")));
    }

    #[test]
    fn positional_alias_resolution() {
        let mut schema = blog();
        schema.alias("title", "t").unwrap();
        schema.alias("comments.$.body", "c.$.b").unwrap();

        assert_eq!(schema.resolve_alias(&path("title")), Some(path("t")));
        assert_eq!(schema.resolve_alias(&path("comments.4.body")), Some(path("c.4.b")));
        assert_eq!(schema.resolve_alias(&path("comments.4")), Some(path("c.4")));
        assert_eq!(
            schema.resolve_alias(&path("comments.4.author")),
            Some(path("c.4.author"))
        );
        assert_eq!(schema.resolve_alias(&path("meta.k")), Some(path("meta.k")));
        assert_eq!(schema.resolve_alias(&path("_id")), Some(path("_id")));
        assert_eq!(schema.resolve_alias(&path("unknown.x")), None);
        assert_eq!(schema.wire_path(&path("unknown.x")), path("unknown.x"));
    }

    #[test]
    fn alias_shape_errors() {
        let mut schema = blog();
        assert!(schema.alias("comments.$.body", "c.b").is_err());
        assert!(schema.alias("comments.$.body", "c.b.x").is_err());
        assert!(schema.alias("_id", "i").is_err());
    }

    #[test]
    fn alias_conflicts() {
        let mut schema = blog();
        schema.alias("comments.$.body", "c.$.b").unwrap();
        assert!(schema.alias("comments.$.author", "k.$.a").is_err());

        let mut schema = blog();
        schema.alias("title", "t").unwrap();
        assert!(matches!(
            schema.alias("meta", "t"),
            Err(CoreError::Schema { .. })
        ));
    }
}
