//! Schema tree nodes.

use crate::error::{CoreError, CoreResult};
use deltadoc_codec::{Path, Segment};
use indexmap::IndexMap;

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A declared leaf. Anything stored beneath it is accepted.
    Field,
    /// An embedded document with named children.
    Group(IndexMap<String, SchemaNode>),
    /// An embedded array; every element has the shape of the inner node.
    RepeatingGroup(Box<SchemaNode>),
}

/// A node in the field schema tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    kind: NodeKind,
    alias: Option<String>,
    open: bool,
}

/// Direction of a name translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Human field names to on-wire names.
    ToWire,
    /// On-wire names to human field names.
    FromWire,
}

impl SchemaNode {
    /// A leaf node.
    #[must_use]
    pub fn field() -> Self {
        Self {
            kind: NodeKind::Field,
            alias: None,
            open: false,
        }
    }

    /// An empty group node.
    #[must_use]
    pub fn group() -> Self {
        Self {
            kind: NodeKind::Group(IndexMap::new()),
            alias: None,
            open: false,
        }
    }

    /// Returns the node's shape.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// On-wire name of this node, if aliased.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// True if undeclared fields are accepted beneath this node.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn set_open(&mut self) {
        self.open = true;
    }

    /// Sets the on-wire name, failing if a different one was declared.
    pub(crate) fn set_alias(&mut self, alias: &str, path: &Path) -> CoreResult<()> {
        match &self.alias {
            Some(existing) if existing != alias => Err(CoreError::schema(format!(
                "'{path}' is aliased to both '{existing}' and '{alias}'"
            ))),
            _ => {
                self.alias = Some(alias.to_string());
                Ok(())
            }
        }
    }

    /// Direct child for a path segment.
    #[must_use]
    pub fn child(&self, segment: &Segment) -> Option<&SchemaNode> {
        match (&self.kind, segment) {
            (NodeKind::Group(children), Segment::Key(key)) => children.get(key),
            (NodeKind::RepeatingGroup(element), Segment::Index(_) | Segment::Wildcard) => {
                Some(element)
            }
            _ => None,
        }
    }

    fn child_mut(&mut self, segment: &Segment) -> Option<&mut SchemaNode> {
        match (&mut self.kind, segment) {
            (NodeKind::Group(children), Segment::Key(key)) => children.get_mut(key),
            (NodeKind::RepeatingGroup(element), Segment::Index(_) | Segment::Wildcard) => {
                Some(element)
            }
            _ => None,
        }
    }

    /// Node at `path` below this one.
    #[must_use]
    pub fn lookup(&self, path: &Path) -> Option<&SchemaNode> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub(crate) fn lookup_mut(&mut self, path: &Path) -> Option<&mut SchemaNode> {
        let mut node = self;
        for segment in path.segments() {
            node = node.child_mut(segment)?;
        }
        Some(node)
    }

    /// Creates the nodes along `path`, upgrading leaves to groups as needed.
    pub(crate) fn declare(&mut self, path: &Path) -> CoreResult<&mut SchemaNode> {
        let mut node = self;
        for (depth, segment) in path.segments().iter().enumerate() {
            let conflict = || {
                CoreError::schema(format!(
                    "'{}' is declared both as a repeating group and with named fields",
                    path.prefix(depth)
                ))
            };
            node = match segment {
                Segment::Key(key) => {
                    if node.kind == NodeKind::Field {
                        node.kind = NodeKind::Group(IndexMap::new());
                    }
                    match &mut node.kind {
                        NodeKind::Group(children) => {
                            children.entry(key.clone()).or_insert_with(SchemaNode::field)
                        }
                        _ => return Err(conflict()),
                    }
                }
                Segment::Wildcard => {
                    if node.kind == NodeKind::Field {
                        node.kind = NodeKind::RepeatingGroup(Box::new(SchemaNode::field()));
                    }
                    match &mut node.kind {
                        NodeKind::RepeatingGroup(element) => element,
                        _ => return Err(conflict()),
                    }
                }
                Segment::Index(_) => {
                    return Err(CoreError::schema(format!(
                        "schema path '{path}' must use '$' instead of array positions"
                    )))
                }
            };
        }
        Ok(node)
    }

    /// Name a child key takes in the other direction, and the child node.
    pub(crate) fn translate_key<'a>(
        &'a self,
        key: &str,
        direction: Direction,
    ) -> (String, Option<&'a SchemaNode>) {
        let NodeKind::Group(children) = &self.kind else {
            return (key.to_string(), None);
        };
        match direction {
            Direction::ToWire => match children.get(key) {
                Some(child) => (child.wire_name(key).to_string(), Some(child)),
                None => (key.to_string(), None),
            },
            Direction::FromWire => children
                .iter()
                .find(|(name, child)| child.wire_name(name) == key)
                .map_or_else(
                    || (key.to_string(), None),
                    |(name, child)| (name.clone(), Some(child)),
                ),
        }
    }

    /// On-wire name of a child declared as `name`.
    pub(crate) fn wire_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias.as_deref().unwrap_or(name)
    }

    /// Element node of a repeating group.
    pub(crate) fn element(&self) -> Option<&SchemaNode> {
        match &self.kind {
            NodeKind::RepeatingGroup(element) => Some(element),
            _ => None,
        }
    }
}
