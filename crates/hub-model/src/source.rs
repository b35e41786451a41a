//! Uniform node tree for parsed JSON and XML source documents.
//!
//! Nodes live in an arena owned by [`SourceTree`] and are addressed by
//! [`NodeId`]. Sibling keys are unique: repeated keys (JSON arrays of
//! objects, repeated XML elements) are merged into a single node flagged as
//! an array, so a node is identified by its full path as well as its id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::path::SourcePath;

/// Handle to a node inside one [`SourceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content format of a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Json,
    Xml,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Xml => "xml",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw document content as returned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub uri: String,
    pub content: String,
}

/// Leaf value of a node without nested structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SourceValue {
    Null,
    /// Scalar rendered to text; empty and whitespace-only strings are kept.
    Text(String),
    /// Ordered scalars; nulls inside a sequence render as empty strings.
    Sequence(Vec<String>),
}

impl SourceValue {
    pub fn is_sequence(&self) -> bool {
        matches!(self, SourceValue::Sequence(_))
    }

    /// All scalars in document order.
    pub fn items(&self) -> Vec<&str> {
        match self {
            SourceValue::Null => Vec::new(),
            SourceValue::Text(text) => vec![text.as_str()],
            SourceValue::Sequence(items) => items.iter().map(String::as_str).collect(),
        }
    }

    fn into_items(self) -> Vec<String> {
        match self {
            SourceValue::Null => vec![String::new()],
            SourceValue::Text(text) => vec![text],
            SourceValue::Sequence(items) => items,
        }
    }

    /// Combine two values gathered for the same merged node.
    #[must_use]
    pub fn merge(self, other: SourceValue) -> SourceValue {
        let mut items = self.into_items();
        items.extend(other.into_items());
        SourceValue::Sequence(items)
    }
}

impl fmt::Display for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceValue::Null => f.write_str("null"),
            SourceValue::Text(text) => f.write_str(text),
            SourceValue::Sequence(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// One element or property in a parsed source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    pub id: NodeId,
    pub key: String,
    pub path: SourcePath,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Value was a JSON array or a repeated XML element.
    pub is_array: bool,
    /// Leaf value; `None` for nodes that only carry nested structure.
    pub value: Option<SourceValue>,
}

impl SourceNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of ancestors; top-level nodes have depth 0.
    pub fn depth(&self) -> usize {
        self.path.depth().saturating_sub(1)
    }
}

/// Arena of [`SourceNode`]s for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    format: DocumentFormat,
    nodes: Vec<SourceNode>,
    top_level: Vec<NodeId>,
}

impl SourceTree {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            nodes: Vec::new(),
            top_level: Vec::new(),
        }
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn top_level(&self) -> &[NodeId] {
        &self.top_level
    }

    pub fn get(&self, id: NodeId) -> Option<&SourceNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&SourceNode> {
        self.get(id).ok_or(ModelError::UnknownNode(id.0))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn children(&self, parent: Option<NodeId>) -> &[NodeId] {
        match parent {
            None => &self.top_level,
            Some(id) => self
                .nodes
                .get(id.0)
                .map_or(&[][..], |node| node.children.as_slice()),
        }
    }

    /// Find the child of `parent` (or a top-level node) with `key`.
    pub fn child_by_key(&self, parent: Option<NodeId>, key: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].key == key)
    }

    /// Locate a node by its full path. Returns `None` for the root path.
    pub fn find(&self, path: &SourcePath) -> Option<NodeId> {
        let mut current = None;
        for segment in path.segments() {
            current = Some(self.child_by_key(current, segment)?);
        }
        current
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    /// True when `ancestor` lies strictly above `descendant`.
    pub fn is_ancestor(&self, ancestor: NodeId, descendant: NodeId) -> bool {
        let mut current = self.parent(descendant);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// All node ids in document (pre-)order.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.top_level.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Insert `key` under `parent`, merging with an existing sibling of the
    /// same key. A merged sibling is flagged as an array. Returns the node id
    /// and whether the sibling already existed.
    pub fn insert(&mut self, parent: Option<NodeId>, key: &str) -> Result<(NodeId, bool)> {
        if let Some(parent) = parent
            && !self.contains(parent)
        {
            return Err(ModelError::UnknownNode(parent.0));
        }
        if let Some(existing) = self.child_by_key(parent, key) {
            return Ok((existing, true));
        }
        let id = NodeId(self.nodes.len());
        let path = match parent {
            Some(parent) => self.nodes[parent.0].path.child(key),
            None => SourcePath::new([key]),
        };
        self.nodes.push(SourceNode {
            id,
            key: key.to_string(),
            path,
            parent,
            children: Vec::new(),
            is_array: false,
            value: None,
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.top_level.push(id),
        }
        Ok((id, false))
    }

    pub fn mark_array(&mut self, id: NodeId) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(ModelError::UnknownNode(id.0))?;
        node.is_array = true;
        Ok(())
    }

    /// Attach a leaf value. A second value for the same node turns the
    /// stored value into a sequence and flags the node as an array.
    pub fn append_value(&mut self, id: NodeId, value: SourceValue) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or(ModelError::UnknownNode(id.0))?;
        node.value = Some(match node.value.take() {
            None => value,
            Some(existing) => {
                node.is_array = true;
                existing.merge(value)
            }
        });
        Ok(())
    }
}
