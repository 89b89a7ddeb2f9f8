// Tree substrate - the mutable document hierarchy edited by commands and layers
//
// The history and layer code never owns the document. It only talks to it
// through the DocumentTree capability trait, so any concrete tree (a DOM
// binding, a retained scene, the in-memory ArenaTree below) can be plugged in.

pub mod arena;

pub use arena::ArenaTree;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to a node of the document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors raised by structural tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("Node {0} does not exist")]
    NodeNotFound(NodeId),

    #[error("Cannot insert {node} under its own descendant {parent}")]
    Cycle { node: NodeId, parent: NodeId },
}

pub type TreeResult<T> = Result<T, TreeError>;

/// Element kinds the editor distinguishes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Svg,
    Group,
    Title,
    Filter,
    Defs,
    Anchor,
    Circle,
    Ellipse,
    ForeignObject,
    Image,
    Line,
    Path,
    Polygon,
    Polyline,
    Rect,
    Text,
    Tspan,
    Use,
    Other(String),
}

impl NodeKind {
    /// Map an SVG tag name to a node kind
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "svg" => NodeKind::Svg,
            "g" => NodeKind::Group,
            "title" => NodeKind::Title,
            "filter" => NodeKind::Filter,
            "defs" => NodeKind::Defs,
            "a" => NodeKind::Anchor,
            "circle" => NodeKind::Circle,
            "ellipse" => NodeKind::Ellipse,
            "foreignObject" => NodeKind::ForeignObject,
            "image" => NodeKind::Image,
            "line" => NodeKind::Line,
            "path" => NodeKind::Path,
            "polygon" => NodeKind::Polygon,
            "polyline" => NodeKind::Polyline,
            "rect" => NodeKind::Rect,
            "text" => NodeKind::Text,
            "tspan" => NodeKind::Tspan,
            "use" => NodeKind::Use,
            other => NodeKind::Other(other.to_string()),
        }
    }

    pub fn tag_name(&self) -> &str {
        match self {
            NodeKind::Svg => "svg",
            NodeKind::Group => "g",
            NodeKind::Title => "title",
            NodeKind::Filter => "filter",
            NodeKind::Defs => "defs",
            NodeKind::Anchor => "a",
            NodeKind::Circle => "circle",
            NodeKind::Ellipse => "ellipse",
            NodeKind::ForeignObject => "foreignObject",
            NodeKind::Image => "image",
            NodeKind::Line => "line",
            NodeKind::Path => "path",
            NodeKind::Polygon => "polygon",
            NodeKind::Polyline => "polyline",
            NodeKind::Rect => "rect",
            NodeKind::Text => "text",
            NodeKind::Tspan => "tspan",
            NodeKind::Use => "use",
            NodeKind::Other(tag) => tag,
        }
    }

    /// Whether content of this kind is drawn, and so must live inside a layer
    pub fn is_visible(&self) -> bool {
        matches!(
            self,
            NodeKind::Anchor
                | NodeKind::Circle
                | NodeKind::Ellipse
                | NodeKind::ForeignObject
                | NodeKind::Group
                | NodeKind::Image
                | NodeKind::Line
                | NodeKind::Path
                | NodeKind::Polygon
                | NodeKind::Polyline
                | NodeKind::Rect
                | NodeKind::Svg
                | NodeKind::Text
                | NodeKind::Tspan
                | NodeKind::Use
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag_name())
    }
}

/// Capabilities the history and layer engine need from a document tree
///
/// Reads on an unknown node return `None`/empty values. Structural
/// mutations report unknown nodes through [`TreeError`].
pub trait DocumentTree {
    fn contains(&self, node: NodeId) -> bool;

    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> TreeResult<()>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> TreeResult<()>;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Ordered children of `node`
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Insert `node` into `parent` before `reference`
    ///
    /// The node is detached from its current parent first. A `None`
    /// reference, or one that is not a child of `parent`, appends.
    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> TreeResult<()>;

    /// Remove `node` from its parent. The node itself stays valid.
    fn detach(&mut self, node: NodeId) -> TreeResult<()>;

    fn text_content(&self, node: NodeId) -> String;

    fn set_text_content(&mut self, node: NodeId, text: &str) -> TreeResult<()>;

    /// Create a new, detached element
    fn create_element(&mut self, kind: NodeKind) -> NodeId;

    /// Copy `node` (and its subtree if `deep`) into a new detached node
    fn clone_node(&mut self, node: NodeId, deep: bool) -> TreeResult<NodeId>;

    fn append_child(&mut self, parent: NodeId, node: NodeId) -> TreeResult<()> {
        self.insert_before(parent, node, None)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let index = siblings.iter().position(|n| *n == node)?;
        siblings.get(index + 1).copied()
    }

    fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(node)?);
        let index = siblings.iter().position(|n| *n == node)?;
        index.checked_sub(1).map(|i| siblings[i])
    }

    fn first_child_of_kind(&self, node: NodeId, kind: &NodeKind) -> Option<NodeId> {
        self.children(node)
            .into_iter()
            .find(|child| self.kind(*child).as_ref() == Some(kind))
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> TreeResult<()> {
        match self.attribute(node, "class") {
            Some(classes) if classes.split_whitespace().any(|c| c == class) => Ok(()),
            Some(classes) if !classes.trim().is_empty() => {
                self.set_attribute(node, "class", &format!("{} {}", classes.trim(), class))
            }
            _ => self.set_attribute(node, "class", class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_for_known_kinds() {
        for tag in ["g", "title", "rect", "foreignObject", "use", "svg"] {
            assert_eq!(NodeKind::from_tag(tag).tag_name(), tag);
        }
        assert_eq!(NodeKind::from_tag("marker"), NodeKind::Other("marker".into()));
    }

    #[test]
    fn test_visible_kinds() {
        assert!(NodeKind::Rect.is_visible());
        assert!(NodeKind::Group.is_visible());
        assert!(!NodeKind::Title.is_visible());
        assert!(!NodeKind::Defs.is_visible());
        assert!(!NodeKind::Other("marker".into()).is_visible());
    }

    #[test]
    fn test_class_helpers() {
        let mut tree = ArenaTree::new();
        let g = tree.create_element(NodeKind::Group);

        assert!(!tree.has_class(g, "layer"));
        tree.add_class(g, "layer").unwrap();
        tree.add_class(g, "layer").unwrap();
        assert_eq!(tree.attribute(g, "class").as_deref(), Some("layer"));

        tree.add_class(g, "locked").unwrap();
        assert_eq!(tree.attribute(g, "class").as_deref(), Some("layer locked"));
        assert!(tree.has_class(g, "locked"));
    }

    #[test]
    fn test_sibling_navigation() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let a = tree.create_element(NodeKind::Rect);
        let b = tree.create_element(NodeKind::Circle);
        tree.append_child(root, a).unwrap();
        tree.append_child(root, b).unwrap();

        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.next_sibling(b), None);
        assert_eq!(tree.previous_sibling(b), Some(a));
        assert_eq!(tree.previous_sibling(a), None);
    }
}
