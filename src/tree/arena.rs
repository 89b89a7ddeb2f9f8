// ArenaTree - in-memory document tree
//
// Nodes live in a map keyed by NodeId and are never freed: a node removed
// from the hierarchy stays addressable so that history can put it back.

use crate::tree::{DocumentTree, NodeId, NodeKind, TreeError, TreeResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct NodeData {
    kind: NodeKind,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    children: Vec<NodeId>,
    #[serde(default)]
    parent: Option<NodeId>,
    #[serde(default)]
    text: String,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            text: String::new(),
        }
    }
}

/// Arena-backed implementation of [`DocumentTree`]
///
/// The root is an `svg` element created with the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaTree {
    root: NodeId,
    next_id: u64,
    nodes: BTreeMap<NodeId, NodeData>,
}

impl ArenaTree {
    /// Create a tree holding only an `svg` root
    pub fn new() -> Self {
        let root = NodeId(1);
        let mut nodes = BTreeMap::new();
        nodes.insert(root, NodeData::new(NodeKind::Svg));

        Self {
            root,
            next_id: 2,
            nodes,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `node` is reachable from the root
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Create an element and append it to `parent`
    pub fn append_new(&mut self, parent: NodeId, kind: NodeKind) -> TreeResult<NodeId> {
        let node = self.create_element(kind);
        self.append_child(parent, node)?;
        Ok(node)
    }

    fn node(&self, node: NodeId) -> TreeResult<&NodeData> {
        self.nodes.get(&node).ok_or(TreeError::NodeNotFound(node))
    }

    fn node_mut(&mut self, node: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(&node).ok_or(TreeError::NodeNotFound(node))
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }
}

impl Default for ArenaTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree for ArenaTree {
    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(&node)?.attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> TreeResult<()> {
        self.node_mut(node)?
            .attributes
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> TreeResult<()> {
        self.node_mut(node)?.attributes.remove(name);
        Ok(())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> TreeResult<()> {
        self.node(parent)?;
        self.node(node)?;
        if self.is_ancestor_or_self(node, parent) {
            return Err(TreeError::Cycle { node, parent });
        }

        self.detach(node)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, node);

        self.node_mut(node)?.parent = Some(parent);
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> TreeResult<()> {
        let Some(parent) = self.node_mut(node)?.parent.take() else {
            return Ok(());
        };
        if let Ok(data) = self.node_mut(parent) {
            data.children.retain(|c| *c != node);
        }
        Ok(())
    }

    fn text_content(&self, node: NodeId) -> String {
        self.nodes
            .get(&node)
            .map(|n| n.text.clone())
            .unwrap_or_default()
    }

    fn set_text_content(&mut self, node: NodeId, text: &str) -> TreeResult<()> {
        self.node_mut(node)?.text = text.to_string();
        Ok(())
    }

    fn create_element(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, NodeData::new(kind));
        id
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> TreeResult<NodeId> {
        let source = self.node(node)?.clone();
        let copy = self.create_element(source.kind.clone());
        {
            let data = self.node_mut(copy)?;
            data.attributes = source.attributes;
            data.text = source.text;
        }

        if deep {
            for child in source.children {
                let child_copy = self.clone_node(child, true)?;
                self.append_child(copy, child_copy)?;
            }
        }

        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_svg_root() {
        let tree = ArenaTree::new();
        assert_eq!(tree.kind(tree.root()), Some(NodeKind::Svg));
        assert!(tree.children(tree.root()).is_empty());
        assert!(tree.is_attached(tree.root()));
    }

    #[test]
    fn test_insert_before_and_append() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let a = tree.append_new(root, NodeKind::Rect).unwrap();
        let c = tree.append_new(root, NodeKind::Path).unwrap();
        let b = tree.create_element(NodeKind::Circle);

        tree.insert_before(root, b, Some(c)).unwrap();
        assert_eq!(tree.children(root), vec![a, b, c]);
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn test_insert_with_foreign_reference_appends() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let a = tree.append_new(root, NodeKind::Rect).unwrap();
        let stray = tree.create_element(NodeKind::Rect);
        let b = tree.create_element(NodeKind::Circle);

        tree.insert_before(root, b, Some(stray)).unwrap();
        assert_eq!(tree.children(root), vec![a, b]);
    }

    #[test]
    fn test_reinsert_moves_node() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let g1 = tree.append_new(root, NodeKind::Group).unwrap();
        let g2 = tree.append_new(root, NodeKind::Group).unwrap();
        let rect = tree.append_new(g1, NodeKind::Rect).unwrap();

        tree.append_child(g2, rect).unwrap();
        assert!(tree.children(g1).is_empty());
        assert_eq!(tree.children(g2), vec![rect]);
        assert_eq!(tree.parent(rect), Some(g2));
    }

    #[test]
    fn test_detach_keeps_node_alive() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let rect = tree.append_new(root, NodeKind::Rect).unwrap();
        tree.set_attribute(rect, "fill", "red").unwrap();

        tree.detach(rect).unwrap();
        assert!(tree.children(root).is_empty());
        assert!(tree.contains(rect));
        assert!(!tree.is_attached(rect));
        assert_eq!(tree.attribute(rect, "fill").as_deref(), Some("red"));

        // Detaching twice is harmless
        tree.detach(rect).unwrap();
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let outer = tree.append_new(root, NodeKind::Group).unwrap();
        let inner = tree.append_new(outer, NodeKind::Group).unwrap();

        let result = tree.append_child(inner, outer);
        assert_eq!(
            result,
            Err(TreeError::Cycle {
                node: outer,
                parent: inner
            })
        );
        assert_eq!(tree.parent(outer), Some(root));
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut tree = ArenaTree::new();
        let ghost = NodeId(999);

        assert_eq!(
            tree.set_attribute(ghost, "x", "1"),
            Err(TreeError::NodeNotFound(ghost))
        );
        assert_eq!(tree.attribute(ghost, "x"), None);
        assert!(tree.children(ghost).is_empty());
        assert_eq!(tree.text_content(ghost), "");
    }

    #[test]
    fn test_deep_clone_copies_subtree() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let g = tree.append_new(root, NodeKind::Group).unwrap();
        tree.set_attribute(g, "data-color", "#123456").unwrap();
        let title = tree.append_new(g, NodeKind::Title).unwrap();
        tree.set_text_content(title, "Layer 1").unwrap();

        let copy = tree.clone_node(g, true).unwrap();
        assert_ne!(copy, g);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.attribute(copy, "data-color").as_deref(), Some("#123456"));

        let copied_children = tree.children(copy);
        assert_eq!(copied_children.len(), 1);
        assert_ne!(copied_children[0], title);
        assert_eq!(tree.text_content(copied_children[0]), "Layer 1");

        let shallow = tree.clone_node(g, false).unwrap();
        assert!(tree.children(shallow).is_empty());
    }
}
