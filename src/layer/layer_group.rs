// Layer - a named group element directly under the document root

use crate::command::{ChangeAttributes, ChangeText, CommandSink, RemoveElement, UndoManager};
use crate::layer::{
    DATA_COLOR, DATA_FULLCOLOR, DATA_LOCK, DISPLAY, LAYER_CLASS, OPACITY, default_layer_color,
};
use crate::tree::{DocumentTree, NodeId, NodeKind, TreeResult};

/// One named, orderable visual grouping of document content
///
/// The layer's state lives in the tree: the name in a `title` child, and
/// visibility, opacity, color, full-color and lock flags as attributes on
/// the group. `Layer` only keeps the name and the group handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    name: String,
    group: NodeId,
}

impl Layer {
    /// Wrap an existing group, e.g. one found while loading a document
    ///
    /// A group without `data-color` is given the default color for `name`
    /// unless `color` is set.
    pub fn from_group(
        tree: &mut dyn DocumentTree,
        name: &str,
        group: NodeId,
        color: Option<&str>,
    ) -> TreeResult<Self> {
        Self::init(tree, name, group, color)
    }

    /// Create a new group under `root`
    ///
    /// The group is placed right after `after` when given, otherwise it
    /// becomes the last child of `root`.
    pub fn create(
        tree: &mut dyn DocumentTree,
        name: &str,
        root: NodeId,
        after: Option<NodeId>,
        color: Option<&str>,
    ) -> TreeResult<Self> {
        let group = tree.create_element(NodeKind::Group);
        let reference = after.and_then(|node| tree.next_sibling(node));
        tree.insert_before(root, group, reference)?;
        Self::init(tree, name, group, color)
    }

    fn init(
        tree: &mut dyn DocumentTree,
        name: &str,
        group: NodeId,
        color: Option<&str>,
    ) -> TreeResult<Self> {
        let title = match tree.first_child_of_kind(group, &NodeKind::Title) {
            Some(title) => title,
            None => {
                let title = tree.create_element(NodeKind::Title);
                let first = tree.children(group).first().copied();
                tree.insert_before(group, title, first)?;
                title
            }
        };
        tree.set_text_content(title, name)?;
        tree.add_class(group, LAYER_CLASS)?;
        match color {
            Some(color) => tree.set_attribute(group, DATA_COLOR, color)?,
            None if tree.attribute(group, DATA_COLOR).is_none() => {
                tree.set_attribute(group, DATA_COLOR, default_layer_color(name))?
            }
            None => {}
        }

        Ok(Self::existing(name, group))
    }

    /// View of a group that is already a fully set up layer
    ///
    /// Nothing is written to the tree.
    pub(crate) fn existing(name: impl Into<String>, group: NodeId) -> Self {
        Self {
            name: name.into(),
            group,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The group element holding this layer's content
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// The `title` child carrying the layer name
    pub fn title_element(&self, tree: &dyn DocumentTree) -> Option<NodeId> {
        tree.first_child_of_kind(self.group, &NodeKind::Title)
    }

    pub fn is_visible(&self, tree: &dyn DocumentTree) -> bool {
        tree.attribute(self.group, DISPLAY).as_deref() != Some("none")
    }

    /// Show or hide the layer
    ///
    /// Returns `Ok(false)` without touching the tree when the layer is
    /// already in the requested state.
    pub fn set_visible(
        &self,
        tree: &mut dyn DocumentTree,
        visible: bool,
        sink: CommandSink<'_>,
    ) -> TreeResult<bool> {
        let expected = if visible { "inline" } else { "none" };
        let old_display = tree.attribute(self.group, DISPLAY);
        if old_display.as_deref() == Some(expected) {
            return Ok(false);
        }

        tree.set_attribute(self.group, DISPLAY, expected)?;
        sink.submit(ChangeAttributes::new(
            tree,
            self.group,
            [(DISPLAY, old_display)],
            Some("Layer Visibility"),
        ));
        Ok(true)
    }

    /// Opacity in `[0, 1]`, 1 when unset
    pub fn opacity(&self, tree: &dyn DocumentTree) -> f64 {
        tree.attribute(self.group, OPACITY)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .unwrap_or(1.0)
    }

    /// Set the opacity; values outside `[0, 1]` (or NaN) are ignored
    pub fn set_opacity(&self, tree: &mut dyn DocumentTree, opacity: f64) -> TreeResult<bool> {
        if !(0.0..=1.0).contains(&opacity) {
            return Ok(false);
        }
        tree.set_attribute(self.group, OPACITY, &opacity.to_string())?;
        Ok(true)
    }

    pub fn color(&self, tree: &dyn DocumentTree) -> Option<String> {
        tree.attribute(self.group, DATA_COLOR)
    }

    pub fn set_color(&self, tree: &mut dyn DocumentTree, color: &str) -> TreeResult<()> {
        tree.set_attribute(self.group, DATA_COLOR, color)
    }

    pub fn full_color(&self, tree: &dyn DocumentTree) -> bool {
        tree.attribute(self.group, DATA_FULLCOLOR).as_deref() == Some("1")
    }

    pub fn set_full_color(&self, tree: &mut dyn DocumentTree, full_color: bool) -> TreeResult<()> {
        if full_color {
            tree.set_attribute(self.group, DATA_FULLCOLOR, "1")
        } else {
            tree.remove_attribute(self.group, DATA_FULLCOLOR)
        }
    }

    pub fn is_locked(&self, tree: &dyn DocumentTree) -> bool {
        tree.attribute(self.group, DATA_LOCK).as_deref() == Some("true")
    }

    pub fn set_locked(
        &self,
        tree: &mut dyn DocumentTree,
        locked: bool,
        sink: CommandSink<'_>,
    ) -> TreeResult<()> {
        let old_value = tree.attribute(self.group, DATA_LOCK);
        if locked {
            tree.set_attribute(self.group, DATA_LOCK, "true")?;
        } else {
            tree.remove_attribute(self.group, DATA_LOCK)?;
        }
        let command = ChangeAttributes::new(tree, self.group, [(DATA_LOCK, old_value)], Some("Layer Lock"));
        if !command.is_empty() {
            sink.submit(command);
        }
        Ok(())
    }

    /// Append `children` to the group, in order
    pub fn append_children(&self, tree: &mut dyn DocumentTree, children: &[NodeId]) -> TreeResult<()> {
        for child in children {
            tree.append_child(self.group, *child)?;
        }
        Ok(())
    }

    /// Rename the layer, recording the change in `history`
    ///
    /// Returns `Ok(None)` when the group has no title element.
    pub fn set_name(
        &mut self,
        tree: &mut dyn DocumentTree,
        new_name: &str,
        history: &mut UndoManager,
    ) -> TreeResult<Option<String>> {
        let Some(title) = self.title_element(tree) else {
            return Ok(None);
        };

        let old_name = tree.text_content(title);
        tree.set_text_content(title, new_name)?;
        history.add_command_to_history(ChangeText::new(tree, title, old_name, new_name));

        self.name = new_name.to_string();
        Ok(Some(self.name.clone()))
    }

    /// Detach the group from the tree
    ///
    /// The removal is routed to `sink` when the group was attached.
    pub fn remove_group(&self, tree: &mut dyn DocumentTree, sink: CommandSink<'_>) -> TreeResult<NodeId> {
        let parent = tree.parent(self.group);
        let next_sibling = tree.next_sibling(self.group);
        tree.detach(self.group)?;

        if let Some(parent) = parent {
            sink.submit(RemoveElement::new(tree, self.group, next_sibling, parent, None));
        }
        Ok(self.group)
    }
}
