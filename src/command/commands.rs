// Concrete command variants
//
// Every command records enough of the tree to move it between exactly two
// states: `apply` lands on the post-edit state, `unapply` on the pre-edit one.
// Commands are built after the caller has already performed the mutation.

use crate::command::batch::BatchCommand;
use crate::command::trait_def::{CommandError, CommandResult};
use crate::tree::{DocumentTree, NodeId};
use std::collections::BTreeMap;
use std::fmt;

/// One atomic, reversible mutation of the document tree
#[derive(Debug)]
pub enum Command {
    ChangeAttributes(ChangeAttributes),
    Insert(InsertElement),
    Remove(RemoveElement),
    Move(MoveElement),
    ChangeText(ChangeText),
    Custom(CustomCommand),
    Batch(BatchCommand),
}

impl Command {
    /// Human-readable description, used for "Undo <label>" menu entries
    pub fn label(&self) -> &str {
        match self {
            Command::ChangeAttributes(cmd) => &cmd.label,
            Command::Insert(cmd) => &cmd.label,
            Command::Remove(cmd) => &cmd.label,
            Command::Move(cmd) => &cmd.label,
            Command::ChangeText(cmd) => &cmd.label,
            Command::Custom(cmd) => &cmd.label,
            Command::Batch(cmd) => cmd.label(),
        }
    }

    /// Move the tree to the post-edit state
    ///
    /// Custom commands never fail here; their errors are logged and kept on
    /// the command instead.
    pub fn apply(&mut self, tree: &mut dyn DocumentTree) -> CommandResult<()> {
        match self {
            Command::ChangeAttributes(cmd) => write_values(tree, cmd.node, &cmd.new_values),
            Command::Insert(cmd) => {
                tree.insert_before(cmd.parent, cmd.node, cmd.next_sibling)?;
                Ok(())
            }
            Command::Remove(cmd) => {
                if let Some(parent) = tree.parent(cmd.node) {
                    cmd.parent = parent;
                }
                tree.detach(cmd.node)?;
                Ok(())
            }
            Command::Move(cmd) => {
                tree.insert_before(cmd.new_parent, cmd.node, cmd.new_next_sibling)?;
                Ok(())
            }
            Command::ChangeText(cmd) => {
                tree.set_text_content(cmd.node, &cmd.new_text)?;
                Ok(())
            }
            Command::Custom(cmd) => {
                cmd.run(tree, Direction::Apply);
                Ok(())
            }
            Command::Batch(batch) => batch.apply(tree),
        }
    }

    /// Move the tree back to the pre-edit state
    pub fn unapply(&mut self, tree: &mut dyn DocumentTree) -> CommandResult<()> {
        match self {
            Command::ChangeAttributes(cmd) => write_values(tree, cmd.node, &cmd.old_values),
            Command::Insert(cmd) => {
                if let Some(parent) = tree.parent(cmd.node) {
                    cmd.parent = parent;
                }
                tree.detach(cmd.node)?;
                Ok(())
            }
            Command::Remove(cmd) => {
                tree.insert_before(cmd.parent, cmd.node, cmd.next_sibling)?;
                Ok(())
            }
            Command::Move(cmd) => {
                tree.insert_before(cmd.old_parent, cmd.node, cmd.old_next_sibling)?;
                Ok(())
            }
            Command::ChangeText(cmd) => {
                tree.set_text_content(cmd.node, &cmd.old_text)?;
                Ok(())
            }
            Command::Custom(cmd) => {
                cmd.run(tree, Direction::Unapply);
                Ok(())
            }
            Command::Batch(batch) => batch.unapply(tree),
        }
    }

    /// Nodes touched by this command, without duplicates
    pub fn affected_nodes(&self) -> Vec<NodeId> {
        match self {
            Command::ChangeAttributes(cmd) => vec![cmd.node],
            Command::Insert(cmd) => vec![cmd.node],
            Command::Remove(cmd) => vec![cmd.node],
            Command::Move(cmd) => vec![cmd.node],
            Command::ChangeText(cmd) => vec![cmd.node],
            Command::Custom(_) => Vec::new(),
            Command::Batch(batch) => batch.affected_nodes(),
        }
    }

    /// Nodes created by insertion commands, searched recursively
    pub fn inserted_nodes(&self) -> Vec<NodeId> {
        match self {
            Command::Insert(cmd) => vec![cmd.node],
            Command::Batch(batch) => batch.inserted_nodes(),
            _ => Vec::new(),
        }
    }
}

fn write_values(
    tree: &mut dyn DocumentTree,
    node: NodeId,
    values: &BTreeMap<String, Option<String>>,
) -> CommandResult<()> {
    for (name, value) in values {
        match value.as_deref() {
            Some(value) if !value.is_empty() => tree.set_attribute(node, name, value)?,
            _ => tree.remove_attribute(node, name)?,
        }
    }
    Ok(())
}

fn tag_of(tree: &dyn DocumentTree, node: NodeId) -> String {
    tree.kind(node)
        .map(|kind| kind.tag_name().to_string())
        .unwrap_or_else(|| "element".to_string())
}

/// Change of one or more attributes on a single node
///
/// Built after the change from the attributes' previous values; the current
/// values become the "new" side. Keys whose value did not actually change
/// are dropped (absent and empty compare equal).
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeAttributes {
    node: NodeId,
    label: String,
    old_values: BTreeMap<String, Option<String>>,
    new_values: BTreeMap<String, Option<String>>,
}

impl ChangeAttributes {
    pub fn new<I, K>(tree: &dyn DocumentTree, node: NodeId, old_values: I, text: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, Option<String>)>,
        K: Into<String>,
    {
        let mut kept_old = BTreeMap::new();
        let mut new_values = BTreeMap::new();

        for (name, old) in old_values {
            let name = name.into();
            let current = tree.attribute(node, &name);
            let old_blank = old.as_deref().is_none_or(str::is_empty);
            let current_blank = current.as_deref().is_none_or(str::is_empty);

            if current == old || (old_blank && current_blank) {
                continue;
            }
            kept_old.insert(name.clone(), old);
            new_values.insert(name, current);
        }

        let label = match text {
            Some(text) => format!("Change {} {}", tag_of(tree, node), text),
            None => format!("Change {}", tag_of(tree, node)),
        };

        Self {
            node,
            label,
            old_values: kept_old,
            new_values,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Attribute names this command rewrites
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.old_values.keys().map(String::as_str)
    }

    pub fn old_value(&self, name: &str) -> Option<&str> {
        self.old_values.get(name)?.as_deref()
    }

    pub fn new_value(&self, name: &str) -> Option<&str> {
        self.new_values.get(name)?.as_deref()
    }

    /// True when no attribute actually changed
    pub fn is_empty(&self) -> bool {
        self.old_values.is_empty()
    }
}

/// A node that was added to the tree
#[derive(Debug, Clone, PartialEq)]
pub struct InsertElement {
    node: NodeId,
    parent: NodeId,
    next_sibling: Option<NodeId>,
    label: String,
}

impl InsertElement {
    /// Record the insertion of `node`, which must already be in place
    pub fn new(tree: &dyn DocumentTree, node: NodeId, text: Option<&str>) -> CommandResult<Self> {
        let parent = tree.parent(node).ok_or_else(|| {
            CommandError::InvalidState(format!("inserted node {} has no parent", node))
        })?;

        Ok(Self {
            node,
            parent,
            next_sibling: tree.next_sibling(node),
            label: text
                .map(str::to_string)
                .unwrap_or_else(|| format!("Create {}", tag_of(tree, node))),
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }
}

/// A node that was taken out of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveElement {
    node: NodeId,
    parent: NodeId,
    next_sibling: Option<NodeId>,
    label: String,
}

impl RemoveElement {
    /// Record the removal of `node` from `old_parent`, before `old_next_sibling`
    pub fn new(
        tree: &dyn DocumentTree,
        node: NodeId,
        old_next_sibling: Option<NodeId>,
        old_parent: NodeId,
        text: Option<&str>,
    ) -> Self {
        Self {
            node,
            parent: old_parent,
            next_sibling: old_next_sibling,
            label: text
                .map(str::to_string)
                .unwrap_or_else(|| format!("Delete {}", tag_of(tree, node))),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }
}

/// A node that changed parent or position among its siblings
#[derive(Debug, Clone, PartialEq)]
pub struct MoveElement {
    node: NodeId,
    old_parent: NodeId,
    old_next_sibling: Option<NodeId>,
    new_parent: NodeId,
    new_next_sibling: Option<NodeId>,
    label: String,
}

impl MoveElement {
    /// Record a move of `node` that has already happened
    pub fn new(
        tree: &dyn DocumentTree,
        node: NodeId,
        old_next_sibling: Option<NodeId>,
        old_parent: NodeId,
        text: Option<&str>,
    ) -> CommandResult<Self> {
        let new_parent = tree.parent(node).ok_or_else(|| {
            CommandError::InvalidState(format!("moved node {} has no parent", node))
        })?;
        let tag = tag_of(tree, node);

        Ok(Self {
            node,
            old_parent,
            old_next_sibling,
            new_parent,
            new_next_sibling: tree.next_sibling(node),
            label: match text {
                Some(text) => format!("Move {} to {}", tag, text),
                None => format!("Move {}", tag),
            },
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn old_parent(&self) -> NodeId {
        self.old_parent
    }

    pub fn new_parent(&self) -> NodeId {
        self.new_parent
    }
}

/// Replacement of a node's text content
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeText {
    node: NodeId,
    old_text: String,
    new_text: String,
    label: String,
}

impl ChangeText {
    pub fn new(
        tree: &dyn DocumentTree,
        node: NodeId,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> Self {
        let old_text = old_text.into();
        let new_text = new_text.into();
        let label = format!(
            "Change {} from {} to {}",
            tag_of(tree, node),
            old_text,
            new_text
        );

        Self {
            node,
            old_text,
            new_text,
            label,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn old_text(&self) -> &str {
        &self.old_text
    }

    pub fn new_text(&self) -> &str {
        &self.new_text
    }
}

/// Side effect hook of a [`CustomCommand`]
pub type SideEffect = Box<dyn FnMut(&mut dyn DocumentTree) -> CommandResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Apply,
    Unapply,
}

/// Command wrapping two opaque callables
///
/// A failure in either callable is logged and stored, never propagated, so
/// a broken side effect cannot derail the history pointer or a batch.
pub struct CustomCommand {
    label: String,
    on_apply: SideEffect,
    on_unapply: SideEffect,
    last_error: Option<CommandError>,
}

impl CustomCommand {
    pub fn new<A, U>(label: impl Into<String>, on_apply: A, on_unapply: U) -> Self
    where
        A: FnMut(&mut dyn DocumentTree) -> CommandResult<()> + 'static,
        U: FnMut(&mut dyn DocumentTree) -> CommandResult<()> + 'static,
    {
        Self {
            label: label.into(),
            on_apply: Box::new(on_apply),
            on_unapply: Box::new(on_unapply),
            last_error: None,
        }
    }

    /// Error raised by the most recent apply/unapply, if it failed
    pub fn last_error(&self) -> Option<&CommandError> {
        self.last_error.as_ref()
    }

    fn run(&mut self, tree: &mut dyn DocumentTree, direction: Direction) {
        let result = match direction {
            Direction::Apply => (self.on_apply)(tree),
            Direction::Unapply => (self.on_unapply)(tree),
        };

        match result {
            Ok(()) => self.last_error = None,
            Err(err) => {
                log::error!("{:?} of custom command '{}' failed: {}", direction, self.label, err);
                self.last_error = Some(err);
            }
        }
    }
}

impl fmt::Debug for CustomCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCommand")
            .field("label", &self.label)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

impl From<ChangeAttributes> for Command {
    fn from(cmd: ChangeAttributes) -> Self {
        Command::ChangeAttributes(cmd)
    }
}

impl From<InsertElement> for Command {
    fn from(cmd: InsertElement) -> Self {
        Command::Insert(cmd)
    }
}

impl From<RemoveElement> for Command {
    fn from(cmd: RemoveElement) -> Self {
        Command::Remove(cmd)
    }
}

impl From<MoveElement> for Command {
    fn from(cmd: MoveElement) -> Self {
        Command::Move(cmd)
    }
}

impl From<ChangeText> for Command {
    fn from(cmd: ChangeText) -> Self {
        Command::ChangeText(cmd)
    }
}

impl From<CustomCommand> for Command {
    fn from(cmd: CustomCommand) -> Self {
        Command::Custom(cmd)
    }
}

impl From<BatchCommand> for Command {
    fn from(cmd: BatchCommand) -> Self {
        Command::Batch(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{ArenaTree, NodeKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tree_with_rect() -> (ArenaTree, NodeId) {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let rect = tree.append_new(root, NodeKind::Rect).unwrap();
        (tree, rect)
    }

    #[test]
    fn test_change_attributes_round_trip() {
        let (mut tree, rect) = tree_with_rect();
        tree.set_attribute(rect, "fill", "red").unwrap();

        // Mutate, then record the previous values
        tree.set_attribute(rect, "fill", "blue").unwrap();
        tree.set_attribute(rect, "stroke", "black").unwrap();
        let mut cmd: Command = ChangeAttributes::new(
            &tree,
            rect,
            [("fill", Some("red".to_string())), ("stroke", None)],
            None,
        )
        .into();

        cmd.unapply(&mut tree).unwrap();
        assert_eq!(tree.attribute(rect, "fill").as_deref(), Some("red"));
        assert_eq!(tree.attribute(rect, "stroke"), None);

        cmd.apply(&mut tree).unwrap();
        assert_eq!(tree.attribute(rect, "fill").as_deref(), Some("blue"));
        assert_eq!(tree.attribute(rect, "stroke").as_deref(), Some("black"));

        cmd.unapply(&mut tree).unwrap();
        assert_eq!(tree.attribute(rect, "fill").as_deref(), Some("red"));
    }

    #[test]
    fn test_change_attributes_drops_unchanged_keys() {
        let (mut tree, rect) = tree_with_rect();
        tree.set_attribute(rect, "fill", "red").unwrap();
        tree.set_attribute(rect, "opacity", "").unwrap();

        let cmd = ChangeAttributes::new(
            &tree,
            rect,
            [
                ("fill", Some("red".to_string())),
                ("opacity", None),
                ("stroke", Some(String::new())),
            ],
            Some("style"),
        );

        assert!(cmd.is_empty());
        assert_eq!(cmd.attribute_names().count(), 0);
        assert_eq!(Command::from(cmd).label(), "Change rect style");
    }

    #[test]
    fn test_change_attributes_values() {
        let (mut tree, rect) = tree_with_rect();
        tree.set_attribute(rect, "x", "10").unwrap();

        let cmd = ChangeAttributes::new(&tree, rect, [("x", Some("5".to_string()))], None);
        assert_eq!(cmd.old_value("x"), Some("5"));
        assert_eq!(cmd.new_value("x"), Some("10"));
        assert_eq!(cmd.node(), rect);
    }

    #[test]
    fn test_insert_round_trip() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let first = tree.append_new(root, NodeKind::Rect).unwrap();
        let last = tree.append_new(root, NodeKind::Rect).unwrap();
        let circle = tree.create_element(NodeKind::Circle);
        tree.insert_before(root, circle, Some(last)).unwrap();

        let mut cmd: Command = InsertElement::new(&tree, circle, None).unwrap().into();
        assert_eq!(cmd.label(), "Create circle");

        cmd.unapply(&mut tree).unwrap();
        assert_eq!(tree.children(root), vec![first, last]);

        cmd.apply(&mut tree).unwrap();
        assert_eq!(tree.children(root), vec![first, circle, last]);
        assert_eq!(cmd.inserted_nodes(), vec![circle]);
    }

    #[test]
    fn test_insert_requires_parent() {
        let mut tree = ArenaTree::new();
        let loose = tree.create_element(NodeKind::Rect);

        assert!(matches!(
            InsertElement::new(&tree, loose, None),
            Err(CommandError::InvalidState(_))
        ));
    }

    #[test]
    fn test_remove_round_trip() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let a = tree.append_new(root, NodeKind::Rect).unwrap();
        let b = tree.append_new(root, NodeKind::Circle).unwrap();
        let c = tree.append_new(root, NodeKind::Path).unwrap();

        tree.detach(b).unwrap();
        let mut cmd: Command = RemoveElement::new(&tree, b, Some(c), root, None).into();
        assert_eq!(cmd.label(), "Delete circle");

        cmd.unapply(&mut tree).unwrap();
        assert_eq!(tree.children(root), vec![a, b, c]);

        cmd.apply(&mut tree).unwrap();
        assert_eq!(tree.children(root), vec![a, c]);
        assert!(cmd.inserted_nodes().is_empty());
    }

    #[test]
    fn test_move_round_trip() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let g1 = tree.append_new(root, NodeKind::Group).unwrap();
        let g2 = tree.append_new(root, NodeKind::Group).unwrap();
        let a = tree.append_new(g1, NodeKind::Rect).unwrap();
        let b = tree.append_new(g1, NodeKind::Rect).unwrap();
        let existing = tree.append_new(g2, NodeKind::Path).unwrap();

        let old_next = tree.next_sibling(a);
        tree.append_child(g2, a).unwrap();
        let mut cmd: Command = MoveElement::new(&tree, a, old_next, g1, Some("Layer 2"))
            .unwrap()
            .into();
        assert_eq!(cmd.label(), "Move rect to Layer 2");

        cmd.unapply(&mut tree).unwrap();
        assert_eq!(tree.children(g1), vec![a, b]);
        assert_eq!(tree.children(g2), vec![existing]);

        cmd.apply(&mut tree).unwrap();
        assert_eq!(tree.children(g1), vec![b]);
        assert_eq!(tree.children(g2), vec![existing, a]);
    }

    #[test]
    fn test_change_text_round_trip() {
        let mut tree = ArenaTree::new();
        let root = tree.root();
        let title = tree.append_new(root, NodeKind::Title).unwrap();
        tree.set_text_content(title, "After").unwrap();

        let mut cmd: Command = ChangeText::new(&tree, title, "Before", "After").into();
        assert_eq!(cmd.label(), "Change title from Before to After");

        cmd.unapply(&mut tree).unwrap();
        assert_eq!(tree.text_content(title), "Before");
        cmd.apply(&mut tree).unwrap();
        assert_eq!(tree.text_content(title), "After");
    }

    #[test]
    fn test_custom_command_runs_callables() {
        let mut tree = ArenaTree::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let up = counter.clone();
        let down = counter.clone();

        let mut cmd: Command = CustomCommand::new(
            "Counter",
            move |_| {
                up.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            move |_| {
                down.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .into();

        cmd.apply(&mut tree).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        cmd.unapply(&mut tree).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(cmd.affected_nodes().is_empty());
    }

    #[test]
    fn test_custom_command_failure_is_swallowed() {
        let mut tree = ArenaTree::new();
        let mut cmd = CustomCommand::new(
            "Broken",
            |_| Err(CommandError::SideEffect("device offline".into())),
            |_| Ok(()),
        );

        let mut wrapped = Command::Custom(cmd);
        assert!(wrapped.apply(&mut tree).is_ok());
        let Command::Custom(inner) = wrapped else {
            unreachable!()
        };
        cmd = inner;
        assert_eq!(
            cmd.last_error(),
            Some(&CommandError::SideEffect("device offline".into()))
        );

        let mut wrapped = Command::Custom(cmd);
        wrapped.unapply(&mut tree).unwrap();
        let Command::Custom(inner) = wrapped else {
            unreachable!()
        };
        assert!(inner.last_error().is_none());
    }
}
