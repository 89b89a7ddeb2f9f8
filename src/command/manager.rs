// UndoManager - linear command history with an undo/redo pointer

use crate::command::batch::BatchCommand;
use crate::command::commands::{ChangeAttributes, Command};
use crate::command::trait_def::{
    CommandResult, HistoryEvent, HistoryEventHandler, NoopHandler, UnsavedChanges,
};
use crate::tree::{DocumentTree, NodeId};
use std::fmt;

/// Snapshot taken by `begin_undoable_change`
#[derive(Debug)]
struct PendingChange {
    attribute: String,
    nodes: Vec<NodeId>,
    old_values: Vec<Option<String>>,
}

/// Manages the document's undo/redo history
///
/// The history is a single stack with a pointer:
/// - `stack[..pointer]` are applied and can be undone
/// - `stack[pointer..]` were undone and can be redone
///
/// Adding a command while redoable entries exist drops them for good;
/// there is no branching history.
pub struct UndoManager {
    stack: Vec<Command>,
    pointer: usize,

    /// Open begin/finish snapshots, matched by call order only
    pending_changes: Vec<PendingChange>,

    /// Oldest entries are evicted past this size. `None` keeps everything.
    max_history: Option<usize>,

    /// Stack index of the command that must never dirty the document
    bootstrap_index: Option<usize>,

    status: Option<Box<dyn UnsavedChanges>>,
}

impl UndoManager {
    /// Create a manager with unlimited history and no dirty-flag receiver
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            pointer: 0,
            pending_changes: Vec::new(),
            max_history: None,
            bootstrap_index: None,
            status: None,
        }
    }

    /// Create a manager keeping at most `max_history` commands
    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            max_history: Some(max_history.max(1)),
            ..Self::new()
        }
    }

    /// Attach the receiver of the "has unsaved changes" signal
    pub fn with_status(mut self, status: impl UnsavedChanges + 'static) -> Self {
        self.status = Some(Box::new(status));
        self
    }

    /// Record a command whose mutation has already been performed
    pub fn add_command_to_history(&mut self, command: impl Into<Command>) {
        self.push(command.into());
        self.mark_dirty();
    }

    /// Record the document's initial command without dirtying the document
    ///
    /// Undoing or redoing that command later does not dirty it either.
    pub fn add_bootstrap_command(&mut self, command: impl Into<Command>) {
        self.push(command.into());
        self.bootstrap_index = self.pointer.checked_sub(1);
    }

    fn push(&mut self, command: Command) {
        if self.pointer < self.stack.len() {
            log::debug!(
                "Discarding {} redoable command(s)",
                self.stack.len() - self.pointer
            );
            self.stack.truncate(self.pointer);
            if self.bootstrap_index.is_some_and(|i| i >= self.pointer) {
                self.bootstrap_index = None;
            }
        }

        log::debug!("Adding '{}' to history", command.label());
        self.stack.push(command);
        self.pointer = self.stack.len();

        if let Some(max) = self.max_history {
            if self.stack.len() > max {
                let evicted = self.stack.len() - max;
                self.stack.drain(..evicted);
                self.pointer -= evicted;
                self.bootstrap_index = self
                    .bootstrap_index
                    .and_then(|i| i.checked_sub(evicted));
            }
        }
    }

    fn mark_dirty(&self) {
        if let Some(status) = &self.status {
            status.set_has_unsaved_changes(true);
        }
    }

    fn mark_dirty_unless_bootstrap(&self, index: usize) {
        if self.bootstrap_index != Some(index) {
            self.mark_dirty();
        }
    }

    /// Undo the most recent applied command
    ///
    /// Returns `Ok(false)` when there is nothing to undo. The pointer moves
    /// even if the command reports an error.
    pub fn undo(&mut self, tree: &mut dyn DocumentTree) -> CommandResult<bool> {
        self.undo_with_handler(tree, &mut NoopHandler)
    }

    pub fn undo_with_handler(
        &mut self,
        tree: &mut dyn DocumentTree,
        handler: &mut dyn HistoryEventHandler,
    ) -> CommandResult<bool> {
        if self.pointer == 0 {
            return Ok(false);
        }

        self.pointer -= 1;
        let index = self.pointer;
        let command = &mut self.stack[index];
        log::debug!("Undo '{}'", command.label());

        handler.handle_history_event(HistoryEvent::BeforeUnapply, command, tree);
        let result = command.unapply(tree);
        handler.handle_history_event(HistoryEvent::AfterUnapply, command, tree);

        self.mark_dirty_unless_bootstrap(index);
        result.map(|()| true)
    }

    /// Redo the next undone command
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, tree: &mut dyn DocumentTree) -> CommandResult<bool> {
        self.redo_with_handler(tree, &mut NoopHandler)
    }

    pub fn redo_with_handler(
        &mut self,
        tree: &mut dyn DocumentTree,
        handler: &mut dyn HistoryEventHandler,
    ) -> CommandResult<bool> {
        if self.pointer == self.stack.len() {
            return Ok(false);
        }

        let index = self.pointer;
        let command = &mut self.stack[index];
        log::debug!("Redo '{}'", command.label());

        handler.handle_history_event(HistoryEvent::BeforeApply, command, tree);
        let result = command.apply(tree);
        handler.handle_history_event(HistoryEvent::AfterApply, command, tree);

        self.pointer += 1;
        self.mark_dirty_unless_bootstrap(index);
        result.map(|()| true)
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer < self.stack.len()
    }

    pub fn undo_stack_size(&self) -> usize {
        self.pointer
    }

    pub fn redo_stack_size(&self) -> usize {
        self.stack.len() - self.pointer
    }

    /// Label of the command `undo` would revert
    pub fn next_undo_command_text(&self) -> Option<&str> {
        self.pointer
            .checked_sub(1)
            .map(|i| self.stack[i].label())
    }

    /// Label of the command `redo` would re-apply
    pub fn next_redo_command_text(&self) -> Option<&str> {
        self.stack.get(self.pointer).map(Command::label)
    }

    /// Drop all history, including open undoable-change snapshots
    pub fn reset_undo_stack(&mut self) {
        self.stack.clear();
        self.pointer = 0;
        self.pending_changes.clear();
        self.bootstrap_index = None;
    }

    /// Snapshot `attribute` on every node before a multi-node edit
    ///
    /// Snapshots nest as a stack. `finish_undoable_change` always closes the
    /// most recent one, whatever attribute it was opened for.
    pub fn begin_undoable_change(
        &mut self,
        tree: &dyn DocumentTree,
        attribute: &str,
        nodes: &[NodeId],
    ) {
        let old_values = nodes
            .iter()
            .map(|node| tree.attribute(*node, attribute))
            .collect();

        self.pending_changes.push(PendingChange {
            attribute: attribute.to_string(),
            nodes: nodes.to_vec(),
            old_values,
        });
    }

    /// Close the most recent snapshot and diff it against the tree
    ///
    /// The batch holds one attribute change per node whose value differs;
    /// it is empty when nothing changed or when no snapshot was open.
    pub fn finish_undoable_change(&mut self, tree: &dyn DocumentTree) -> BatchCommand {
        let Some(change) = self.pending_changes.pop() else {
            log::warn!("finish_undoable_change called without a matching begin");
            return BatchCommand::new("Change");
        };

        let mut batch = BatchCommand::new(format!("Change {}", change.attribute));
        for (node, old) in change.nodes.into_iter().zip(change.old_values) {
            let command = ChangeAttributes::new(
                tree,
                node,
                [(change.attribute.as_str(), old)],
                Some(change.attribute.as_str()),
            );
            if !command.is_empty() {
                batch.add_sub_command(command);
            }
        }
        batch
    }

    /// Number of begin snapshots still waiting for their finish
    pub fn open_change_count(&self) -> usize {
        self.pending_changes.len()
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UndoManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UndoManager")
            .field("stack", &self.stack)
            .field("pointer", &self.pointer)
            .field("pending_changes", &self.pending_changes)
            .field("max_history", &self.max_history)
            .field("bootstrap_index", &self.bootstrap_index)
            .finish_non_exhaustive()
    }
}
