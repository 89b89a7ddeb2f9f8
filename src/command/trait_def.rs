// Shared contracts of the command module: errors, history events and the
// "document dirty" collaborator

use crate::command::commands::Command;
use crate::tree::{DocumentTree, TreeError};

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;

/// Errors that can occur while applying or unapplying a command
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    /// Invalid state for this operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A custom command's side effect failed
    #[error("Side effect failed: {0}")]
    SideEffect(String),

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Points in an undo/redo step at which a [`HistoryEventHandler`] is notified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEvent {
    BeforeApply,
    AfterApply,
    BeforeUnapply,
    AfterUnapply,
}

impl HistoryEvent {
    pub fn is_after(self) -> bool {
        matches!(self, HistoryEvent::AfterApply | HistoryEvent::AfterUnapply)
    }
}

/// Observer of undo/redo steps
///
/// The handler gets the tree back so it can resynchronize derived state
/// (layer lists, selection) with what the command just did.
pub trait HistoryEventHandler {
    fn handle_history_event(
        &mut self,
        event: HistoryEvent,
        command: &Command,
        tree: &mut dyn DocumentTree,
    );
}

/// Handler that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandler;

impl HistoryEventHandler for NoopHandler {
    fn handle_history_event(&mut self, _: HistoryEvent, _: &Command, _: &mut dyn DocumentTree) {}
}

/// Receiver of the "document has unsaved changes" signal
pub trait UnsavedChanges {
    fn set_has_unsaved_changes(&self, dirty: bool);
}
