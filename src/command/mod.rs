// Command Pattern for Undo/Redo functionality
//
// This module implements the reversible edit log of a document.
// Every mutation of the document tree that should be undoable is described
// by a Command, pushed into the UndoManager once the mutation is done.
//
// Architecture:
// - Command: closed enum of reversible edits (attributes, insert, remove,
//   move, text, custom side effect, batch)
// - BatchCommand: ordered composite applied forward, unapplied backward
// - UndoManager: stack + pointer, begin/finish attribute snapshots
// - CommandSink: three-way routing used by layer operations
// - DocumentStatus: unsaved-changes flag set by the UndoManager

pub mod batch;
pub mod commands;
pub mod manager;
pub mod sink;
pub mod state;
pub mod trait_def;

pub use batch::BatchCommand;
pub use commands::{
    ChangeAttributes, ChangeText, Command, CustomCommand, InsertElement, MoveElement,
    RemoveElement,
};
pub use manager::UndoManager;
pub use sink::CommandSink;
pub use state::DocumentStatus;
pub use trait_def::{
    CommandError, CommandResult, HistoryEvent, HistoryEventHandler, NoopHandler, UnsavedChanges,
};
