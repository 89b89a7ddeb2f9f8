// CommandSink - where a freshly built command goes

use crate::command::batch::BatchCommand;
use crate::command::commands::Command;
use crate::command::manager::UndoManager;

/// Destination of a command produced by a mutating layer operation
///
/// Exactly one route is taken: nest into a caller-owned batch, push onto
/// the history, or drop the command (the mutation itself stays).
#[derive(Debug)]
pub enum CommandSink<'a> {
    History(&'a mut UndoManager),
    Parent(&'a mut BatchCommand),
    Discard,
}

impl CommandSink<'_> {
    pub fn submit(self, command: impl Into<Command>) {
        match self {
            CommandSink::History(manager) => manager.add_command_to_history(command),
            CommandSink::Parent(batch) => batch.add_sub_command(command),
            CommandSink::Discard => {}
        }
    }
}

impl<'a> From<&'a mut UndoManager> for CommandSink<'a> {
    fn from(manager: &'a mut UndoManager) -> Self {
        CommandSink::History(manager)
    }
}

impl<'a> From<&'a mut BatchCommand> for CommandSink<'a> {
    fn from(batch: &'a mut BatchCommand) -> Self {
        CommandSink::Parent(batch)
    }
}
