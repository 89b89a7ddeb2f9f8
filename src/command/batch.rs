// BatchCommand - ordered composite of commands applied as one unit

use crate::command::commands::Command;
use crate::command::trait_def::CommandResult;
use crate::tree::{DocumentTree, NodeId};

/// Ordered list of sub-commands
///
/// `apply` walks the list forward and `unapply` backward. An empty batch is
/// a legitimate value: callers check [`BatchCommand::is_empty`] before
/// committing it to history.
#[derive(Debug)]
pub struct BatchCommand {
    label: String,
    commands: Vec<Command>,
}

impl BatchCommand {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            commands: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn add_sub_command(&mut self, command: impl Into<Command>) {
        self.commands.push(command.into());
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn sub_commands(&self) -> &[Command] {
        &self.commands
    }

    /// Apply every sub-command in order
    ///
    /// A failing sub-command does not stop the walk; the first error is
    /// reported once every sub-command has had its turn.
    pub fn apply(&mut self, tree: &mut dyn DocumentTree) -> CommandResult<()> {
        let mut first_error = None;
        for command in self.commands.iter_mut() {
            if let Err(err) = command.apply(tree) {
                log::warn!("'{}' failed inside batch '{}': {}", command.label(), self.label, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Unapply every sub-command in reverse order
    pub fn unapply(&mut self, tree: &mut dyn DocumentTree) -> CommandResult<()> {
        let mut first_error = None;
        for command in self.commands.iter_mut().rev() {
            if let Err(err) = command.unapply(tree) {
                log::warn!("'{}' failed inside batch '{}': {}", command.label(), self.label, err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Distinct nodes touched by any sub-command, in first-seen order
    pub fn affected_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for node in self.commands.iter().flat_map(Command::affected_nodes) {
            if !nodes.contains(&node) {
                nodes.push(node);
            }
        }
        nodes
    }

    /// Nodes created by nested insertion commands
    pub fn inserted_nodes(&self) -> Vec<NodeId> {
        self.commands.iter().flat_map(Command::inserted_nodes).collect()
    }
}
