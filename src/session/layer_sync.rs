// LayerSync - keeps the layer list in step with undo/redo

use crate::command::{Command, HistoryEvent, HistoryEventHandler};
use crate::layer::LayerManager;
use crate::tree::{DocumentTree, NodeId, NodeKind};

/// History handler that re-indexes layers after structural undo/redo steps
///
/// A rescan happens when the command inserted, removed or moved a direct
/// child of the root, renamed a layer title, or is a batch containing such
/// a command. Rescans only read the tree, so redoing a step always finds
/// the document exactly as the step left it. The current layer is kept
/// when its group is still a layer.
pub struct LayerSync<'a> {
    layers: &'a mut LayerManager,
    rescans: usize,
}

impl<'a> LayerSync<'a> {
    pub fn new(layers: &'a mut LayerManager) -> Self {
        Self { layers, rescans: 0 }
    }

    /// Number of rescans performed so far
    pub fn rescans(&self) -> usize {
        self.rescans
    }
}

impl HistoryEventHandler for LayerSync<'_> {
    fn handle_history_event(
        &mut self,
        event: HistoryEvent,
        command: &Command,
        tree: &mut dyn DocumentTree,
    ) {
        if !event.is_after() || !touches_layers(command, self.layers.root(), tree) {
            return;
        }

        self.layers.sync_layers(tree);
        self.rescans += 1;
        log::debug!(
            "Layers rescanned after '{}': {} layer(s)",
            command.label(),
            self.layers.num_layers()
        );
    }
}

/// Whether undoing or redoing `command` can change the set of layers
pub fn touches_layers(command: &Command, root: NodeId, tree: &dyn DocumentTree) -> bool {
    match command {
        Command::Insert(cmd) => cmd.parent() == root,
        Command::Remove(cmd) => cmd.parent() == root,
        Command::Move(cmd) => cmd.old_parent() == root || cmd.new_parent() == root,
        Command::ChangeText(cmd) => {
            tree.kind(cmd.node()) == Some(NodeKind::Title)
                && tree
                    .parent(cmd.node())
                    .and_then(|group| tree.parent(group))
                    == Some(root)
        }
        Command::Batch(batch) => batch
            .sub_commands()
            .iter()
            .any(|sub| touches_layers(sub, root, tree)),
        Command::ChangeAttributes(_) | Command::Custom(_) => false,
    }
}
