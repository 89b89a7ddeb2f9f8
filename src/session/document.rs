// DocumentSession - one open document with its own history and layers

use crate::command::{
    BatchCommand, ChangeAttributes, Command, CommandSink, DocumentStatus, InsertElement,
    UndoManager, UnsavedChanges,
};
use crate::layer::{Layer, LayerManager};
use crate::session::config::SessionConfig;
use crate::session::error::{DocumentError, DocumentResult};
use crate::session::layer_sync::LayerSync;
use crate::tree::{ArenaTree, DocumentTree, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use uuid::Uuid;

/// Unique identifier of a document session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tree, undo history, layer list and dirty flag of one document
///
/// Sessions share nothing, so any number of documents can be open at once.
/// Edits made through `tree_mut` bypass history; call `identify_layers`
/// afterwards if they touched layer groups.
pub struct DocumentSession<T: DocumentTree = ArenaTree> {
    id: SessionId,
    config: SessionConfig,
    tree: T,
    root: NodeId,
    history: UndoManager,
    layers: LayerManager,
    status: DocumentStatus,
}

impl<T: DocumentTree> DocumentSession<T> {
    /// Open a session over `tree`
    ///
    /// An empty root gets the configured default layer, recorded as the
    /// bootstrap command so the new document is not dirty. Undoing it
    /// leaves a document without layers. Existing content is scanned for
    /// layers instead.
    pub fn with_tree(mut tree: T, root: NodeId, config: SessionConfig) -> DocumentResult<Self> {
        if !tree.contains(root) {
            return Err(DocumentError::InvalidDocument(format!(
                "root {} is not part of the tree",
                root
            )));
        }

        let status = DocumentStatus::new();
        let mut history = match config.max_history {
            Some(max) => UndoManager::with_capacity(max),
            None => UndoManager::new(),
        }
        .with_status(status.clone());
        let mut layers = LayerManager::new(root).with_base_name(config.layer_base_name.clone());

        if tree.children(root).is_empty() {
            let mut bootstrap =
                BatchCommand::new(format!("Create Layer: {}", config.default_layer_name));
            let layer = layers.create_layer(
                &mut tree,
                Some(&config.default_layer_name),
                CommandSink::Parent(&mut bootstrap),
            )?;
            if let Some(color) = &config.default_layer_color {
                layer.set_color(&mut tree, color)?;
            }
            history.add_bootstrap_command(bootstrap);
        } else {
            layers.identify_layers(&mut tree)?;
        }

        let id = SessionId::new();
        log::debug!("Opened session {} with {} layer(s)", id, layers.num_layers());

        Ok(Self {
            id,
            config,
            tree,
            root,
            history,
            layers,
            status,
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tree(&self) -> &T {
        &self.tree
    }

    /// Direct access to the tree, outside of history
    pub fn tree_mut(&mut self) -> &mut T {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn history(&self) -> &UndoManager {
        &self.history
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn status(&self) -> &DocumentStatus {
        &self.status
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.status.has_unsaved_changes()
    }

    // History

    pub fn add_command_to_history(&mut self, command: impl Into<Command>) {
        self.history.add_command_to_history(command);
    }

    /// Undo one step, re-indexing layers when the step changed them
    pub fn undo(&mut self) -> DocumentResult<bool> {
        let mut sync = LayerSync::new(&mut self.layers);
        Ok(self.history.undo_with_handler(&mut self.tree, &mut sync)?)
    }

    /// Redo one step, re-indexing layers when the step changed them
    pub fn redo(&mut self) -> DocumentResult<bool> {
        let mut sync = LayerSync::new(&mut self.layers);
        Ok(self.history.redo_with_handler(&mut self.tree, &mut sync)?)
    }

    pub fn begin_undoable_change(&mut self, attribute: &str, nodes: &[NodeId]) {
        self.history
            .begin_undoable_change(&self.tree, attribute, nodes);
    }

    /// Close the last undoable change and record it unless nothing changed
    pub fn finish_undoable_change(&mut self) -> bool {
        let batch = self.history.finish_undoable_change(&self.tree);
        if batch.is_empty() {
            return false;
        }
        self.history.add_command_to_history(batch);
        true
    }

    // Content

    /// Create an element at the end of the current layer
    pub fn insert_element(&mut self, kind: NodeKind) -> DocumentResult<NodeId> {
        let group = self.layers.current_layer_element().ok_or_else(|| {
            DocumentError::InvalidDocument("document has no current layer".to_string())
        })?;

        let node = self.tree.create_element(kind);
        self.tree.append_child(group, node)?;
        let command = InsertElement::new(&self.tree, node, None)?;
        self.history.add_command_to_history(command);
        Ok(node)
    }

    /// Set one attribute as an undoable change
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DocumentResult<bool> {
        let old_value = self.tree.attribute(node, name);
        self.tree.set_attribute(node, name, value)?;

        let command = ChangeAttributes::new(&self.tree, node, [(name, old_value)], None);
        if command.is_empty() {
            return Ok(false);
        }
        self.history.add_command_to_history(command);
        Ok(true)
    }

    // Layers

    /// Rebuild the layer list after direct tree edits
    pub fn identify_layers(&mut self) -> DocumentResult<()> {
        Ok(self.layers.identify_layers(&mut self.tree)?)
    }

    /// Create a layer and make it current; returns its final name
    pub fn create_layer(&mut self, name: Option<&str>) -> DocumentResult<String> {
        let layer = self.layers.create_layer(
            &mut self.tree,
            name,
            CommandSink::History(&mut self.history),
        )?;
        Ok(layer.name().to_string())
    }

    pub fn set_current_layer(&mut self, name: &str) -> bool {
        self.layers.set_current_layer(name)
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        self.layers.current_layer()
    }

    /// Rename the current layer; `None` if the name is refused
    pub fn rename_current_layer(&mut self, new_name: &str) -> DocumentResult<Option<String>> {
        Ok(self
            .layers
            .set_current_layer_name(&mut self.tree, new_name, &mut self.history)?)
    }

    /// Show or hide a layer; `false` for unknown layers and no-op toggles
    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> DocumentResult<bool> {
        let Some(layer) = self.layers.layer_by_name(name) else {
            return Ok(false);
        };
        Ok(layer.set_visible(
            &mut self.tree,
            visible,
            CommandSink::History(&mut self.history),
        )?)
    }

    pub fn set_layer_locked(&mut self, name: &str, locked: bool) -> DocumentResult<bool> {
        let Some(layer) = self.layers.layer_by_name(name) else {
            return Ok(false);
        };
        layer.set_locked(&mut self.tree, locked, CommandSink::History(&mut self.history))?;
        Ok(true)
    }

    pub fn set_layer_opacity(&mut self, name: &str, opacity: f64) -> DocumentResult<bool> {
        Ok(self.layers.set_layer_opacity(&mut self.tree, name, opacity)?)
    }

    pub fn layer_color(&mut self, name: &str) -> DocumentResult<Option<String>> {
        Ok(self.layers.get_layer_color(&mut self.tree, name)?)
    }

    pub fn merge_layer(&mut self) -> DocumentResult<bool> {
        Ok(self
            .layers
            .merge_layer(&mut self.tree, CommandSink::History(&mut self.history))?)
    }

    pub fn move_layer(&mut self, from: usize, to: usize) -> DocumentResult<bool> {
        Ok(self.layers.move_layer(&mut self.tree, from, to)?)
    }

    pub fn delete_layers(&mut self, names: &[&str]) -> DocumentResult<usize> {
        Ok(self.layers.delete_layers(
            &mut self.tree,
            names,
            CommandSink::History(&mut self.history),
        )?)
    }

    pub fn clone_layer(&mut self, name: &str) -> DocumentResult<Option<String>> {
        Ok(self
            .layers
            .clone_layer(&mut self.tree, name, CommandSink::History(&mut self.history))?)
    }

    pub fn clone_layers(&mut self, names: &[&str]) -> DocumentResult<Vec<String>> {
        Ok(self
            .layers
            .clone_layers(&mut self.tree, names, CommandSink::History(&mut self.history))?)
    }

    /// Merge the named layers into `base` (default: the first of them)
    pub fn merge_layers(
        &mut self,
        names: &[&str],
        base: Option<&str>,
    ) -> DocumentResult<Option<String>> {
        Ok(self.layers.merge_layers(
            &mut self.tree,
            names,
            base,
            CommandSink::History(&mut self.history),
        )?)
    }

    pub fn move_layer_to_position(&mut self, name: &str, position: usize) -> DocumentResult<bool> {
        Ok(self.layers.move_layer_to_position(
            &mut self.tree,
            name,
            position,
            CommandSink::History(&mut self.history),
        )?)
    }

    pub fn move_layers_to_position(
        &mut self,
        names: &[&str],
        position: usize,
    ) -> DocumentResult<bool> {
        Ok(self.layers.move_layers_to_position(
            &mut self.tree,
            names,
            position,
            CommandSink::History(&mut self.history),
        )?)
    }

    /// Drop the configured default layer if it is empty and not alone
    pub fn remove_default_layer_if_empty(&mut self) -> DocumentResult<bool> {
        Ok(self.layers.remove_default_layer_if_empty(
            &mut self.tree,
            &self.config.default_layer_name,
            CommandSink::History(&mut self.history),
        )?)
    }

    pub fn set_layers_lock(&mut self, names: &[&str], locked: bool) -> DocumentResult<usize> {
        Ok(self.layers.set_layers_lock(
            &mut self.tree,
            names,
            locked,
            CommandSink::History(&mut self.history),
        )?)
    }

    /// Move elements into the layer `dest` and make it current
    pub fn move_elements_to_layer(&mut self, nodes: &[NodeId], dest: &str) -> DocumentResult<bool> {
        Ok(self.layers.move_elements_to_layer(
            &mut self.tree,
            nodes,
            dest,
            CommandSink::History(&mut self.history),
        )?)
    }
}

impl DocumentSession<ArenaTree> {
    /// Open a new, empty document
    pub fn new(config: SessionConfig) -> DocumentResult<Self> {
        let tree = ArenaTree::new();
        let root = tree.root();
        Self::with_tree(tree, root, config)
    }

    /// Open a document from its JSON form
    pub fn from_json(json_data: &str, config: SessionConfig) -> DocumentResult<Self> {
        let tree = parse_tree_json(json_data)?;
        let root = tree.root();
        Self::with_tree(tree, root, config)
    }

    /// Serialize the document tree to JSON; history is not included
    pub fn to_json(&self) -> DocumentResult<String> {
        Ok(serde_json::to_string_pretty(&self.tree)?)
    }

    /// Replace the document with the JSON form in `json_data`
    pub fn load_json(&mut self, json_data: &str) -> DocumentResult<()> {
        let tree = parse_tree_json(json_data)?;
        self.replace_tree(tree)
    }

    /// Write the document tree to `path` in RON and mark it saved
    pub fn save_ron(&self, path: &Path) -> DocumentResult<()> {
        let ron_data = ron::ser::to_string_pretty(&self.tree, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, ron_data)?;
        self.status.set_has_unsaved_changes(false);
        log::debug!("Session {} saved to {}", self.id, path.display());
        Ok(())
    }

    /// Replace the document with the RON file at `path`
    pub fn load_ron(&mut self, path: &Path) -> DocumentResult<()> {
        let ron_data = std::fs::read_to_string(path)?;
        let tree: ArenaTree = ron::from_str(&ron_data).map_err(|e| {
            DocumentError::SerializationError(format!("Failed to deserialize from RON: {}", e))
        })?;
        validate_root(&tree)?;
        self.replace_tree(tree)
    }

    fn replace_tree(&mut self, tree: ArenaTree) -> DocumentResult<()> {
        self.root = tree.root();
        self.tree = tree;
        self.history.reset_undo_stack();
        self.layers.reset(&mut self.tree, self.root, true)?;
        self.status.set_has_unsaved_changes(false);
        log::debug!(
            "Session {} loaded {} layer(s)",
            self.id,
            self.layers.num_layers()
        );
        Ok(())
    }
}

fn parse_tree_json(json_data: &str) -> DocumentResult<ArenaTree> {
    let tree: ArenaTree = serde_json::from_str(json_data)?;
    validate_root(&tree)?;
    Ok(tree)
}

fn validate_root(tree: &ArenaTree) -> DocumentResult<()> {
    match tree.kind(tree.root()) {
        Some(NodeKind::Svg) => Ok(()),
        Some(kind) => Err(DocumentError::InvalidDocument(format!(
            "root element is <{}>, expected <svg>",
            kind
        ))),
        None => Err(DocumentError::InvalidDocument(
            "root element is missing".to_string(),
        )),
    }
}
