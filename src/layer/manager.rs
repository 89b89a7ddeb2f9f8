// LayerManager - ordered layer list, name index and current-layer pointer

use crate::command::{
    BatchCommand, CommandResult, CommandSink, InsertElement, MoveElement, UndoManager,
};
use crate::layer::{DATA_TEMPGROUP, DEFAULT_LAYER_BASE_NAME, Layer, default_layer_color};
use crate::tree::{DocumentTree, NodeId, NodeKind, TreeResult};
use std::collections::HashMap;

/// Ordered collection of the layers of one document
///
/// The order of `layers` always matches the sibling order of the layer
/// groups under `root`, and `name_index` maps each name to its first layer.
#[derive(Debug, Clone)]
pub struct LayerManager {
    root: NodeId,
    layers: Vec<Layer>,
    name_index: HashMap<String, NodeId>,
    current: Option<NodeId>,
    base_name: String,
}

impl LayerManager {
    /// Create an empty manager bound to `root`
    ///
    /// Call `identify_layers` to pick up layers already in the tree.
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            layers: Vec::new(),
            name_index: HashMap::new(),
            current: None,
            base_name: DEFAULT_LAYER_BASE_NAME.to_string(),
        }
    }

    /// Use `base_name` for synthesized names instead of "Layer"
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    pub fn layer_name(&self, index: usize) -> Option<&str> {
        self.layers.get(index).map(Layer::name)
    }

    pub fn all_layer_names(&self) -> Vec<String> {
        self.layers.iter().map(|layer| layer.name().to_string()).collect()
    }

    pub fn all_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn current_layer(&self) -> Option<&Layer> {
        let current = self.current?;
        self.layers.iter().find(|layer| layer.group() == current)
    }

    pub fn current_layer_name(&self) -> Option<&str> {
        self.current_layer().map(Layer::name)
    }

    /// Group element of the current layer
    pub fn current_layer_element(&self) -> Option<NodeId> {
        self.current_layer().map(Layer::group)
    }

    pub fn current_layer_position(&self) -> Option<usize> {
        let current = self.current?;
        self.layers.iter().position(|layer| layer.group() == current)
    }

    /// Make the named layer current; `false` if there is no such layer
    pub fn set_current_layer(&mut self, name: &str) -> bool {
        match self.name_index.get(name) {
            Some(group) => {
                self.current = Some(*group);
                true
            }
            None => false,
        }
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        let group = self.name_index.get(name)?;
        self.layers.iter().find(|layer| layer.group() == *group)
    }

    pub fn layer_by_index(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_element_by_name(&self, name: &str) -> Option<NodeId> {
        self.name_index.get(name).copied()
    }

    /// `name` itself when free, otherwise the first free `"<base> <n>"`
    ///
    /// The base is `name` when given, else the manager's base name.
    pub fn unique_layer_name(&self, name: Option<&str>) -> String {
        let name = name.filter(|name| !name.is_empty());
        if let Some(free) = name.filter(|name| !self.has_layer(name)) {
            return free.to_string();
        }

        let base = name.unwrap_or(&self.base_name);
        let mut index = 1;
        loop {
            let candidate = format!("{} {}", base, index);
            if !self.has_layer(&candidate) {
                return candidate;
            }
            index += 1;
        }
    }

    fn push_layer(&mut self, layer: Layer) {
        self.name_index.insert(layer.name().to_string(), layer.group());
        self.layers.push(layer);
    }

    fn remove_layer_at(&mut self, index: usize) -> Layer {
        let layer = self.layers.remove(index);
        self.name_index.remove(layer.name());
        layer
    }

    fn position_of_group(&self, group: NodeId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.group() == group)
    }

    /// Positions of the named layers in list order, unknown names dropped
    fn positions_of(&self, names: &[&str]) -> Vec<usize> {
        let mut positions: Vec<usize> = names
            .iter()
            .filter_map(|name| self.layer_element_by_name(name))
            .filter_map(|group| self.position_of_group(group))
            .collect();
        positions.sort_unstable();
        positions.dedup();
        positions
    }

    /// Re-sort the list after layer groups were moved in the tree
    fn reorder_from_tree(&mut self, tree: &dyn DocumentTree) {
        let order = tree.children(self.root);
        self.layers
            .sort_by_key(|layer| order.iter().position(|child| *child == layer.group()));
    }

    /// Append a new layer as the last one and make it current
    ///
    /// A missing, empty or taken name is replaced by a synthesized one.
    pub fn create_layer(
        &mut self,
        tree: &mut dyn DocumentTree,
        name: Option<&str>,
        sink: CommandSink<'_>,
    ) -> CommandResult<&Layer> {
        let name = self.unique_layer_name(name);
        let layer = Layer::create(tree, &name, self.root, None, None)?;
        let label = format!("Create Layer: {}", name);
        sink.submit(InsertElement::new(tree, layer.group(), Some(&label))?);

        log::debug!("Created layer '{}'", name);
        self.current = Some(layer.group());
        self.push_layer(layer);
        Ok(&self.layers[self.layers.len() - 1])
    }

    /// Rebuild the layer list from the tree
    ///
    /// Every group under the root with a non-empty title is a layer; other
    /// visible content and untitled groups are orphans. When there are
    /// orphans, or no layer at all, a new layer is created to hold them.
    /// The last layer becomes current.
    pub fn identify_layers(&mut self, tree: &mut dyn DocumentTree) -> TreeResult<()> {
        self.clear();
        let mut orphans = Vec::new();

        for child in tree.children(self.root) {
            let Some(kind) = tree.kind(child) else {
                continue;
            };

            if kind == NodeKind::Group {
                if tree.attribute(child, DATA_TEMPGROUP).is_some() {
                    continue;
                }

                let title = tree
                    .first_child_of_kind(child, &NodeKind::Title)
                    .map(|title| tree.text_content(title))
                    .filter(|title| !title.is_empty());

                match title {
                    Some(title) => {
                        let name = self.unique_layer_name(Some(&title));
                        if name != title {
                            log::warn!("Duplicate layer name '{}' renamed to '{}'", title, name);
                        }
                        let layer = Layer::from_group(tree, &name, child, None)?;
                        self.push_layer(layer);
                    }
                    None => orphans.push(child),
                }
            } else if kind.is_visible() {
                orphans.push(child);
            }
        }

        if !orphans.is_empty() || self.layers.is_empty() {
            let name = self.unique_layer_name(None);
            let layer = Layer::create(tree, &name, self.root, None, None)?;
            layer.append_children(tree, &orphans)?;
            log::debug!("Collected {} orphan(s) into layer '{}'", orphans.len(), name);
            self.push_layer(layer);
        }

        self.current = self.layers.last().map(Layer::group);
        Ok(())
    }

    /// Re-index the layers from the tree without modifying it
    ///
    /// Picks up the titled, non-temporary groups under the root in order.
    /// Unlike `identify_layers` nothing is created, re-titled or reparented,
    /// so the result may be empty. The current layer is kept when its group
    /// is still a layer; otherwise the last layer becomes current.
    pub fn sync_layers(&mut self, tree: &dyn DocumentTree) {
        let current = self.current;
        self.layers.clear();
        self.name_index.clear();

        for child in tree.children(self.root) {
            if tree.kind(child) != Some(NodeKind::Group)
                || tree.attribute(child, DATA_TEMPGROUP).is_some()
            {
                continue;
            }
            let Some(name) = tree
                .first_child_of_kind(child, &NodeKind::Title)
                .map(|title| tree.text_content(title))
                .filter(|title| !title.is_empty())
            else {
                continue;
            };

            let layer = Layer::existing(name, child);
            if self.has_layer(layer.name()) {
                log::warn!("Duplicate layer name '{}' kept unindexed", layer.name());
                self.layers.push(layer);
            } else {
                self.push_layer(layer);
            }
        }

        self.current = current
            .filter(|group| self.position_of_group(*group).is_some())
            .or_else(|| self.layers.last().map(Layer::group));
    }

    /// Rename the current layer and re-key the name index
    ///
    /// Returns `Ok(None)` when there is no current layer, the new name is
    /// unchanged, empty or already used by another layer, or the layer has
    /// no title.
    pub fn set_current_layer_name(
        &mut self,
        tree: &mut dyn DocumentTree,
        new_name: &str,
        history: &mut UndoManager,
    ) -> TreeResult<Option<String>> {
        let Some(position) = self.current_layer_position() else {
            return Ok(None);
        };
        let old_name = self.layers[position].name().to_string();
        if new_name == old_name || new_name.is_empty() || self.has_layer(new_name) {
            return Ok(None);
        }

        let layer = &mut self.layers[position];
        let Some(renamed) = layer.set_name(tree, new_name, history)? else {
            return Ok(None);
        };
        let group = layer.group();

        self.name_index.remove(&old_name);
        self.name_index.insert(renamed.clone(), group);
        Ok(Some(renamed))
    }

    /// Color of the named layer
    ///
    /// A layer without a color gets a default one written back: its own
    /// name, or magenta for the traced-path layer.
    pub fn get_layer_color(
        &self,
        tree: &mut dyn DocumentTree,
        name: &str,
    ) -> TreeResult<Option<String>> {
        let Some(layer) = self.layer_by_name(name) else {
            return Ok(None);
        };
        if let Some(color) = layer.color(tree).filter(|color| !color.is_empty()) {
            return Ok(Some(color));
        }

        let color = default_layer_color(name);
        layer.set_color(tree, color)?;
        Ok(Some(color.to_string()))
    }

    pub fn get_layer_opacity(&self, tree: &dyn DocumentTree, name: &str) -> Option<f64> {
        self.layer_by_name(name).map(|layer| layer.opacity(tree))
    }

    /// Set a layer's opacity; unknown layers and out-of-range values are ignored
    pub fn set_layer_opacity(
        &self,
        tree: &mut dyn DocumentTree,
        name: &str,
        opacity: f64,
    ) -> TreeResult<bool> {
        match self.layer_by_name(name) {
            Some(layer) => layer.set_opacity(tree, opacity),
            None => Ok(false),
        }
    }

    /// Merge the current layer into the layer before it
    ///
    /// Children keep their order and are appended to the previous layer's
    /// group; title and filter children are left behind and removed with
    /// the emptied group. Returns `Ok(false)` when there is no previous layer.
    pub fn merge_layer(
        &mut self,
        tree: &mut dyn DocumentTree,
        sink: CommandSink<'_>,
    ) -> CommandResult<bool> {
        let Some(position) = self.current_layer_position() else {
            return Ok(false);
        };
        if position == 0 {
            return Ok(false);
        }

        let previous = self.layers[position - 1].group();
        let merged = self.layers[position].clone();
        let mut batch = BatchCommand::new("Merge Layer");

        move_layer_content(tree, merged.group(), previous, None, &mut batch)?;
        merged.remove_group(tree, CommandSink::Parent(&mut batch))?;

        self.remove_layer_at(position);
        self.current = Some(previous);
        log::debug!("Merged layer '{}' ({} command(s))", merged.name(), batch.len());

        sink.submit(batch);
        Ok(true)
    }

    /// Merge the named layers into one base layer
    ///
    /// `base` defaults to the first named layer in list order. Content of
    /// layers listed before the base goes in front of the base's own
    /// content, content of later layers is appended. Everything is recorded
    /// in one "Merge Layer(s)" batch and the base becomes current. Returns
    /// the base name, or `Ok(None)` when there is no base layer.
    pub fn merge_layers(
        &mut self,
        tree: &mut dyn DocumentTree,
        names: &[&str],
        base: Option<&str>,
        sink: CommandSink<'_>,
    ) -> CommandResult<Option<String>> {
        let positions = self.positions_of(names);
        let base_position = match base {
            Some(base) => self
                .layer_element_by_name(base)
                .and_then(|group| self.position_of_group(group)),
            None => positions.first().copied(),
        };
        let Some(base_position) = base_position else {
            return Ok(None);
        };

        let base_layer = self.layers[base_position].clone();
        let anchor = tree
            .children(base_layer.group())
            .into_iter()
            .find(|child| !is_layer_meta(&*tree, *child));
        let merged: Vec<Layer> = positions
            .iter()
            .filter(|position| **position != base_position)
            .map(|position| self.layers[*position].clone())
            .collect();

        let mut batch = BatchCommand::new("Merge Layer(s)");
        for layer in &merged {
            let before_base = self
                .position_of_group(layer.group())
                .is_some_and(|position| position < base_position);
            let reference = if before_base { anchor } else { None };
            move_layer_content(tree, layer.group(), base_layer.group(), reference, &mut batch)?;
            layer.remove_group(tree, CommandSink::Parent(&mut batch))?;
        }

        for layer in &merged {
            if let Some(position) = self.position_of_group(layer.group()) {
                self.remove_layer_at(position);
            }
        }
        self.current = Some(base_layer.group());
        log::debug!(
            "Merged {} layer(s) into '{}'",
            merged.len(),
            base_layer.name()
        );

        if !batch.is_empty() {
            sink.submit(batch);
        }
        Ok(Some(base_layer.name().to_string()))
    }

    /// Move the layer at `from` to position `to`
    ///
    /// The group is reinserted before the group now following it, or
    /// appended when it became last. Not recorded in history.
    pub fn move_layer(
        &mut self,
        tree: &mut dyn DocumentTree,
        from: usize,
        to: usize,
    ) -> TreeResult<bool> {
        let count = self.layers.len();
        if from >= count || to >= count || from == to {
            return Ok(false);
        }

        let layer = self.layers.remove(from);
        let group = layer.group();
        self.layers.insert(to, layer);

        let reference = self.layers.get(to + 1).map(Layer::group);
        tree.insert_before(self.root, group, reference)?;
        Ok(true)
    }

    /// Move one layer to the slot `position`, see `move_layers_to_position`
    pub fn move_layer_to_position(
        &mut self,
        tree: &mut dyn DocumentTree,
        name: &str,
        position: usize,
        sink: CommandSink<'_>,
    ) -> CommandResult<bool> {
        self.move_layers_to_position(tree, &[name], position, sink)
    }

    /// Move the named layers, in their current order, to slot `position`
    ///
    /// Slots lie between layers: 0 is in front of the first layer and
    /// `num_layers()` after the last. The layers land in front of the layer
    /// that held `position` before the move. Real moves are recorded in one
    /// "Move Layer(s)" batch. Returns `Ok(false)` for an out-of-range slot
    /// or when no name is a layer. The current layer does not change.
    pub fn move_layers_to_position(
        &mut self,
        tree: &mut dyn DocumentTree,
        names: &[&str],
        position: usize,
        sink: CommandSink<'_>,
    ) -> CommandResult<bool> {
        if position > self.layers.len() {
            return Ok(false);
        }
        let moving: Vec<NodeId> = self
            .positions_of(names)
            .into_iter()
            .map(|position| self.layers[position].group())
            .collect();
        if moving.is_empty() {
            return Ok(false);
        }

        let mut batch = BatchCommand::new("Move Layer(s)");
        let mut reference = self.layers.get(position).map(Layer::group);
        for group in moving.into_iter().rev() {
            let old_next_sibling = tree.next_sibling(group);
            if reference != Some(group) && old_next_sibling != reference {
                tree.insert_before(self.root, group, reference)?;
                batch.add_sub_command(MoveElement::new(
                    tree,
                    group,
                    old_next_sibling,
                    self.root,
                    None,
                )?);
            }
            reference = Some(group);
        }

        self.reorder_from_tree(tree);
        if !batch.is_empty() {
            sink.submit(batch);
        }
        Ok(true)
    }

    /// Delete the named layers in one "Delete Layer(s)" batch
    ///
    /// Unknown names are skipped. If no layer is left a default layer is
    /// created inside the same batch. The last layer becomes current.
    /// Returns the number of layers deleted.
    pub fn delete_layers(
        &mut self,
        tree: &mut dyn DocumentTree,
        names: &[&str],
        sink: CommandSink<'_>,
    ) -> CommandResult<usize> {
        let mut batch = BatchCommand::new("Delete Layer(s)");
        let mut deleted = 0;

        for name in names {
            let Some(group) = self.layer_element_by_name(name) else {
                continue;
            };
            let Some(position) = self.layers.iter().position(|layer| layer.group() == group) else {
                continue;
            };

            let layer = self.remove_layer_at(position);
            layer.remove_group(tree, CommandSink::Parent(&mut batch))?;
            deleted += 1;
        }

        if self.layers.is_empty() {
            self.create_layer(tree, None, CommandSink::Parent(&mut batch))?;
        }
        self.current = self.layers.last().map(Layer::group);

        if !batch.is_empty() {
            sink.submit(batch);
        }
        Ok(deleted)
    }

    /// Duplicate the named layer as a new last layer
    ///
    /// The copy is named `"<name> copy"` (then `"<name> copy 1"`, ...),
    /// gets deep copies of every non-title child and the source's color
    /// flags, and becomes current. Returns the copy's name, or `Ok(None)`
    /// for an unknown layer.
    pub fn clone_layer(
        &mut self,
        tree: &mut dyn DocumentTree,
        name: &str,
        sink: CommandSink<'_>,
    ) -> CommandResult<Option<String>> {
        let Some(source) = self.layer_by_name(name).cloned() else {
            return Ok(None);
        };

        let base = format!("{} copy", name);
        let mut new_name = base.clone();
        let mut index = 0;
        while self.has_layer(&new_name) {
            index += 1;
            new_name = format!("{} {}", base, index);
        }

        let color = source.color(tree);
        let copy = Layer::create(tree, &new_name, self.root, None, color.as_deref())?;
        let full_color = source.full_color(tree);
        copy.set_full_color(tree, full_color)?;

        for child in tree.children(source.group()) {
            if tree.kind(child) == Some(NodeKind::Title) {
                continue;
            }
            let cloned = tree.clone_node(child, true)?;
            tree.append_child(copy.group(), cloned)?;
        }

        let mut batch = BatchCommand::new("Clone Layer");
        batch.add_sub_command(InsertElement::new(tree, copy.group(), None)?);

        self.current = Some(copy.group());
        self.push_layer(copy);
        sink.submit(batch);
        Ok(Some(new_name))
    }

    /// Delete the default layer when it is empty and not the only layer
    ///
    /// Empty means nothing besides title and filter children. Returns
    /// whether the layer was deleted.
    pub fn remove_default_layer_if_empty(
        &mut self,
        tree: &mut dyn DocumentTree,
        default_name: &str,
        sink: CommandSink<'_>,
    ) -> CommandResult<bool> {
        if self.layers.len() < 2 {
            return Ok(false);
        }
        let Some(group) = self.layer_element_by_name(default_name) else {
            return Ok(false);
        };
        if tree.children(group).into_iter().any(|child| !is_layer_meta(&*tree, child)) {
            return Ok(false);
        }
        let Some(position) = self.position_of_group(group) else {
            return Ok(false);
        };

        let layer = self.remove_layer_at(position);
        layer.remove_group(tree, sink)?;
        if self.current == Some(group) {
            self.current = self.layers.last().map(Layer::group);
        }
        log::debug!("Removed empty default layer '{}'", default_name);
        Ok(true)
    }

    /// Clone the named layers in list order as one "Clone Layer(s)" batch
    ///
    /// Returns the names of the copies; the last copy becomes current.
    pub fn clone_layers(
        &mut self,
        tree: &mut dyn DocumentTree,
        names: &[&str],
        sink: CommandSink<'_>,
    ) -> CommandResult<Vec<String>> {
        let sources: Vec<String> = self
            .positions_of(names)
            .into_iter()
            .map(|position| self.layers[position].name().to_string())
            .collect();

        let mut batch = BatchCommand::new("Clone Layer(s)");
        let mut copies = Vec::with_capacity(sources.len());
        for source in &sources {
            if let Some(copy) = self.clone_layer(tree, source, CommandSink::Parent(&mut batch))? {
                copies.push(copy);
            }
        }

        if !batch.is_empty() {
            sink.submit(batch);
        }
        Ok(copies)
    }

    /// Lock or unlock the named layers as one "Set Layer(s) Lock" batch
    ///
    /// Returns the number of named layers found.
    pub fn set_layers_lock(
        &self,
        tree: &mut dyn DocumentTree,
        names: &[&str],
        locked: bool,
        sink: CommandSink<'_>,
    ) -> CommandResult<usize> {
        let mut batch = BatchCommand::new("Set Layer(s) Lock");
        let mut found = 0;
        for position in self.positions_of(names) {
            self.layers[position].set_locked(tree, locked, CommandSink::Parent(&mut batch))?;
            found += 1;
        }

        if !batch.is_empty() {
            sink.submit(batch);
        }
        Ok(found)
    }

    /// Append `nodes` to the layer `dest` and make it current
    ///
    /// Each node is moved with its own move command inside one "Move
    /// Elements to Layer" batch; detached nodes and the layer group itself
    /// are skipped. Returns `Ok(false)` for an unknown layer.
    pub fn move_elements_to_layer(
        &mut self,
        tree: &mut dyn DocumentTree,
        nodes: &[NodeId],
        dest: &str,
        sink: CommandSink<'_>,
    ) -> CommandResult<bool> {
        let Some(target) = self.layer_element_by_name(dest) else {
            return Ok(false);
        };

        let mut batch = BatchCommand::new("Move Elements to Layer");
        for node in nodes {
            if *node == target {
                continue;
            }
            let Some(old_parent) = tree.parent(*node) else {
                continue;
            };
            let old_next_sibling = tree.next_sibling(*node);
            tree.append_child(target, *node)?;
            batch.add_sub_command(MoveElement::new(
                tree,
                *node,
                old_next_sibling,
                old_parent,
                None,
            )?);
        }

        self.current = Some(target);
        if !batch.is_empty() {
            sink.submit(batch);
        }
        Ok(true)
    }

    /// Forget every tracked layer; the tree is left untouched
    pub fn clear(&mut self) {
        self.layers.clear();
        self.name_index.clear();
        self.current = None;
    }

    /// Rebind to a new root, optionally rescanning it
    pub fn reset(
        &mut self,
        tree: &mut dyn DocumentTree,
        root: NodeId,
        identify: bool,
    ) -> TreeResult<()> {
        self.clear();
        self.root = root;
        if identify {
            self.identify_layers(tree)?;
        }
        Ok(())
    }
}

/// Title and filter children belong to the layer itself, not its content
fn is_layer_meta(tree: &dyn DocumentTree, node: NodeId) -> bool {
    matches!(tree.kind(node), Some(NodeKind::Title | NodeKind::Filter))
}

/// Move the content of `source` into `target` in front of `reference`
fn move_layer_content(
    tree: &mut dyn DocumentTree,
    source: NodeId,
    target: NodeId,
    reference: Option<NodeId>,
    batch: &mut BatchCommand,
) -> CommandResult<()> {
    for child in tree.children(source) {
        if is_layer_meta(tree, child) {
            continue;
        }
        let old_next_sibling = tree.next_sibling(child);
        tree.insert_before(target, child, reference)?;
        batch.add_sub_command(MoveElement::new(tree, child, old_next_sibling, source, None)?);
    }
    Ok(())
}
