// Integration test: layer workflows as an editor drives them
//
// Builds documents through LayerManager and DocumentSession and checks the
// layer list, the tree and the history together.

use layerdoc::command::{BatchCommand, CommandSink, UndoManager};
use layerdoc::layer::{Layer, LayerManager};
use layerdoc::session::{DocumentSession, SessionConfig};
use layerdoc::tree::{ArenaTree, DocumentTree, NodeId, NodeKind};

fn layer_groups(manager: &LayerManager) -> Vec<NodeId> {
    manager.all_layers().iter().map(Layer::group).collect()
}

#[test]
fn test_create_move_scenario() {
    let mut tree = ArenaTree::new();
    let mut manager = LayerManager::new(tree.root());
    let mut history = UndoManager::new();

    manager
        .create_layer(&mut tree, Some("A"), CommandSink::History(&mut history))
        .unwrap();
    manager
        .create_layer(&mut tree, Some("B"), CommandSink::History(&mut history))
        .unwrap();
    assert_eq!(manager.all_layer_names(), vec!["A", "B"]);
    assert_eq!(manager.current_layer_name(), Some("B"));

    manager.set_current_layer("A");
    manager
        .create_layer(&mut tree, Some("B"), CommandSink::History(&mut history))
        .unwrap();
    assert_eq!(manager.current_layer_name(), Some("B 1"));
    assert_eq!(manager.all_layer_names(), vec!["A", "B", "B 1"]);
    assert_eq!(manager.num_layers(), 3);

    manager.move_layer(&mut tree, 2, 0).unwrap();
    assert_eq!(manager.all_layer_names(), vec!["B 1", "A", "B"]);
    assert_eq!(tree.children(tree.root()), layer_groups(&manager));
    assert_eq!(history.undo_stack_size(), 3);
}

#[test]
fn test_rescan_after_external_edits() {
    let mut tree = ArenaTree::new();
    let root = tree.root();
    let mut manager = LayerManager::new(root);
    manager.create_layer(&mut tree, Some("Cut"), CommandSink::Discard).unwrap();

    // Content added behind the manager's back
    let stray_rect = tree.append_new(root, NodeKind::Rect).unwrap();
    let stray_text = tree.append_new(root, NodeKind::Text).unwrap();
    tree.append_new(root, NodeKind::Defs).unwrap();

    manager.identify_layers(&mut tree).unwrap();

    assert_eq!(manager.all_layer_names(), vec!["Cut", "Layer 1"]);
    let orphan_group = manager.layer_element_by_name("Layer 1").unwrap();
    assert_eq!(tree.parent(stray_rect), Some(orphan_group));
    assert_eq!(tree.parent(stray_text), Some(orphan_group));
    assert_eq!(manager.current_layer_name(), Some("Layer 1"));
}

#[test]
fn test_compound_operation_in_caller_batch() {
    let mut tree = ArenaTree::new();
    let mut manager = LayerManager::new(tree.root());
    let mut history = UndoManager::new();
    manager.create_layer(&mut tree, Some("Base"), CommandSink::Discard).unwrap();

    let mut batch = BatchCommand::new("Prepare job");
    manager
        .create_layer(&mut tree, Some("Cut"), CommandSink::Parent(&mut batch))
        .unwrap();
    let cut = manager.layer_by_name("Cut").unwrap().clone();
    cut.set_visible(&mut tree, false, CommandSink::Parent(&mut batch))
        .unwrap();
    cut.set_locked(&mut tree, true, CommandSink::Parent(&mut batch))
        .unwrap();

    assert_eq!(batch.len(), 3);
    assert_eq!(batch.inserted_nodes(), vec![cut.group()]);
    history.add_command_to_history(batch);
    assert_eq!(history.next_undo_command_text(), Some("Prepare job"));

    history.undo(&mut tree).unwrap();
    assert_eq!(tree.parent(cut.group()), None);
    assert!(cut.is_visible(&tree));
    assert!(!cut.is_locked(&tree));

    history.redo(&mut tree).unwrap();
    assert_eq!(tree.parent(cut.group()), Some(tree.root()));
    assert!(!cut.is_visible(&tree));
    assert!(cut.is_locked(&tree));
}

#[test]
fn test_merge_then_undo_through_session() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    let first = session.insert_element(NodeKind::Rect).unwrap();
    session.create_layer(Some("Engrave")).unwrap();
    let second = session.insert_element(NodeKind::Path).unwrap();
    let base_group = session.layers().layer_element_by_name("Layer 1").unwrap();

    assert!(session.merge_layer().unwrap());
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1"]);
    assert_eq!(session.tree().parent(second), Some(base_group));

    session.undo().unwrap();
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1", "Engrave"]);
    let engrave = session.layers().layer_element_by_name("Engrave").unwrap();
    assert_eq!(session.tree().parent(second), Some(engrave));
    assert_eq!(session.tree().parent(first), Some(base_group));

    session.redo().unwrap();
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1"]);
}

#[test]
fn test_merge_on_single_layer_records_nothing() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    let before = session.history().undo_stack_size();

    assert!(!session.merge_layer().unwrap());
    assert_eq!(session.history().undo_stack_size(), before);
    assert!(!session.has_unsaved_changes());
}

#[test]
fn test_delete_and_clone_round_trip() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    session.insert_element(NodeKind::Circle).unwrap();

    let copy = session.clone_layer("Layer 1").unwrap();
    assert_eq!(copy.as_deref(), Some("Layer 1 copy"));
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1", "Layer 1 copy"]);

    let deleted = session.delete_layers(&["Layer 1", "Layer 1 copy"]).unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1"]);
    let fresh = session.layers().current_layer_element().unwrap();
    assert!(session.tree().children(fresh).len() == 1);

    session.undo().unwrap();
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1", "Layer 1 copy"]);

    session.undo().unwrap();
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1"]);
}

#[test]
fn test_opacity_is_not_recorded() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    let before = session.history().undo_stack_size();

    assert!(session.set_layer_opacity("Layer 1", 0.4).unwrap());
    assert!(!session.set_layer_opacity("Layer 1", -1.0).unwrap());

    assert_eq!(session.layers().get_layer_opacity(session.tree(), "Layer 1"), Some(0.4));
    assert_eq!(session.history().undo_stack_size(), before);
}

#[test]
fn test_layer_color_written_back() {
    let config = SessionConfig {
        default_layer_color: None,
        ..SessionConfig::default()
    };
    let mut session = DocumentSession::new(config).unwrap();

    let color = session.layer_color("Layer 1").unwrap();
    assert_eq!(color.as_deref(), Some("Layer 1"));
    let group = session.layers().layer_element_by_name("Layer 1").unwrap();
    assert_eq!(
        session.tree().attribute(group, "data-color").as_deref(),
        Some("Layer 1")
    );
}

#[test]
fn test_import_then_drop_empty_default_layer() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    session.create_layer(Some("Imported")).unwrap();
    session.insert_element(NodeKind::Path).unwrap();

    assert!(session.remove_default_layer_if_empty().unwrap());
    assert_eq!(session.layers().all_layer_names(), vec!["Imported"]);
    assert!(!session.remove_default_layer_if_empty().unwrap());

    session.undo().unwrap();
    assert_eq!(session.layers().all_layer_names(), vec!["Layer 1", "Imported"]);
}

#[test]
fn test_reorder_merge_and_lock_through_session() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    let outline = session.insert_element(NodeKind::Rect).unwrap();
    session.create_layer(Some("Engrave")).unwrap();
    let text = session.insert_element(NodeKind::Text).unwrap();
    session.create_layer(Some("Score")).unwrap();
    let line = session.insert_element(NodeKind::Line).unwrap();

    assert!(session.move_layers_to_position(&["Engrave", "Score"], 0).unwrap());
    assert_eq!(
        session.layers().all_layer_names(),
        vec!["Engrave", "Score", "Layer 1"]
    );
    assert_eq!(session.current_layer().map(Layer::name), Some("Score"));

    assert_eq!(session.set_layers_lock(&["Engrave", "Layer 1"], true).unwrap(), 2);
    let copies = session.clone_layers(&["Score"]).unwrap();
    assert_eq!(copies, vec!["Score copy"]);

    let base = session.merge_layers(&["Layer 1", "Score"], Some("Engrave")).unwrap();
    assert_eq!(base.as_deref(), Some("Engrave"));
    assert_eq!(session.layers().all_layer_names(), vec!["Engrave", "Score copy"]);
    let engrave = session.layers().layer_element_by_name("Engrave").unwrap();
    assert_eq!(&session.tree().children(engrave)[1..], &[text, line, outline]);

    session.undo().unwrap();
    session.undo().unwrap();
    assert_eq!(
        session.layers().all_layer_names(),
        vec!["Engrave", "Score", "Layer 1"]
    );
    session.undo().unwrap();
    session.undo().unwrap();
    assert_eq!(
        session.layers().all_layer_names(),
        vec!["Layer 1", "Engrave", "Score"]
    );
}

#[test]
fn test_move_selection_to_other_layer() {
    let mut session = DocumentSession::new(SessionConfig::default()).unwrap();
    let first = session.insert_element(NodeKind::Circle).unwrap();
    let second = session.insert_element(NodeKind::Ellipse).unwrap();
    session.create_layer(Some("Cut")).unwrap();
    session.set_current_layer("Layer 1");

    assert!(session.move_elements_to_layer(&[first, second], "Cut").unwrap());
    let cut = session.layers().layer_element_by_name("Cut").unwrap();
    assert_eq!(session.tree().parent(first), Some(cut));
    assert_eq!(session.tree().parent(second), Some(cut));
    assert_eq!(session.current_layer().map(Layer::name), Some("Cut"));

    session.undo().unwrap();
    let base = session.layers().layer_element_by_name("Layer 1").unwrap();
    assert_eq!(session.tree().parent(first), Some(base));
    assert_eq!(session.tree().parent(second), Some(base));
}
