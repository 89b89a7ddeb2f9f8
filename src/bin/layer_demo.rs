// Quick demonstration of the layer and history engine
// Run with: cargo run --bin layer_demo

use layerdoc::session::{DocumentSession, SessionConfig};
use layerdoc::tree::NodeKind;

fn print_layers(session: &DocumentSession) {
    for layer in session.layers().all_layers() {
        let marker = if session.current_layer() == Some(layer) {
            "*"
        } else {
            " "
        };
        let visibility = if layer.is_visible(session.tree()) {
            "visible"
        } else {
            "hidden"
        };
        println!(
            "   {} {} ({}, opacity {:.2})",
            marker,
            layer.name(),
            visibility,
            layer.opacity(session.tree())
        );
    }
}

fn print_history(session: &DocumentSession) {
    let history = session.history();
    println!(
        "   - Undo: {} step(s), next: {:?}",
        history.undo_stack_size(),
        history.next_undo_command_text()
    );
    println!(
        "   - Redo: {} step(s), next: {:?}",
        history.redo_stack_size(),
        history.next_redo_command_text()
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("✂️  layerdoc - Layer & History Demo");
    println!("==================================");

    let mut session = DocumentSession::new(SessionConfig::default())?;
    println!("✅ Opened session {}", session.id());
    println!("   - Unsaved changes: {}", session.has_unsaved_changes());
    print_layers(&session);

    // Draw into the default layer, then add two more layers
    let outline = session.insert_element(NodeKind::Path)?;
    session.set_attribute(outline, "d", "M0 0 H100 V100 H0 Z")?;
    session.create_layer(Some("Engrave"))?;
    session.insert_element(NodeKind::Text)?;
    session.create_layer(Some("Engrave"))?;
    session.set_layer_opacity("Engrave", 0.6)?;

    println!("\n🧩 After drawing and creating layers:");
    print_layers(&session);
    print_history(&session);

    session.move_layer(2, 0)?;
    session.set_layer_visible("Engrave 1", false)?;
    println!("\n🔀 Moved 'Engrave 1' to the bottom and hid it:");
    print_layers(&session);

    session.set_current_layer("Engrave");
    session.merge_layer()?;
    println!("\n🔗 Merged 'Engrave' into the layer below:");
    print_layers(&session);

    println!("\n↩️  Undo x2:");
    session.undo()?;
    session.undo()?;
    print_layers(&session);
    print_history(&session);

    println!("\n↪️  Redo x1:");
    session.redo()?;
    print_layers(&session);
    print_history(&session);

    // Save and reopen
    let path = std::env::temp_dir().join("layerdoc_demo.ron");
    session.save_ron(&path)?;
    println!("\n💾 Saved document to: {}", path.display());
    println!("   - Unsaved changes: {}", session.has_unsaved_changes());

    let mut reopened = DocumentSession::new(SessionConfig::default())?;
    reopened.load_ron(&path)?;
    println!("\n📂 Reopened in session {}:", reopened.id());
    print_layers(&reopened);
    print_history(&reopened);

    std::fs::remove_file(&path)?;
    println!("\n🧹 Cleaned up demo file");

    println!("\n🎉 Demo completed successfully!");
    Ok(())
}
