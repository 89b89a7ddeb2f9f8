// Layer management - named, ordered groups directly under the document root
//
// A layer is nothing more than a marked group element whose title child
// carries its name. LayerManager keeps an ordered view of those groups, a
// name index and the current-layer pointer, and can rebuild all of it from
// the tree at any time (identify_layers), or re-index it without touching
// the tree (sync_layers).

pub mod layer_group;
pub mod manager;

pub use layer_group::Layer;
pub use manager::LayerManager;

/// Class marking a group as a layer root
pub const LAYER_CLASS: &str = "layer";

pub const DATA_COLOR: &str = "data-color";
pub const DATA_FULLCOLOR: &str = "data-fullcolor";
pub const DATA_LOCK: &str = "data-lock";

/// Scratch groups carrying this attribute are never layers
pub const DATA_TEMPGROUP: &str = "data-tempgroup";

pub const DISPLAY: &str = "display";
pub const OPACITY: &str = "opacity";

/// Base of synthesized layer names ("Layer 1", "Layer 2", ...)
pub const DEFAULT_LAYER_BASE_NAME: &str = "Layer";

/// Layer holding traced output, colored magenta unless told otherwise
pub const TRACED_PATH_LAYER: &str = "Traced Path";
pub const TRACED_PATH_COLOR: &str = "#ff00ff";

/// Color given to a layer that has none: its own name, magenta for traces
pub fn default_layer_color(name: &str) -> &str {
    if name == TRACED_PATH_LAYER {
        TRACED_PATH_COLOR
    } else {
        name
    }
}
