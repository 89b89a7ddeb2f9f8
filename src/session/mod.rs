// Document session - explicit per-document service object
//
// A session owns everything one open document needs: the tree, its undo
// history, its layer list and its dirty flag. Nothing is global, so each
// document gets its own session.

pub mod config;
pub mod document;
pub mod error;
pub mod layer_sync;

pub use config::SessionConfig;
pub use document::{DocumentSession, SessionId};
pub use error::{DocumentError, DocumentResult};
pub use layer_sync::{LayerSync, touches_layers};
