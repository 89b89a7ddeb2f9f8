// layerdoc - Edit history and layer management for 2D laser job documents

pub mod command;
pub mod layer;
pub mod session;
pub mod tree;

// Re-export commonly used types for convenience
pub use command::{
    BatchCommand, Command, CommandError, CommandResult, CommandSink, DocumentStatus,
    HistoryEvent, HistoryEventHandler, UndoManager,
};
pub use layer::{Layer, LayerManager};
pub use session::{DocumentError, DocumentResult, DocumentSession, SessionConfig, SessionId};
pub use tree::{ArenaTree, DocumentTree, NodeId, NodeKind, TreeError, TreeResult};
