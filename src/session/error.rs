// Session errors

use crate::command::CommandError;
use crate::tree::TreeError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::Error),
}

pub type DocumentResult<T> = Result<T, DocumentError>;
