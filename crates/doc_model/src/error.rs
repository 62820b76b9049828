//! Error types for document model operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocModelError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown mark type: {0}")]
    UnknownMarkType(String),

    #[error("Malformed node: {0}")]
    MalformedNode(String),

    #[error("Invalid position: {pos} (document size {size})")]
    InvalidPosition { pos: usize, size: usize },

    #[error("No node at path {0:?}")]
    PathNotFound(Vec<usize>),

    #[error("Tree structure error: {0}")]
    TreeStructureError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DocModelError>;
