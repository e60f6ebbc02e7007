//! Error types for the collaboration layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollabError {
    #[error("Failed to decode: {0}")]
    Decode(String),

    #[error("Failed to apply update: {0}")]
    Apply(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Document has not synced yet")]
    NotSynced,

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CollabResult<T> = Result<T, CollabError>;
