//! Error types for the lock protocol

use thiserror::Error;

/// Failures while interpreting lock data.
///
/// Lock operations themselves never fail; these only surface when turning
/// wire strings back into typed values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("Unknown lock kind: {0}")]
    UnknownKind(String),

    #[error("Invalid lock timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}
