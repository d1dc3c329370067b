//! Entity store error types.

use thiserror::Error;

use crate::state::Version;

/// Errors that can occur during entity store operations.
#[derive(Debug, Error)]
pub enum EntityStoreError {
    /// The stored version did not match the expected version at save time.
    #[error("version conflict for {key}: expected {expected}, found {actual}")]
    VersionConflict {
        key: String,
        expected: Version,
        actual: Version,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for entity store operations.
pub type Result<T> = std::result::Result<T, EntityStoreError>;
