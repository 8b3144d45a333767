//! Storage error types.

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A concurrent writer got there first
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Stored data that cannot be turned back into a match
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
