//! Store error types

use thiserror::Error;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage backend failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database I/O or query error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back into the domain model
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}
