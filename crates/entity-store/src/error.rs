use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors raised by entity store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record was changed by another writer after it was read.
    /// Nothing from the commit was written.
    #[error(
        "Concurrency conflict on record {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The commit was malformed and was rejected before touching storage.
    #[error("Invalid commit: {0}")]
    InvalidCommit(String),

    /// The backend could not be reached or refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true when retrying the whole read-modify-write may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for entity store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
