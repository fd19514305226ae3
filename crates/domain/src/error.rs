//! Domain error types.

use entity_store::StoreError;
use thiserror::Error;

use crate::conference::ConferenceError;
use crate::profile::ProfileError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No authenticated caller.
    #[error("Authorization required")]
    Unauthorized,

    /// The caller has no profile yet.
    #[error("Profile doesn't exist.")]
    ProfileNotFound,

    #[error("No Conference found with key: {key}")]
    ConferenceNotFound { key: String },

    #[error("Conference error: {0}")]
    Conference(#[from] ConferenceError),

    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Every attempt lost a write conflict.
    #[error("Transaction aborted after {attempts} attempts")]
    TransactionAborted { attempts: u32 },
}

impl DomainError {
    /// Whether this is a caller precondition failure rather than a fault.
    pub fn is_precondition(&self) -> bool {
        matches!(self, DomainError::Unauthorized | DomainError::ProfileNotFound)
    }
}
