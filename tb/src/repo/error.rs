//! Repository error types

use thiserror::Error;

/// Errors from repository operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Conflict { kind: &'static str, id: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepoError {
    /// Check if this is a missing-row error
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepoError::NotFound { .. })
    }
}

/// Result of repository operations
pub type RepoResult<T> = Result<T, RepoError>;
