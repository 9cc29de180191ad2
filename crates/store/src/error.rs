//! The store's error type: every operation fails with exactly one of these.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Unknown event, incident, or field-report number.
    #[error("not found")]
    NotFound,

    /// A provided value failed validation (invalid enum, out-of-range
    /// priority, malformed location, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An import collided with an existing number, or an attach targeted an
    /// incident in a different event.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Underlying I/O or constraint failure; the transaction was rolled
    /// back, no partial write is observable. The detail is for logs only —
    /// callers must not echo it back to an external client.
    #[error("storage failure: {0}")]
    Io(String),
}

impl From<ims_core::DomainError> for StorageError {
    fn from(err: ims_core::DomainError) -> Self {
        match err {
            ims_core::DomainError::NotFound => StorageError::NotFound,
            ims_core::DomainError::Conflict(msg) => StorageError::Conflict(msg),
            other => StorageError::Validation(other.to_string()),
        }
    }
}
