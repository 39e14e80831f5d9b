//! Error types for the store module.

use thiserror::Error;
use vaultlink_core::CoreError;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage service refused a delegation or a write it does not cover.
    #[error("unauthorized capability: {0}")]
    UnauthorizedCapability(String),

    /// Transport-level failure reaching the storage service.
    #[error("storage unreachable: {0}")]
    Unreachable(String),

    /// No object is stored under the CID.
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    /// A decryption credential was not accepted.
    #[error("credential rejected: {0}")]
    CredentialRejected(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
