//! Error types for the workflows.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Discriminant of a [`WorkflowError`], stored in `Failed(..)` phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedDelegation,
    EmptyInput,
    UnauthorizedCapability,
    StorageUnreachable,
    EntropySourceUnavailable,
    CipherBackendError,
    AuthenticationTagMismatch,
    ObjectNotFound,
    UnauthorizedIdentity,
    OperationInProgress,
    EncryptionError,
    UploadTransportError,
    NotReady,
}

impl ErrorKind {
    /// Whether this error moves the session to `Failed`.
    ///
    /// `OperationInProgress` and `NotReady` reject an event without touching
    /// the session.
    pub fn transitions(self) -> bool {
        !matches!(self, ErrorKind::OperationInProgress | ErrorKind::NotReady)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Errors surfaced at the workflow boundary.
///
/// Each variant carries a human-readable detail for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("The delegation could not be read: {0}")]
    MalformedDelegation(String),

    #[error("No delegation was provided: {0}")]
    EmptyInput(String),

    #[error("The storage service rejected the delegation: {0}")]
    UnauthorizedCapability(String),

    #[error("The storage service could not be reached: {0}")]
    StorageUnreachable(String),

    #[error("No secure random source is available: {0}")]
    EntropySourceUnavailable(String),

    #[error("The cipher failed: {0}")]
    CipherBackendError(String),

    /// Tampered ciphertext, wrong key or wrong IV. Terminal for the attempt.
    #[error("Decryption failed: the data was modified or the key is wrong")]
    AuthenticationTagMismatch,

    #[error("No object found for {0}")]
    ObjectNotFound(String),

    #[error("This identity may not decrypt the object: {0}")]
    UnauthorizedIdentity(String),

    #[error("Another operation is already running: {0}")]
    OperationInProgress(String),

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Upload failed: {0}")]
    UploadTransportError(String),

    /// The event is not accepted in the current phase.
    #[error("Not ready: {0}")]
    NotReady(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::MalformedDelegation(_) => ErrorKind::MalformedDelegation,
            WorkflowError::EmptyInput(_) => ErrorKind::EmptyInput,
            WorkflowError::UnauthorizedCapability(_) => ErrorKind::UnauthorizedCapability,
            WorkflowError::StorageUnreachable(_) => ErrorKind::StorageUnreachable,
            WorkflowError::EntropySourceUnavailable(_) => ErrorKind::EntropySourceUnavailable,
            WorkflowError::CipherBackendError(_) => ErrorKind::CipherBackendError,
            WorkflowError::AuthenticationTagMismatch => ErrorKind::AuthenticationTagMismatch,
            WorkflowError::ObjectNotFound(_) => ErrorKind::ObjectNotFound,
            WorkflowError::UnauthorizedIdentity(_) => ErrorKind::UnauthorizedIdentity,
            WorkflowError::OperationInProgress(_) => ErrorKind::OperationInProgress,
            WorkflowError::EncryptionError(_) => ErrorKind::EncryptionError,
            WorkflowError::UploadTransportError(_) => ErrorKind::UploadTransportError,
            WorkflowError::NotReady(_) => ErrorKind::NotReady,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setting needed by the requested operation is absent.
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration for {field}: {detail}")]
    Invalid { field: &'static str, detail: String },

    #[error("could not parse configuration JSON: {0}")]
    Json(String),

    /// A lazily built client failed to construct.
    #[error("client initialization failed: {0}")]
    Client(String),
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;
