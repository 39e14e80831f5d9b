//! Error types for the permissions module.

use thiserror::Error;

/// Errors from the identity/authorization collaborator.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The identity's credential was refused, or it holds no grant for the object.
    #[error("unauthorized identity: {0}")]
    UnauthorizedIdentity(String),

    /// Transport-level failure reaching the key-issuance service.
    #[error("authorization service unreachable: {0}")]
    Unreachable(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] vaultlink_core::CoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
