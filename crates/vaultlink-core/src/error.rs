//! Error types for Vaultlink Core.

use thiserror::Error;

/// Core errors raised by parsing, signing and cipher primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Input was empty or whitespace-only.
    #[error("empty input")]
    EmptyInput,

    /// Bytes are not a well-formed signed capability archive.
    #[error("malformed delegation: {0}")]
    MalformedDelegation(String),

    /// A delegation is well-formed but does not hold up (signature, time window, chain).
    #[error("invalid delegation: {0}")]
    InvalidDelegation(String),

    #[error("invalid CID: {0}")]
    InvalidCid(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    /// Credential rejected (wrong issuer, wrong object, expired).
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The platform RNG could not be reached.
    #[error("entropy source unavailable: {0}")]
    EntropySourceUnavailable(String),

    /// The cipher primitive rejected the key, IV or input length.
    #[error("cipher backend error: {0}")]
    CipherBackendError(String),

    /// The GCM tag did not verify: tampering, wrong key or wrong IV.
    #[error("authentication tag mismatch")]
    AuthenticationTagMismatch,

    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
