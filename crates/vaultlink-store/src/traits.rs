//! Collaborator traits: the remote storage service and local key-value state.
//!
//! The storage service's wire protocol is not modelled here. Workflows only
//! see [`StorageClient`], so any backend (the in-memory one in this crate, or
//! a network client) can sit behind it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use vaultlink_core::{Cid, DecryptionCredential, DelegationProof, Did, SymmetricEnvelope};

use crate::error::Result;

/// Ability a delegation must carry to write into a location.
pub const BLOB_ADD: &str = "space/blob/add";

/// Handle to a storage location (a "space"), named by its DID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationRef(pub Did);

impl LocationRef {
    pub fn did(&self) -> &Did {
        &self.0
    }
}

impl fmt::Display for LocationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The content-addressed storage service.
///
/// Implementations are shared process-wide and must not keep per-session
/// mutable state: two workflows binding different locations on the same
/// client must not interfere.
#[async_trait]
pub trait StorageClient: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Capabilities
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a delegation with the service.
    ///
    /// Returns the location the delegation grants access to. Fails with
    /// `UnauthorizedCapability` if the chain does not verify, is outside its
    /// time window, is not addressed to this client's agent, or names no
    /// storage location.
    async fn add_capability(&self, proof: &DelegationProof) -> Result<LocationRef>;

    /// Select a location previously returned by [`add_capability`](Self::add_capability).
    async fn set_active_location(&self, location: &LocationRef) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Objects
    // ─────────────────────────────────────────────────────────────────────────

    /// Store ciphertext together with its envelope; returns the object's CID.
    async fn put_encrypted_object(
        &self,
        location: &LocationRef,
        ciphertext: Bytes,
        envelope: &SymmetricEnvelope,
    ) -> Result<Cid>;

    /// Fetch the ciphertext stored under `cid`.
    async fn get_encrypted_object(&self, cid: &Cid) -> Result<Bytes>;

    /// Release the envelope of `cid` to the holder of `credential`.
    async fn open_envelope(
        &self,
        cid: &Cid,
        credential: &DecryptionCredential,
    ) -> Result<SymmetricEnvelope>;
}

/// Persisted key-value state that survives restarts.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite.
    async fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// All keys, sorted.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Remove every key.
    async fn clear(&self) -> Result<()>;
}
