//! A storage client whose writes block until released.
//!
//! Lets a test hold an upload inside `Uploading` and probe the workflow
//! while it is busy.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use vaultlink_core::{Cid, DecryptionCredential, DelegationProof, SymmetricEnvelope};
use vaultlink_store::{LocationRef, Result, StorageClient};

pub struct GatedStorage {
    inner: Arc<dyn StorageClient>,
    entered: Notify,
    release: Notify,
}

impl GatedStorage {
    pub fn new(inner: Arc<dyn StorageClient>) -> Self {
        Self {
            inner,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Resolves once a write is parked at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one parked (or the next) write through.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[async_trait]
impl StorageClient for GatedStorage {
    async fn add_capability(&self, proof: &DelegationProof) -> Result<LocationRef> {
        self.inner.add_capability(proof).await
    }

    async fn set_active_location(&self, location: &LocationRef) -> Result<()> {
        self.inner.set_active_location(location).await
    }

    async fn put_encrypted_object(
        &self,
        location: &LocationRef,
        ciphertext: Bytes,
        envelope: &SymmetricEnvelope,
    ) -> Result<Cid> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner
            .put_encrypted_object(location, ciphertext, envelope)
            .await
    }

    async fn get_encrypted_object(&self, cid: &Cid) -> Result<Bytes> {
        self.inner.get_encrypted_object(cid).await
    }

    async fn open_envelope(
        &self,
        cid: &Cid,
        credential: &DecryptionCredential,
    ) -> Result<SymmetricEnvelope> {
        self.inner.open_envelope(cid, credential).await
    }
}
