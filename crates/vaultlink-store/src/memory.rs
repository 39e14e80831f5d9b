//! In-memory implementations of the store traits.
//!
//! [`MemoryStorage`] enforces the same rules a real storage service would
//! (delegation checks, write capability, credential-gated envelopes) but
//! keeps everything in memory. [`MemoryLocalStore`] is the test double for
//! persisted state.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use vaultlink_core::{
    now_seconds, Cid, DecryptionCredential, DelegationProof, Did, Ed25519PublicKey,
    SymmetricEnvelope,
};

use crate::error::{Result, StoreError};
use crate::traits::{LocalStore, LocationRef, StorageClient, BLOB_ADD};

/// In-memory storage service.
///
/// Thread-safe via RwLock. `agent` is the principal delegations must be
/// addressed to; `authority` is the key whose decryption credentials unlock
/// envelopes.
pub struct MemoryStorage {
    agent: Did,
    authority: Ed25519PublicKey,
    online: AtomicBool,
    inner: RwLock<MemoryStorageInner>,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Registered delegations, by the location they grant on.
    proofs: HashMap<LocationRef, Vec<DelegationProof>>,

    /// Stored objects by CID.
    objects: HashMap<Cid, StoredObject>,
}

struct StoredObject {
    ciphertext: Bytes,
    envelope: SymmetricEnvelope,
    location: LocationRef,
}

impl MemoryStorage {
    /// Create an empty service.
    pub fn new(agent: Did, authority: Ed25519PublicKey) -> Self {
        Self {
            agent,
            authority,
            online: AtomicBool::new(true),
            inner: RwLock::new(MemoryStorageInner::default()),
        }
    }

    /// The principal this service expects delegations to be addressed to.
    pub fn agent(&self) -> &Did {
        &self.agent
    }

    /// Simulate a network partition. While offline every call fails with
    /// `Unreachable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of stored objects.
    pub fn object_count(&self) -> usize {
        self.read().objects.len()
    }

    /// Location an object was written to.
    pub fn location_of(&self, cid: &Cid) -> Option<LocationRef> {
        self.read().objects.get(cid).map(|o| o.location)
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unreachable("storage service offline".into()))
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryStorageInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryStorageInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// First resource in the delegation that names a storage location.
fn granted_location(proof: &DelegationProof) -> Option<LocationRef> {
    proof
        .resources()
        .find_map(|r| r.parse::<Did>().ok())
        .map(LocationRef)
}

#[async_trait]
impl StorageClient for MemoryStorage {
    async fn add_capability(&self, proof: &DelegationProof) -> Result<LocationRef> {
        self.ensure_online()?;

        proof
            .verify(now_seconds())
            .map_err(|e| StoreError::UnauthorizedCapability(e.to_string()))?;

        if proof.audience() != &self.agent {
            return Err(StoreError::UnauthorizedCapability(format!(
                "delegation is addressed to {}, this agent is {}",
                proof.audience(),
                self.agent
            )));
        }

        let location = granted_location(proof).ok_or_else(|| {
            StoreError::UnauthorizedCapability("delegation grants no storage location".into())
        })?;

        let mut inner = self.write();
        let proofs = inner.proofs.entry(location).or_default();
        if !proofs.iter().any(|p| p.cid() == proof.cid()) {
            proofs.push(proof.clone());
        }

        info!(location = %location, proof = %proof.cid(), "capability added");
        Ok(location)
    }

    async fn set_active_location(&self, location: &LocationRef) -> Result<()> {
        self.ensure_online()?;

        if self.read().proofs.contains_key(location) {
            debug!(location = %location, "location selected");
            Ok(())
        } else {
            Err(StoreError::UnauthorizedCapability(format!(
                "no capability registered for {}",
                location
            )))
        }
    }

    async fn put_encrypted_object(
        &self,
        location: &LocationRef,
        ciphertext: Bytes,
        envelope: &SymmetricEnvelope,
    ) -> Result<Cid> {
        self.ensure_online()?;

        let now = now_seconds();
        let resource = location.to_string();
        let mut inner = self.write();

        let authorized = inner.proofs.get(location).map_or(false, |proofs| {
            proofs
                .iter()
                .any(|p| p.allows(&resource, BLOB_ADD) && p.verify(now).is_ok())
        });
        if !authorized {
            return Err(StoreError::UnauthorizedCapability(format!(
                "no live {} capability on {}",
                BLOB_ADD, location
            )));
        }

        let cid = Cid::raw(&ciphertext);
        inner.objects.entry(cid).or_insert_with(|| StoredObject {
            ciphertext,
            envelope: envelope.clone(),
            location: *location,
        });

        info!(cid = %cid, location = %location, "object stored");
        Ok(cid)
    }

    async fn get_encrypted_object(&self, cid: &Cid) -> Result<Bytes> {
        self.ensure_online()?;

        self.read()
            .objects
            .get(cid)
            .map(|o| o.ciphertext.clone())
            .ok_or_else(|| StoreError::ObjectNotFound(cid.to_string()))
    }

    async fn open_envelope(
        &self,
        cid: &Cid,
        credential: &DecryptionCredential,
    ) -> Result<SymmetricEnvelope> {
        self.ensure_online()?;

        let inner = self.read();
        let object = inner
            .objects
            .get(cid)
            .ok_or_else(|| StoreError::ObjectNotFound(cid.to_string()))?;

        credential
            .verify(&self.authority, cid, now_seconds())
            .map_err(|e| StoreError::CredentialRejected(e.to_string()))?;

        debug!(cid = %cid, identity = %credential.identity, "envelope released");
        Ok(object.envelope.clone())
    }
}

/// In-memory local key-value store.
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultlink_core::{DelegationBuilder, EnvelopeCipher, IdentityRef, Keypair};

    struct Setup {
        space: Keypair,
        agent: Keypair,
        authority: Keypair,
        storage: MemoryStorage,
    }

    fn setup() -> Setup {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let authority = Keypair::from_seed(&[3; 32]);
        let storage = MemoryStorage::new(agent.did(), authority.public_key());
        Setup {
            space,
            agent,
            authority,
            storage,
        }
    }

    fn delegation(space: &Keypair, audience: Did, ability: &str) -> DelegationProof {
        DelegationBuilder::new(audience)
            .capability(space.did().to_string(), ability)
            .expiration(now_seconds() + 3600)
            .sign(space)
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_capability_returns_space() {
        let s = setup();
        let proof = delegation(&s.space, s.agent.did(), "space/*");

        let location = s.storage.add_capability(&proof).await.unwrap();
        assert_eq!(location, LocationRef(s.space.did()));
        s.storage.set_active_location(&location).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_misaddressed_delegation() {
        let s = setup();
        let proof = delegation(&s.space, Keypair::generate().did(), "space/*");

        let err = s.storage.add_capability(&proof).await.unwrap_err();
        assert!(matches!(err, StoreError::UnauthorizedCapability(_)));
    }

    #[tokio::test]
    async fn test_rejects_expired_delegation() {
        let s = setup();
        let proof = DelegationBuilder::new(s.agent.did())
            .capability(s.space.did().to_string(), "space/*")
            .expiration(1)
            .sign(&s.space)
            .unwrap();

        let err = s.storage.add_capability(&proof).await.unwrap_err();
        assert!(matches!(err, StoreError::UnauthorizedCapability(_)));
    }

    #[tokio::test]
    async fn test_unknown_location_cannot_be_selected() {
        let s = setup();
        let err = s
            .storage
            .set_active_location(&LocationRef(s.space.did()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnauthorizedCapability(_)));
    }

    #[tokio::test]
    async fn test_put_requires_write_capability() {
        let s = setup();
        let proof = delegation(&s.space, s.agent.did(), "upload/list");
        let location = s.storage.add_capability(&proof).await.unwrap();
        let envelope = EnvelopeCipher::new().generate_envelope().unwrap();

        let err = s
            .storage
            .put_encrypted_object(&location, Bytes::from_static(b"ct"), &envelope)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnauthorizedCapability(_)));
    }

    #[tokio::test]
    async fn test_put_get_and_open() {
        let s = setup();
        let proof = delegation(&s.space, s.agent.did(), "space/blob/add");
        let location = s.storage.add_capability(&proof).await.unwrap();
        let envelope = EnvelopeCipher::new().generate_envelope().unwrap();

        let cid = s
            .storage
            .put_encrypted_object(&location, Bytes::from_static(b"ciphertext"), &envelope)
            .await
            .unwrap();
        assert_eq!(cid, Cid::raw(b"ciphertext"));
        assert_eq!(s.storage.location_of(&cid), Some(location));

        let fetched = s.storage.get_encrypted_object(&cid).await.unwrap();
        assert_eq!(&fetched[..], b"ciphertext");

        let credential = DecryptionCredential::issue(
            &s.authority,
            IdentityRef::new("pkp-primary"),
            cid,
            now_seconds(),
            60,
        )
        .unwrap();
        let opened = s.storage.open_envelope(&cid, &credential).await.unwrap();
        assert_eq!(opened, envelope);
    }

    #[tokio::test]
    async fn test_open_envelope_rejects_foreign_credential() {
        let s = setup();
        let proof = delegation(&s.space, s.agent.did(), "space/*");
        let location = s.storage.add_capability(&proof).await.unwrap();
        let envelope = EnvelopeCipher::new().generate_envelope().unwrap();
        let cid = s
            .storage
            .put_encrypted_object(&location, Bytes::from_static(b"x"), &envelope)
            .await
            .unwrap();

        let rogue = Keypair::generate();
        let credential =
            DecryptionCredential::issue(&rogue, IdentityRef::new("p"), cid, now_seconds(), 60)
                .unwrap();
        let err = s.storage.open_envelope(&cid, &credential).await.unwrap_err();
        assert!(matches!(err, StoreError::CredentialRejected(_)));
    }

    #[tokio::test]
    async fn test_missing_object() {
        let s = setup();
        let err = s
            .storage
            .get_encrypted_object(&Cid::raw(b"nothing"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_offline() {
        let s = setup();
        s.storage.set_online(false);
        let proof = delegation(&s.space, s.agent.did(), "space/*");
        assert!(matches!(
            s.storage.add_capability(&proof).await,
            Err(StoreError::Unreachable(_))
        ));
        s.storage.set_online(true);
        assert!(s.storage.add_capability(&proof).await.is_ok());
    }

    #[tokio::test]
    async fn test_local_store() {
        let store = MemoryLocalStore::new();
        store.put("b", "2").await.unwrap();
        store.put("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);

        store.delete("a").await.unwrap();
        store.delete("missing").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }
}
