//! The identity/authorization collaborator.
//!
//! Turns a signing identity plus an object CID into a short-lived
//! [`DecryptionCredential`], if that identity holds a grant for the object.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use vaultlink_core::{
    now_seconds, AuthProof, Cid, DecryptionCredential, Ed25519PublicKey, IdentityRef, Keypair,
    SigningIdentity,
};

use crate::error::{AuthzError, Result};
use crate::grant::DecryptGrant;
use crate::state::AccessState;

/// Default lifetime of an issued credential, in seconds.
pub const DEFAULT_CREDENTIAL_TTL: u64 = 300;

/// Authorization service contract.
#[async_trait]
pub trait DecryptionAuthorizer: Send + Sync {
    /// Exchange an identity's auth proof for a credential to decrypt `cid`.
    ///
    /// Fails with `UnauthorizedIdentity` if the auth proof is refused or the
    /// identity holds no live grant for the object.
    async fn authorize_decryption(
        &self,
        identity: &SigningIdentity,
        cid: &Cid,
    ) -> Result<DecryptionCredential>;

    /// Let each of `identities` decrypt `cid`.
    async fn grant_decryption(&self, cid: &Cid, identities: &[IdentityRef]) -> Result<()>;
}

/// In-process authorization service.
///
/// Holds the authority key credentials are signed with, the auth proofs it
/// accepts per identity, and the grant table.
pub struct MemoryAuthorizer {
    authority: Keypair,
    credential_ttl: u64,
    online: AtomicBool,
    sessions: RwLock<HashMap<IdentityRef, AuthProof>>,
    state: RwLock<AccessState>,
}

impl MemoryAuthorizer {
    pub fn new(authority: Keypair) -> Self {
        Self {
            authority,
            credential_ttl: DEFAULT_CREDENTIAL_TTL,
            online: AtomicBool::new(true),
            sessions: RwLock::new(HashMap::new()),
            state: RwLock::new(AccessState::new()),
        }
    }

    /// Override the credential lifetime.
    pub fn with_credential_ttl(mut self, ttl: u64) -> Self {
        self.credential_ttl = ttl;
        self
    }

    /// Public key storage services should trust credentials from.
    pub fn authority_key(&self) -> Ed25519PublicKey {
        self.authority.public_key()
    }

    /// Accept `identity`'s auth proof from now on.
    pub fn register_identity(&self, identity: &SigningIdentity) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(identity.identifier.clone(), identity.auth_proof.clone());
        debug!(identity = %identity.identifier, "identity registered");
    }

    /// Whether `identity` could currently decrypt `cid`.
    pub fn can_decrypt(&self, identity: &IdentityRef, cid: &Cid) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.can_decrypt(identity, cid)
    }

    /// Simulate a network partition.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AuthzError::Unreachable("authorization service offline".into()))
        }
    }
}

#[async_trait]
impl DecryptionAuthorizer for MemoryAuthorizer {
    async fn authorize_decryption(
        &self,
        identity: &SigningIdentity,
        cid: &Cid,
    ) -> Result<DecryptionCredential> {
        self.ensure_online()?;

        let accepted = {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            sessions.get(&identity.identifier) == Some(&identity.auth_proof)
        };
        if !accepted {
            warn!(identity = %identity.identifier, "auth proof refused");
            return Err(AuthzError::UnauthorizedIdentity(format!(
                "auth proof for {} not accepted",
                identity.identifier
            )));
        }

        if !self.can_decrypt(&identity.identifier, cid) {
            return Err(AuthzError::UnauthorizedIdentity(format!(
                "{} may not decrypt {}",
                identity.identifier, cid
            )));
        }

        let now = now_seconds();

        let credential = DecryptionCredential::issue(
            &self.authority,
            identity.identifier.clone(),
            *cid,
            now,
            self.credential_ttl,
        )?;

        info!(identity = %identity.identifier, cid = %cid, "decryption authorized");
        Ok(credential)
    }

    async fn grant_decryption(&self, cid: &Cid, identities: &[IdentityRef]) -> Result<()> {
        self.ensure_online()?;

        let now = now_seconds();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        for identity in identities {
            state.apply_grant(DecryptGrant::object(identity.clone(), *cid), now);
        }

        info!(cid = %cid, recipients = identities.len(), "decryption granted");
        Ok(())
    }
}
