//! Download workflow: resolve a CID, authorize an identity, decrypt, classify.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use vaultlink_core::{
    Cid, Classification, ContentSniffer, CoreError, IdentityRole, IdentitySlots, Sniffed,
};
use vaultlink_perms::AuthzError;
use vaultlink_store::{LocationRef, StoreError};

use crate::clients::Clients;
use crate::error::{Result, WorkflowError};
use crate::session::{DownloadPhase, Session, SessionCell};

/// A decrypted object and its display classification.
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedObject {
    pub cid: Cid,
    pub bytes: Bytes,
    pub content: Sniffed,
}

impl DecryptedObject {
    pub fn classification(&self) -> Classification {
        self.content.classification()
    }

    /// Decoded text, for `Text` content only.
    pub fn as_text(&self) -> Option<&str> {
        self.content.as_text()
    }
}

impl fmt::Debug for DecryptedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedObject")
            .field("cid", &self.cid)
            .field("len", &self.bytes.len())
            .field("classification", &self.classification())
            .finish()
    }
}

/// Fetches and decrypts objects on behalf of a chosen identity.
pub struct DownloadWorkflow {
    clients: Arc<Clients>,
    identities: IdentitySlots,
    sniffer: ContentSniffer,
    cell: SessionCell<DownloadPhase>,
}

impl DownloadWorkflow {
    pub fn new(clients: Arc<Clients>, identities: IdentitySlots) -> Self {
        Self {
            clients,
            identities,
            sniffer: ContentSniffer::new(),
            cell: SessionCell::new("download"),
        }
    }

    /// Like [`new`](Self::new), then bind the configured default delegation.
    pub async fn start(clients: Arc<Clients>, identities: IdentitySlots) -> Self {
        let workflow = Self::new(clients, identities);
        if let Some(default) = workflow.clients.config().default_delegation.clone() {
            debug!("binding default delegation");
            let _ = workflow.cell.load_delegation(&workflow.clients, &default).await;
        }
        workflow
    }

    pub fn with_sniffer(mut self, sniffer: ContentSniffer) -> Self {
        self.sniffer = sniffer;
        self
    }

    pub fn phase(&self) -> DownloadPhase {
        self.cell.phase()
    }

    pub fn session(&self) -> Session<DownloadPhase> {
        self.cell.snapshot()
    }

    pub fn last_error(&self) -> Option<WorkflowError> {
        self.cell.last_error()
    }

    pub fn is_busy(&self) -> bool {
        self.cell.is_busy()
    }

    /// Parse and bind a Base64 CAR delegation.
    pub async fn submit_delegation(&self, serialized: &str) -> Result<LocationRef> {
        self.cell.load_delegation(&self.clients, serialized).await
    }

    /// Decrypt the object at `cid` as the identity in slot `role`.
    ///
    /// After a failure the same call may be repeated with the other role;
    /// the bound delegation is kept.
    pub async fn decrypt(&self, cid: &str, role: IdentityRole) -> Result<DecryptedObject> {
        let _guard = self.cell.acquire()?;
        let (_, location) = self.cell.start()?;
        debug!(location = %location, role = %role, "download started");

        match self.run(cid, role).await {
            Ok(object) => {
                self.cell.succeed();
                info!(
                    cid = %object.cid,
                    role = %role,
                    classification = ?object.classification(),
                    "download completed"
                );
                Ok(object)
            }
            Err(err) => Err(self.cell.fail(err)),
        }
    }

    /// Leave `Completed` or `Failed`, keeping the bound delegation.
    pub fn reset(&self) -> Result<DownloadPhase> {
        self.cell.reset()
    }

    async fn run(&self, cid: &str, role: IdentityRole) -> Result<DecryptedObject> {
        let cid: Cid = cid
            .trim()
            .parse()
            .map_err(|e: CoreError| WorkflowError::ObjectNotFound(format!("{}: {}", cid, e)))?;

        let identity = self.identities.get(role).ok_or_else(|| {
            WorkflowError::UnauthorizedIdentity(format!("no {} identity configured", role))
        })?;

        let storage = self
            .clients
            .storage()
            .await
            .map_err(|e| WorkflowError::StorageUnreachable(e.to_string()))?;
        let ciphertext = storage
            .get_encrypted_object(&cid)
            .await
            .map_err(storage_error)?;

        let authorizer = self
            .clients
            .authorizer()
            .await
            .map_err(|e| WorkflowError::UnauthorizedIdentity(e.to_string()))?;
        let credential = authorizer
            .authorize_decryption(identity, &cid)
            .await
            .map_err(authz_error)?;

        let envelope = storage
            .open_envelope(&cid, &credential)
            .await
            .map_err(storage_error)?;

        let bytes = self
            .clients
            .cipher()
            .decrypt(&ciphertext[..], &envelope)
            .await
            .map_err(decrypt_error)?;
        drop(envelope);

        let content = self.sniffer.classify(&bytes);
        Ok(DecryptedObject {
            cid,
            bytes,
            content,
        })
    }
}

fn storage_error(err: StoreError) -> WorkflowError {
    match err {
        StoreError::ObjectNotFound(detail) => WorkflowError::ObjectNotFound(detail),
        StoreError::CredentialRejected(detail) => WorkflowError::UnauthorizedIdentity(detail),
        StoreError::Unreachable(detail) => WorkflowError::StorageUnreachable(detail),
        other => WorkflowError::StorageUnreachable(other.to_string()),
    }
}

fn authz_error(err: AuthzError) -> WorkflowError {
    match err {
        AuthzError::UnauthorizedIdentity(detail) => WorkflowError::UnauthorizedIdentity(detail),
        other => WorkflowError::UnauthorizedIdentity(other.to_string()),
    }
}

fn decrypt_error(err: CoreError) -> WorkflowError {
    match err {
        CoreError::AuthenticationTagMismatch => WorkflowError::AuthenticationTagMismatch,
        CoreError::CipherBackendError(detail) => WorkflowError::CipherBackendError(detail),
        other => WorkflowError::CipherBackendError(other.to_string()),
    }
}
