//! Upload workflow: bind a delegation, encrypt a file, store it, grant access.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{debug, info};

use vaultlink_core::{Cid, CoreError, IdentityRef};
use vaultlink_store::{LocationRef, StoreError};

use crate::clients::Clients;
use crate::config::gateway_url;
use crate::error::{Result, WorkflowError};
use crate::session::{Session, SessionCell, UploadPhase};

/// Outcome of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub cid: Cid,
    gateway_host: String,
}

impl UploadResult {
    /// Shareable gateway link for the stored ciphertext.
    pub fn gateway_url(&self) -> String {
        gateway_url(&self.gateway_host, &self.cid)
    }
}

/// Encrypts files and stores them under a bound delegation.
pub struct UploadWorkflow {
    clients: Arc<Clients>,
    recipients: Vec<IdentityRef>,
    cell: SessionCell<UploadPhase>,
}

impl UploadWorkflow {
    /// A workflow awaiting a delegation. `recipients` are granted decrypt
    /// access to every uploaded object.
    pub fn new(clients: Arc<Clients>, recipients: Vec<IdentityRef>) -> Self {
        Self {
            clients,
            recipients,
            cell: SessionCell::new("upload"),
        }
    }

    /// Like [`new`](Self::new), then bind the configured default delegation.
    ///
    /// A default that fails to bind leaves the workflow in `Failed` with the
    /// error recorded; interactive input is still accepted.
    pub async fn start(clients: Arc<Clients>, recipients: Vec<IdentityRef>) -> Self {
        let workflow = Self::new(clients, recipients);
        if let Some(default) = workflow.clients.config().default_delegation.clone() {
            debug!("binding default delegation");
            let _ = workflow.cell.load_delegation(&workflow.clients, &default).await;
        }
        workflow
    }

    pub fn phase(&self) -> UploadPhase {
        self.cell.phase()
    }

    pub fn session(&self) -> Session<UploadPhase> {
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

    /// Encrypt `file`, store it and grant the configured recipients access.
    pub async fn submit_file<R>(&self, file: R) -> Result<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        let _guard = self.cell.acquire()?;
        let (proof, location) = self.cell.start()?;
        debug!(location = %location, proof = %proof.cid(), "upload started");

        match self.run(file, &location).await {
            Ok(result) => {
                self.cell.succeed();
                info!(cid = %result.cid, "upload completed");
                Ok(result)
            }
            Err(err) => Err(self.cell.fail(err)),
        }
    }

    /// Leave `Completed` or `Failed`, keeping the bound delegation.
    pub fn reset(&self) -> Result<UploadPhase> {
        self.cell.reset()
    }

    async fn run<R>(&self, file: R, location: &LocationRef) -> Result<UploadResult>
    where
        R: AsyncRead + Unpin + Send,
    {
        let (envelope, ciphertext) = self
            .clients
            .cipher()
            .encrypt(file)
            .await
            .map_err(cipher_error)?;
        debug!(bytes = ciphertext.len(), "file encrypted");

        let storage = self
            .clients
            .storage()
            .await
            .map_err(|e| WorkflowError::UploadTransportError(e.to_string()))?;
        let cid = storage
            .put_encrypted_object(location, ciphertext, &envelope)
            .await
            .map_err(transport_error)?;
        drop(envelope);

        let authorizer = self
            .clients
            .authorizer()
            .await
            .map_err(|e| WorkflowError::EncryptionError(e.to_string()))?;
        authorizer
            .grant_decryption(&cid, &self.recipients)
            .await
            .map_err(|e| WorkflowError::EncryptionError(e.to_string()))?;

        Ok(UploadResult {
            cid,
            gateway_host: self.clients.config().gateway_host.clone(),
        })
    }
}

fn cipher_error(err: CoreError) -> WorkflowError {
    match err {
        CoreError::EntropySourceUnavailable(detail) => {
            WorkflowError::EntropySourceUnavailable(detail)
        }
        other => WorkflowError::EncryptionError(other.to_string()),
    }
}

fn transport_error(err: StoreError) -> WorkflowError {
    WorkflowError::UploadTransportError(err.to_string())
}
