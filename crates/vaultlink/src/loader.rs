//! Delegation loading: text to proof, proof to bound storage location.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};

use vaultlink_core::{CoreError, DelegationProof};
use vaultlink_store::{LocationRef, StorageClient, StoreError};

use crate::error::{Result, WorkflowError};

/// Parses serialized delegations and registers them with storage.
pub struct DelegationLoader;

impl DelegationLoader {
    /// Decode a Base64 CAR delegation.
    ///
    /// Surrounding whitespace is ignored. Only structure is checked here;
    /// signatures and time bounds are the storage service's concern.
    pub fn parse(serialized: &str) -> Result<DelegationProof> {
        let trimmed = serialized.trim();
        if trimmed.is_empty() {
            return Err(WorkflowError::EmptyInput(
                "paste a delegation to continue".into(),
            ));
        }

        let bytes = STANDARD
            .decode(trimmed)
            .map_err(|e| WorkflowError::MalformedDelegation(format!("not base64: {}", e)))?;

        let proof = DelegationProof::from_archive(&bytes).map_err(|e| match e {
            CoreError::EmptyInput => WorkflowError::EmptyInput("delegation archive is empty".into()),
            other => WorkflowError::MalformedDelegation(other.to_string()),
        })?;

        debug!(
            cid = %proof.cid(),
            issuer = %proof.issuer(),
            chain = proof.proofs().len(),
            "delegation parsed"
        );
        Ok(proof)
    }

    /// Register `proof` with storage and make its location active.
    pub async fn bind(proof: &DelegationProof, storage: &dyn StorageClient) -> Result<LocationRef> {
        let location = storage
            .add_capability(proof)
            .await
            .map_err(bind_error)?;
        storage
            .set_active_location(&location)
            .await
            .map_err(bind_error)?;

        info!(location = %location, cid = %proof.cid(), "delegation bound");
        Ok(location)
    }
}

fn bind_error(err: StoreError) -> WorkflowError {
    warn!(error = %err, "delegation bind failed");
    match err {
        StoreError::Unreachable(detail) => WorkflowError::StorageUnreachable(detail),
        StoreError::Io(e) => WorkflowError::StorageUnreachable(e.to_string()),
        other => WorkflowError::UnauthorizedCapability(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultlink_core::{now_seconds, DelegationBuilder, Ed25519PublicKey, Keypair};
    use vaultlink_store::{MemoryStorage, BLOB_ADD};

    fn encoded(proof: &DelegationProof) -> String {
        STANDARD.encode(proof.archive().unwrap())
    }

    fn delegation(space: &Keypair, agent: &Keypair, exp: u64) -> DelegationProof {
        DelegationBuilder::new(agent.did())
            .capability(space.did().to_string(), BLOB_ADD)
            .expiration(exp)
            .sign(space)
            .unwrap()
    }

    fn storage(agent: &Keypair) -> MemoryStorage {
        MemoryStorage::new(agent.did(), Ed25519PublicKey::from([0u8; 32]))
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(DelegationLoader::parse(""), Err(WorkflowError::EmptyInput(_))));
        assert!(matches!(
            DelegationLoader::parse("  \n\t "),
            Err(WorkflowError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            DelegationLoader::parse("not base64 !!"),
            Err(WorkflowError::MalformedDelegation(_))
        ));
        // Valid base64, not a CAR.
        assert!(matches!(
            DelegationLoader::parse(&STANDARD.encode(b"hello world")),
            Err(WorkflowError::MalformedDelegation(_))
        ));
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = delegation(&space, &agent, now_seconds() + 3600);

        let parsed = DelegationLoader::parse(&format!("\n  {}  \n", encoded(&proof))).unwrap();
        assert_eq!(parsed.cid(), proof.cid());
    }

    #[tokio::test]
    async fn test_bind_returns_space() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = delegation(&space, &agent, now_seconds() + 3600);

        let location = DelegationLoader::bind(&proof, &storage(&agent)).await.unwrap();
        assert_eq!(location.did(), &space.did());
    }

    #[tokio::test]
    async fn test_bind_rejects_expired() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = delegation(&space, &agent, now_seconds() - 10);

        let err = DelegationLoader::bind(&proof, &storage(&agent)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnauthorizedCapability(_)));
    }

    #[tokio::test]
    async fn test_bind_rejects_wrong_audience() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let stranger = Keypair::from_seed(&[3; 32]);
        let proof = delegation(&space, &stranger, now_seconds() + 3600);

        let err = DelegationLoader::bind(&proof, &storage(&agent)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnauthorizedCapability(_)));
    }

    #[tokio::test]
    async fn test_bind_unreachable() {
        let space = Keypair::from_seed(&[1; 32]);
        let agent = Keypair::from_seed(&[2; 32]);
        let proof = delegation(&space, &agent, now_seconds() + 3600);
        let storage = storage(&agent);
        storage.set_online(false);

        let err = DelegationLoader::bind(&proof, &storage).await.unwrap_err();
        assert!(matches!(err, WorkflowError::StorageUnreachable(_)));
    }
}
