//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a space, an agent, an
//! authorization authority and two registered identities, wired to the
//! in-memory collaborators.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use vaultlink::{ClientConfig, Clients};
use vaultlink_core::{
    now_seconds, DelegationBuilder, DelegationProof, IdentityRef, IdentityRole, IdentitySlots,
    Keypair, SigningIdentity,
};
use vaultlink_perms::MemoryAuthorizer;
use vaultlink_store::{MemoryStorage, StorageClient, BLOB_ADD};

/// Lifetime of fixture delegations, in seconds.
pub const DELEGATION_TTL: u64 = 3600;

/// A space owner, an agent and the collaborators both talk to.
pub struct TestFixture {
    pub space: Keypair,
    pub agent: Keypair,
    agent_seed: [u8; 32],
    pub storage: Arc<MemoryStorage>,
    pub authorizer: Arc<MemoryAuthorizer>,
    pub primary: SigningIdentity,
    pub recovery: SigningIdentity,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Deterministic keys derived from `seed`.
    pub fn with_seed(seed: u8) -> Self {
        let space = Keypair::from_seed(&[seed.wrapping_add(1); 32]);
        let agent_seed = [seed.wrapping_add(2); 32];
        let agent = Keypair::from_seed(&agent_seed);
        let authority = Keypair::from_seed(&[seed.wrapping_add(3); 32]);

        let storage = Arc::new(MemoryStorage::new(agent.did(), authority.public_key()));
        let authorizer = Arc::new(MemoryAuthorizer::new(authority));

        let primary = SigningIdentity::new(format!("pkp-primary-{}", seed), "session-primary");
        let recovery = SigningIdentity::new(format!("pkp-recovery-{}", seed), "session-recovery");
        authorizer.register_identity(&primary);
        authorizer.register_identity(&recovery);

        Self {
            space,
            agent,
            agent_seed,
            storage,
            authorizer,
            primary,
            recovery,
        }
    }

    /// Configuration with issuer credentials and the agent key set.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            issuer_api_key: Some("test-issuer-key".into()),
            agent_key: Some(hex::encode(self.agent_seed)),
            ..Default::default()
        }
    }

    /// Clients over this fixture's collaborators.
    pub fn clients(&self) -> Arc<Clients> {
        self.clients_with(self.config())
    }

    pub fn clients_with(&self, config: ClientConfig) -> Arc<Clients> {
        self.clients_over(config, self.storage.clone())
    }

    /// Clients over a wrapped storage client.
    pub fn clients_over(&self, config: ClientConfig, storage: Arc<dyn StorageClient>) -> Arc<Clients> {
        Arc::new(Clients::from_parts(config, storage, self.authorizer.clone()))
    }

    /// Both identity slots filled.
    pub fn identities(&self) -> IdentitySlots {
        let mut slots = IdentitySlots::default();
        slots.set(IdentityRole::Primary, self.primary.clone());
        slots.set(IdentityRole::Recovery, self.recovery.clone());
        slots
    }

    /// Upload recipients: the primary identity only.
    pub fn recipients(&self) -> Vec<IdentityRef> {
        vec![self.primary.identifier.clone()]
    }

    /// Space to agent, `space/blob/add`, valid for [`DELEGATION_TTL`].
    pub fn delegation(&self) -> DelegationProof {
        self.delegation_to(&self.agent, now_seconds() + DELEGATION_TTL)
    }

    pub fn delegation_to(&self, audience: &Keypair, expiration: u64) -> DelegationProof {
        DelegationBuilder::new(audience.did())
            .capability(self.space.did().to_string(), BLOB_ADD)
            .expiration(expiration)
            .sign(&self.space)
            .expect("fixture delegation signs")
    }

    pub fn delegation_base64(&self) -> String {
        encode_delegation(&self.delegation())
    }

    /// Expired a minute ago.
    pub fn expired_delegation_base64(&self) -> String {
        encode_delegation(&self.delegation_to(&self.agent, now_seconds() - 60))
    }

    /// Addressed to someone other than the agent.
    pub fn misaddressed_delegation_base64(&self) -> String {
        let stranger = Keypair::from_seed(&[0xee; 32]);
        encode_delegation(&self.delegation_to(&stranger, now_seconds() + DELEGATION_TTL))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Base64 CAR text, as pasted by a user.
pub fn encode_delegation(proof: &DelegationProof) -> String {
    STANDARD.encode(proof.archive().expect("fixture delegation archives"))
}

/// Create multiple fixtures with distinct keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count).map(|i| TestFixture::with_seed((i * 16) as u8)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultlink::DelegationLoader;

    #[test]
    fn test_delegation_parses() {
        let fixture = TestFixture::new();
        let proof = DelegationLoader::parse(&fixture.delegation_base64()).unwrap();

        assert_eq!(proof.audience(), &fixture.agent.did());
        assert!(proof.allows(&fixture.space.did().to_string(), BLOB_ADD));
        proof.verify(now_seconds()).unwrap();
    }

    #[test]
    fn test_config_agent_matches() {
        let fixture = TestFixture::new();
        let agent = fixture.config().agent_keypair().unwrap();
        assert_eq!(agent.did(), fixture.agent.did());
    }

    #[tokio::test]
    async fn test_expired_delegation_rejected_by_storage() {
        let fixture = TestFixture::new();
        let proof = DelegationLoader::parse(&fixture.expired_delegation_base64()).unwrap();
        assert!(fixture.storage.add_capability(&proof).await.is_err());
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        let agents: Vec<_> = parties.iter().map(|p| p.agent.did()).collect();
        assert_ne!(agents[0], agents[1]);
        assert_ne!(agents[1], agents[2]);
        assert_ne!(agents[0], agents[2]);
    }
}
