//! Persisted auth state: the user's signing identities across restarts.

use std::sync::Arc;

use tracing::{debug, info, warn};

use vaultlink_core::{IdentityRole, IdentitySlots, SigningIdentity};
use vaultlink_store::{LocalStore, Result, StoreError};

pub const PRIMARY_IDENTITY_KEY: &str = "identity.primary";
pub const RECOVERY_IDENTITY_KEY: &str = "identity.recovery";
pub const AUTHENTICATED_KEY: &str = "auth.authenticated";

fn slot_key(role: IdentityRole) -> &'static str {
    match role {
        IdentityRole::Primary => PRIMARY_IDENTITY_KEY,
        IdentityRole::Recovery => RECOVERY_IDENTITY_KEY,
    }
}

/// Cached identities backed by a [`LocalStore`].
pub struct AuthState {
    store: Arc<dyn LocalStore>,
    identities: IdentitySlots,
}

impl AuthState {
    /// Read both identity slots.
    pub async fn load(store: Arc<dyn LocalStore>) -> Result<Self> {
        let mut identities = IdentitySlots::default();
        for role in IdentityRole::ALL {
            if let Some(json) = store.get(slot_key(role)).await? {
                let identity: SigningIdentity = serde_json::from_str(&json)
                    .map_err(|e| StoreError::Serialization(format!("{}: {}", slot_key(role), e)))?;
                identities.set(role, identity);
            }
        }

        let state = Self { store, identities };
        debug!(authenticated = state.is_authenticated(), "auth state loaded");
        Ok(state)
    }

    /// True once a primary identity is stored.
    pub fn is_authenticated(&self) -> bool {
        self.identities.primary.is_some()
    }

    pub fn identities(&self) -> &IdentitySlots {
        &self.identities
    }

    pub fn identity(&self, role: IdentityRole) -> Option<&SigningIdentity> {
        self.identities.get(role)
    }

    /// Persist `identity` in slot `role`, replacing what was there.
    pub async fn store_identity(&mut self, role: IdentityRole, identity: SigningIdentity) -> Result<()> {
        let json = serde_json::to_string(&identity)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.put(slot_key(role), &json).await?;
        if role == IdentityRole::Primary {
            self.store.put(AUTHENTICATED_KEY, "true").await?;
        }

        info!(role = %role, identity = %identity.identifier, "identity stored");
        self.identities.set(role, identity);
        Ok(())
    }

    /// Forget every identity.
    pub async fn logout(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.identities = IdentitySlots::default();
        warn!("logged out, local state cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultlink_store::{MemoryLocalStore, SqliteLocalStore};

    #[tokio::test]
    async fn test_empty_store_is_logged_out() {
        let state = AuthState::load(Arc::new(MemoryLocalStore::new())).await.unwrap();
        assert!(!state.is_authenticated());
        assert!(state.identity(IdentityRole::Primary).is_none());
    }

    #[tokio::test]
    async fn test_store_and_reload() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let mut state = AuthState::load(store.clone()).await.unwrap();

        state
            .store_identity(IdentityRole::Recovery, SigningIdentity::new("pkp-r", "sig-r"))
            .await
            .unwrap();
        assert!(!state.is_authenticated());

        state
            .store_identity(IdentityRole::Primary, SigningIdentity::new("pkp-p", "sig-p"))
            .await
            .unwrap();
        assert!(state.is_authenticated());
        assert_eq!(store.get(AUTHENTICATED_KEY).await.unwrap().as_deref(), Some("true"));

        let reloaded = AuthState::load(store).await.unwrap();
        assert_eq!(reloaded.identities(), state.identities());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        let mut state = AuthState::load(store.clone()).await.unwrap();
        state
            .store_identity(IdentityRole::Primary, SigningIdentity::new("pkp-p", "sig-p"))
            .await
            .unwrap();

        state.logout().await.unwrap();
        assert!(!state.is_authenticated());
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_slot() {
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());
        store.put(PRIMARY_IDENTITY_KEY, "{not json").await.unwrap();

        let err = AuthState::load(store).await.err().unwrap();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");

        {
            let store: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::open(&path).unwrap());
            let mut state = AuthState::load(store).await.unwrap();
            state
                .store_identity(IdentityRole::Primary, SigningIdentity::new("pkp-p", "sig-p"))
                .await
                .unwrap();
        }

        let store: Arc<dyn LocalStore> = Arc::new(SqliteLocalStore::open(&path).unwrap());
        let state = AuthState::load(store).await.unwrap();
        assert!(state.is_authenticated());
        assert_eq!(
            state.identity(IdentityRole::Primary).unwrap().identifier.as_str(),
            "pkp-p"
        );
    }
}
