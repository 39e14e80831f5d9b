//! Access state: the set of decrypt grants an authority has registered.

use std::collections::HashMap;

use vaultlink_core::{Cid, IdentityRef};

use crate::grant::DecryptGrant;

/// Local identifier of a registered grant.
pub type GrantId = u64;

/// A registered grant.
#[derive(Debug, Clone)]
pub struct GrantState {
    pub id: GrantId,

    pub grant: DecryptGrant,

    /// When the grant was registered (Unix seconds).
    pub granted_at: u64,
}

/// Registered grants, indexed by recipient and object.
#[derive(Debug, Default)]
pub struct AccessState {
    next_id: GrantId,

    /// All grants indexed by ID.
    grants: HashMap<GrantId, GrantState>,

    /// Index: (recipient, object) -> grant ID.
    by_object: HashMap<(IdentityRef, Cid), GrantId>,
}

impl AccessState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a grant. Re-granting the same object replaces the earlier grant.
    pub fn apply_grant(&mut self, grant: DecryptGrant, now: u64) -> GrantId {
        let id = self.next_id;
        self.next_id += 1;

        let key = (grant.recipient.clone(), grant.cid);
        if let Some(previous) = self.by_object.insert(key, id) {
            self.grants.remove(&previous);
        }
        self.grants.insert(
            id,
            GrantState {
                id,
                grant,
                granted_at: now,
            },
        );

        id
    }

    /// The grant letting `recipient` decrypt `cid`, if any.
    pub fn find_decrypt_grant(&self, recipient: &IdentityRef, cid: &Cid) -> Option<GrantId> {
        self.by_object
            .get(&(recipient.clone(), *cid))
            .copied()
            .filter(|id| {
                self.grants
                    .get(id)
                    .map_or(false, |g| g.grant.covers(recipient, cid))
            })
    }

    pub fn can_decrypt(&self, recipient: &IdentityRef, cid: &Cid) -> bool {
        self.find_decrypt_grant(recipient, cid).is_some()
    }

    pub fn get_grant(&self, id: GrantId) -> Option<&GrantState> {
        self.grants.get(&id)
    }

    /// Number of live grants.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
