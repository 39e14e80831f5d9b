//! Decrypt grants.
//!
//! A grant says which identity may ask for decryption credentials for one
//! object. Grants are registered by the uploader right after the object is
//! stored.

use serde::{Deserialize, Serialize};

use vaultlink_core::{Cid, IdentityRef};

/// Permission for one identity to decrypt one object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecryptGrant {
    /// The identity being granted access.
    pub recipient: IdentityRef,

    /// The object it may decrypt.
    pub cid: Cid,
}

impl DecryptGrant {
    pub fn object(recipient: IdentityRef, cid: Cid) -> Self {
        Self { recipient, cid }
    }

    pub fn covers(&self, recipient: &IdentityRef, cid: &Cid) -> bool {
        &self.recipient == recipient && &self.cid == cid
    }
}
