//! Decryption credentials.
//!
//! The authorization service issues a short-lived credential binding one
//! identity to one object. The storage side releases an object's envelope
//! only to a holder of a credential it can verify.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};

use crate::canonical::encode_canonical;
use crate::cid::Cid;
use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::{CoreError, Result};
use crate::identity::IdentityRef;

/// A signed statement that `identity` may decrypt `cid` until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCredential {
    pub identity: IdentityRef,
    pub cid: Cid,
    /// Unix seconds.
    pub issued_at: u64,
    /// Unix seconds, exclusive.
    pub expires_at: u64,
    pub issuer: Ed25519PublicKey,
    pub signature: Ed25519Signature,
}

impl DecryptionCredential {
    /// Issue and sign a credential valid for `ttl` seconds from `now`.
    pub fn issue(
        authority: &Keypair,
        identity: IdentityRef,
        cid: Cid,
        now: u64,
        ttl: u64,
    ) -> Result<Self> {
        let issuer = authority.public_key();
        let expires_at = now.saturating_add(ttl);
        let message = signing_payload(&identity, &cid, now, expires_at, &issuer)?;
        let signature = authority.sign(&message);

        Ok(Self {
            identity,
            cid,
            issued_at: now,
            expires_at,
            issuer,
            signature,
        })
    }

    /// Check that the credential was signed by `trusted`, names `cid`, and is
    /// live at `now`.
    pub fn verify(&self, trusted: &Ed25519PublicKey, cid: &Cid, now: u64) -> Result<()> {
        if &self.issuer != trusted {
            return Err(CoreError::InvalidCredential("untrusted issuer".into()));
        }
        if &self.cid != cid {
            return Err(CoreError::InvalidCredential(format!(
                "issued for {}, presented for {}",
                self.cid, cid
            )));
        }
        if now < self.issued_at || now >= self.expires_at {
            return Err(CoreError::InvalidCredential("expired".into()));
        }

        let message = signing_payload(
            &self.identity,
            &self.cid,
            self.issued_at,
            self.expires_at,
            &self.issuer,
        )?;
        self.issuer
            .verify(&message, &self.signature)
            .map_err(|_| CoreError::InvalidCredential("bad signature".into()))
    }
}

fn signing_payload(
    identity: &IdentityRef,
    cid: &Cid,
    issued_at: u64,
    expires_at: u64,
    issuer: &Ed25519PublicKey,
) -> Result<Vec<u8>> {
    encode_canonical(&Value::Map(vec![
        (Value::Text("sub".into()), Value::Text(identity.0.clone())),
        (Value::Text("cid".into()), Value::Bytes(cid.to_bytes())),
        (Value::Text("iat".into()), Value::Integer(issued_at.into())),
        (Value::Text("exp".into()), Value::Integer(expires_at.into())),
        (Value::Text("iss".into()), Value::Bytes(issuer.0.to_vec())),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_736_870_400;

    fn issue() -> (Keypair, DecryptionCredential) {
        let authority = Keypair::from_seed(&[5; 32]);
        let cred = DecryptionCredential::issue(
            &authority,
            IdentityRef::new("pkp-primary"),
            Cid::raw(b"object"),
            NOW,
            60,
        )
        .unwrap();
        (authority, cred)
    }

    #[test]
    fn test_issue_verify() {
        let (authority, cred) = issue();
        assert!(cred.verify(&authority.public_key(), &Cid::raw(b"object"), NOW + 59).is_ok());
    }

    #[test]
    fn test_rejections() {
        let (authority, cred) = issue();
        let pk = authority.public_key();
        let cid = Cid::raw(b"object");

        assert!(cred.verify(&Keypair::generate().public_key(), &cid, NOW).is_err());
        assert!(cred.verify(&pk, &Cid::raw(b"other"), NOW).is_err());
        assert!(cred.verify(&pk, &cid, NOW + 60).is_err());
        assert!(cred.verify(&pk, &cid, NOW - 1).is_err());

        let mut forged = cred.clone();
        forged.identity = IdentityRef::new("pkp-recovery");
        assert_eq!(
            forged.verify(&pk, &cid, NOW),
            Err(CoreError::InvalidCredential("bad signature".into()))
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let (_, cred) = issue();
        let json = serde_json::to_string(&cred).unwrap();
        let back: DecryptionCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }
}
