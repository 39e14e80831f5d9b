//! Signing identities.
//!
//! An authenticated user holds two identities, primary and recovery. Either
//! may be chosen at decrypt time; nothing about the choice is stored with
//! the object.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Which of the two identity slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityRole {
    Primary,
    Recovery,
}

impl IdentityRole {
    pub const ALL: [IdentityRole; 2] = [IdentityRole::Primary, IdentityRole::Recovery];

    pub fn as_str(self) -> &'static str {
        match self {
            IdentityRole::Primary => "primary",
            IdentityRole::Recovery => "recovery",
        }
    }

    /// The alternate slot, for retrying after a failure.
    pub fn other(self) -> Self {
        match self {
            IdentityRole::Primary => IdentityRole::Recovery,
            IdentityRole::Recovery => IdentityRole::Primary,
        }
    }
}

impl fmt::Display for IdentityRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, CoreError> {
        match s {
            "primary" => Ok(IdentityRole::Primary),
            "recovery" => Ok(IdentityRole::Recovery),
            other => Err(CoreError::EncodingError(format!(
                "identity must be 'primary' or 'recovery', got '{}'",
                other
            ))),
        }
    }
}

/// Opaque reference to a key held by the key-issuance service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityRef(pub String);

impl IdentityRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque credential proving the holder controls an identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthProof(String);

impl AuthProof {
    pub fn new(proof: impl Into<String>) -> Self {
        Self(proof.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthProof(<redacted>)")
    }
}

/// A key reference together with its authorization credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    pub identifier: IdentityRef,
    pub auth_proof: AuthProof,
}

impl SigningIdentity {
    pub fn new(identifier: impl Into<String>, auth_proof: impl Into<String>) -> Self {
        Self {
            identifier: IdentityRef::new(identifier),
            auth_proof: AuthProof::new(auth_proof),
        }
    }
}

/// The two identity slots of an authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySlots {
    pub primary: Option<SigningIdentity>,
    pub recovery: Option<SigningIdentity>,
}

impl IdentitySlots {
    pub fn get(&self, role: IdentityRole) -> Option<&SigningIdentity> {
        match role {
            IdentityRole::Primary => self.primary.as_ref(),
            IdentityRole::Recovery => self.recovery.as_ref(),
        }
    }

    pub fn set(&mut self, role: IdentityRole, identity: SigningIdentity) {
        match role {
            IdentityRole::Primary => self.primary = Some(identity),
            IdentityRole::Recovery => self.recovery = Some(identity),
        }
    }

    /// Identifiers of every filled slot.
    pub fn refs(&self) -> Vec<IdentityRef> {
        IdentityRole::ALL
            .iter()
            .filter_map(|r| self.get(*r))
            .map(|i| i.identifier.clone())
            .collect()
    }
}
