//! # Vaultlink Core
//!
//! Pure primitives for Vaultlink: content identifiers, delegation archives,
//! envelope encryption and content sniffing.
//!
//! This crate contains no storage and no networking. The only I/O is reading
//! a caller-supplied stream in [`EnvelopeCipher`].
//!
//! ## Key Types
//!
//! - [`Cid`] - Content identifier (CIDv1, sha2-256)
//! - [`DelegationProof`] - A parsed capability delegation and its proof chain
//! - [`EnvelopeCipher`] / [`SymmetricEnvelope`] - One-time AES-256-GCM encryption
//! - [`ContentSniffer`] - Text-or-binary classification of recovered bytes
//! - [`SigningIdentity`] - Primary or recovery key holder
//!
//! ## Canonicalization
//!
//! Delegation blocks and credentials are signed over deterministic dag-cbor.
//! See the [`canonical`] module.

pub mod canonical;
pub mod car;
pub mod cid;
pub mod credential;
pub mod crypto;
pub mod delegation;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod sniff;

pub use car::{Block, CarArchive};
pub use cid::Cid;
pub use credential::DecryptionCredential;
pub use crypto::{Did, Ed25519PublicKey, Ed25519Signature, Keypair};
pub use delegation::{now_seconds, Capability, DelegationBuilder, DelegationProof};
pub use envelope::{EnvelopeCipher, SymmetricEnvelope};
pub use error::{CoreError, Result};
pub use identity::{AuthProof, IdentityRef, IdentityRole, IdentitySlots, SigningIdentity};
pub use sniff::{Classification, ContentSniffer, Sniffed};
