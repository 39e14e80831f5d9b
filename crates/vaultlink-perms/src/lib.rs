//! # Vaultlink Permissions
//!
//! Decrypt grants and the authorization service that turns them into
//! credentials.
//!
//! ## Overview
//!
//! Ciphertext is addressable by anyone who knows its CID. What gates
//! decryption is the envelope, and the storage service only releases it
//! against a [`DecryptionCredential`](vaultlink_core::DecryptionCredential).
//! This crate decides who gets one.
//!
//! ## Key Concepts
//!
//! - **Grant**: registered by the uploader for each recipient identity
//! - **Credential**: signed by the authority, bound to one identity and one CID
//! - **Primary / recovery**: two identities of the same user, granted separately
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultlink_core::{Cid, Keypair, SigningIdentity};
//! use vaultlink_perms::{DecryptionAuthorizer, MemoryAuthorizer};
//!
//! async fn example() {
//!     let authz = MemoryAuthorizer::new(Keypair::generate());
//!     let primary = SigningIdentity::new("pkp-primary", "session-sig");
//!     authz.register_identity(&primary);
//!
//!     let cid = Cid::raw(b"ciphertext");
//!     authz.grant_decryption(&cid, &[primary.identifier.clone()]).await.unwrap();
//!     let _credential = authz.authorize_decryption(&primary, &cid).await.unwrap();
//! }
//! ```

pub mod authorizer;
pub mod error;
pub mod grant;
pub mod state;

pub use authorizer::{DecryptionAuthorizer, MemoryAuthorizer, DEFAULT_CREDENTIAL_TTL};
pub use error::{AuthzError, Result};
pub use grant::DecryptGrant;
pub use state::{AccessState, GrantId, GrantState};
