//! # Vaultlink
//!
//! Client-side encryption for content-addressed storage.
//!
//! ## Overview
//!
//! Files are encrypted locally under a fresh AES-256-GCM key, the
//! ciphertext is stored in a storage location the user was delegated write
//! access to, and the key is released only to identities that were granted
//! decrypt access.
//!
//! - **Delegations**: Base64 CAR archives of signed capability chains
//! - **Upload**: encrypt, store, grant decrypt access to recipient identities
//! - **Download**: resolve, authorize an identity, decrypt, classify
//!
//! Both workflows are explicit state machines. One operation runs at a time
//! per workflow; a second one is rejected with `OperationInProgress`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vaultlink::{Clients, ClientConfig, UploadWorkflow};
//! use vaultlink::core::{IdentityRef, Keypair};
//! use vaultlink::perms::MemoryAuthorizer;
//! use vaultlink::store::MemoryStorage;
//!
//! async fn example(delegation: &str) {
//!     let config = ClientConfig::from_env();
//!     let agent = config.agent_keypair().unwrap();
//!     let authority = Keypair::generate();
//!
//!     let storage = Arc::new(MemoryStorage::new(agent.did(), authority.public_key()));
//!     let authorizer = Arc::new(MemoryAuthorizer::new(authority));
//!     let clients = Arc::new(Clients::from_parts(config, storage, authorizer));
//!
//!     let upload = UploadWorkflow::start(clients, vec![IdentityRef::new("pkp-primary")]).await;
//!     upload.submit_delegation(delegation).await.unwrap();
//!
//!     let result = upload.submit_file(&b"hello"[..]).await.unwrap();
//!     println!("{}", result.gateway_url());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `vaultlink::core` - CIDs, delegations, the envelope cipher, identities
//! - `vaultlink::store` - Storage service contract and local state
//! - `vaultlink::perms` - Decrypt grants and the authorization service

pub mod auth;
pub mod clients;
pub mod config;
pub mod download;
pub mod error;
pub mod loader;
pub mod session;
pub mod upload;

// Re-export component crates
pub use vaultlink_core as core;
pub use vaultlink_perms as perms;
pub use vaultlink_store as store;

// Re-export main types for convenience
pub use auth::AuthState;
pub use clients::{Clients, Lazy};
pub use config::{gateway_url, ClientConfig, DEFAULT_GATEWAY_HOST};
pub use download::{DecryptedObject, DownloadWorkflow};
pub use error::{ConfigError, ErrorKind, Result, WorkflowError};
pub use loader::DelegationLoader;
pub use session::{BusyFlag, DownloadPhase, Event, Phase, Session, UploadPhase};
pub use upload::{UploadResult, UploadWorkflow};

pub use vaultlink_core::{Cid, Classification, IdentityRef, IdentityRole, SigningIdentity};
