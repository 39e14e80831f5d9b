//! # Vaultlink Store
//!
//! Collaborator interfaces for Vaultlink's storage side, plus the
//! implementations used in process.
//!
//! ## Key Types
//!
//! - [`StorageClient`] - The content-addressed storage service
//! - [`MemoryStorage`] - In-memory storage service with delegation checks
//! - [`LocalStore`] - Persisted key-value state (identities, auth flag)
//! - [`SqliteLocalStore`] - SQLite-backed local state
//! - [`MemoryLocalStore`] - In-memory local state for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vaultlink_store::{LocalStore, SqliteLocalStore};
//!
//! async fn example() {
//!     let state = SqliteLocalStore::open("vaultlink.db").unwrap();
//!     state.put("auth.authenticated", "true").await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Shared clients**: a `StorageClient` holds no per-session state, so one
//!   instance serves every workflow.
//! - **Credential-gated envelopes**: ciphertext is public by CID; the envelope
//!   is only released against a verified decryption credential.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{MemoryLocalStore, MemoryStorage};
pub use sqlite::SqliteLocalStore;
pub use traits::{LocalStore, LocationRef, StorageClient, BLOB_ADD};
