//! # Vaultlink Testkit
//!
//! Testing utilities for Vaultlink.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a space, an agent, an authority and two identities wired
//!   to the in-memory collaborators
//! - **Gated storage**: a storage wrapper that parks writes until released
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use vaultlink::UploadWorkflow;
//! use vaultlink_testkit::TestFixture;
//!
//! # async fn example() {
//! let fixture = TestFixture::new();
//! let upload = UploadWorkflow::new(fixture.clients(), fixture.recipients());
//! upload.submit_delegation(&fixture.delegation_base64()).await.unwrap();
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use vaultlink_testkit::generators::plaintext;
//!
//! proptest! {
//!     #[test]
//!     fn roundtrip(bytes in plaintext(1024)) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod gated;
pub mod generators;

pub use fixtures::{encode_delegation, multi_party_fixtures, TestFixture, DELEGATION_TTL};
pub use gated::GatedStorage;
