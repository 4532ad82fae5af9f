//! # Provenance Testkit
//!
//! Testing utilities for the provenance engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: independently computed hashes, addresses, platform
//!   keys and contract selectors
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: an engine over in-memory backends, ready to use
//!
//! ## Golden Vectors
//!
//! ```rust
//! use provenance_core::hash_bytes;
//! use provenance_testkit::vectors::hash_vectors;
//!
//! for vector in hash_vectors() {
//!     assert_eq!(hash_bytes(vector.input).to_hex(), vector.content_hash);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use provenance_testkit::generators::{content_hash, keypair};
//!
//! proptest! {
//!     #[test]
//!     fn signature_recovers_signer(key in keypair(), hash in content_hash()) {
//!         let sig = key.sign(&hash).unwrap();
//!         prop_assert_eq!(sig.recover(&hash).unwrap(), key.address());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use provenance_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let hash = fixture.anchor(b"hello world", "ipfs://manifestA").await.unwrap();
//!     let verdict = fixture.engine.verify_hash(&hash).await.unwrap();
//!     assert!(verdict.is_verified());
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, keypairs, SlowLedger, TestFixture};
