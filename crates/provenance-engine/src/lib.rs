//! # Provenance Engine
//!
//! Registration and verification of provenance claims for digital content.
//!
//! ## Overview
//!
//! A creator hashes content, signs the hash, publishes a manifest to the
//! storage network and records `hash → manifest` on the ledger. Anyone can
//! later resolve a hash, a platform URL or a manifest URI back to that
//! record and re-verify it.
//!
//! ## Key Concepts
//!
//! - **Verdict**: every verification ends in [`Verdict::Verified`] or
//!   [`Verdict::Rejected`] with a [`Rejection`] reason. Rejections are
//!   outcomes, not errors.
//! - **Recovered signer**: the only authoritative creator identity. The
//!   manifest's `creator_did` is informational.
//! - **Errors**: [`EngineError`] is reserved for caller input problems,
//!   ledger business rules (`AlreadyRegistered`, `AccessDenied`, ...) and
//!   transient upstream failures. The engine never retries.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use provenance_engine::{Engine, EngineConfig};
//! use provenance_engine::core::Keypair;
//! use provenance_engine::ledger::MemoryLedger;
//! use provenance_engine::storage::MemoryStorage;
//!
//! async fn example() {
//!     let storage = MemoryStorage::new();
//!     let engine = Engine::new(
//!         Arc::new(MemoryLedger::new()),
//!         Arc::new(storage.clone()),
//!         Arc::new(storage),
//!         EngineConfig::default(),
//!     );
//!
//!     let creator = Keypair::generate();
//!     let registered = engine
//!         .register(&creator, Bytes::from_static(b"hello world"), "hello.txt")
//!         .await
//!         .unwrap();
//!
//!     let verdict = engine.verify_content(b"hello world").await.unwrap();
//!     assert_eq!(verdict.verified().unwrap().creator, registered.creator);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `provenance_engine::core` - hashes, addresses, signatures, manifests, platforms
//! - `provenance_engine::ledger` - ledger trait and clients
//! - `provenance_engine::storage` - fetchers and uploaders
//! - `provenance_engine::cache` - single-flight cache

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod registration;
pub mod verdict;

pub use provenance_cache as cache;
pub use provenance_core as core;
pub use provenance_ledger as ledger;
pub use provenance_storage as storage;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use pipeline::Stage;
pub use registration::Registered;
pub use verdict::{Rejection, Verdict, VerifiedProvenance};

pub use provenance_core::{hash_bytes, Address, ContentHash, Keypair, Manifest, PlatformId, Signer};
pub use provenance_ledger::{Ledger, LedgerEntry, LedgerError, TxReceipt};
