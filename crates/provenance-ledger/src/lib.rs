//! # Provenance Ledger
//!
//! Client for the external ledger that records hash → entry and
//! platform → hash bindings.
//!
//! ## Overview
//!
//! The [`Ledger`] trait is the six-call surface of the registry contract.
//! [`RpcLedger`] reaches a deployed contract over EVM JSON-RPC;
//! [`MemoryLedger`] enforces the same rules in process for tests.
//!
//! ## Key Types
//!
//! - [`Ledger`] - async trait over register / update / revoke / bind / resolve
//! - [`LedgerEntry`] - creator, manifest URI and registration time
//! - [`PlatformEntry`] - a resolved platform binding
//! - [`TxReceipt`] - transaction hash and block of an accepted write
//! - [`LedgerError`] - business-rule failures vs. transient upstream failures
//!
//! ## Usage
//!
//! ```rust,no_run
//! use provenance_core::{hash_bytes, Address};
//! use provenance_ledger::{Ledger, MemoryLedger};
//!
//! async fn example() {
//!     let ledger = MemoryLedger::new();
//!     let creator = Address([0x11; 20]);
//!     let hash = hash_bytes(b"hello world");
//!
//!     ledger.register(creator, &hash, "ipfs://manifest").await.unwrap();
//!     let entry = ledger.resolve_by_hash(&hash).await.unwrap();
//!     assert_eq!(entry.creator, creator);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Absence is a value**: unknown hashes and unbound platform keys
//!   resolve to zero sentinels, never to errors.
//! - **No retries**: transient failures are reported, not retried.

pub mod abi;
pub mod error;
pub mod memory;
pub mod rpc;
pub mod traits;
pub mod types;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use rpc::{RpcLedger, RpcLedgerConfig};
pub use traits::Ledger;
pub use types::{LedgerEntry, PlatformEntry, TxReceipt};
