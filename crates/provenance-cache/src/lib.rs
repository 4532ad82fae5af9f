//! # Provenance Cache
//!
//! TTL-bounded, single-flight memoization of ledger and storage-network
//! reads.
//!
//! - [`SingleFlightCache`] - generic `get_or_set` with at most one producer
//!   in flight per key
//! - [`ProvenanceCache`] - typed classes for entries, platform bindings and
//!   manifests, each with its own TTL ([`CacheTtls`])
//!
//! The cache is advisory: every value can be discarded and recomputed, and
//! correctness never depends on it being warm.

pub mod error;
pub mod provenance;
pub mod single_flight;

pub use error::CacheError;
pub use provenance::{CacheTtls, ProvenanceCache};
pub use single_flight::{CacheStats, SingleFlightCache};
