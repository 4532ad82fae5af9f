//! Ledger trait: the abstract call surface of the provenance contract.
//!
//! Implementations include the EVM JSON-RPC client (primary) and an
//! in-memory ledger with identical rules (for tests and local runs).

use async_trait::async_trait;
use provenance_core::{Address, ContentHash};

use crate::error::Result;
use crate::types::{LedgerEntry, PlatformEntry, TxReceipt};

/// The Ledger trait: async interface to the external system of record.
///
/// Write calls take the `caller` explicitly; the ledger authorizes
/// mutations against the creator it recorded at registration.
///
/// # Contract Rules
///
/// - **Write-once**: `register` fails with `AlreadyRegistered` when an entry
///   exists (existence = non-zero timestamp).
/// - **Creator-only**: `update_manifest`, `revoke` and `bind_platform` fail
///   with `NotFound` for absent entries and `AccessDenied` for any caller
///   other than the creator. A failed call leaves state unchanged.
/// - **Permanent bindings**: a platform key binds once; a second bind fails
///   with `AlreadyBound`, even for the same hash.
/// - **Absence is not an error**: resolution returns zero sentinels.
#[async_trait]
pub trait Ledger: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create the entry for `hash` with `creator = caller`, `timestamp = now`.
    async fn register(
        &self,
        caller: Address,
        hash: &ContentHash,
        manifest_uri: &str,
    ) -> Result<TxReceipt>;

    /// Replace the manifest URI. Creator and timestamp are untouched.
    async fn update_manifest(
        &self,
        caller: Address,
        hash: &ContentHash,
        new_manifest_uri: &str,
    ) -> Result<TxReceipt>;

    /// Clear the manifest URI. The entry keeps its creator and timestamp.
    async fn revoke(&self, caller: Address, hash: &ContentHash) -> Result<TxReceipt>;

    /// Irreversibly map `(platform, platform_id)` to `hash`.
    async fn bind_platform(
        &self,
        caller: Address,
        hash: &ContentHash,
        platform: &str,
        platform_id: &str,
    ) -> Result<TxReceipt>;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up the entry for `hash`; [`LedgerEntry::empty`] when absent.
    async fn resolve_by_hash(&self, hash: &ContentHash) -> Result<LedgerEntry>;

    /// Resolve a platform key to its hash and entry;
    /// [`PlatformEntry::unbound`] when the key is unbound.
    async fn resolve_by_platform(&self, platform: &str, platform_id: &str)
        -> Result<PlatformEntry>;
}
