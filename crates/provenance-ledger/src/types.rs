//! Ledger record types.

use provenance_core::{Address, ContentHash};
use serde::{Deserialize, Serialize};

/// The ledger's record for one content hash.
///
/// `timestamp == 0` is the "does not exist" sentinel. An existing entry
/// with an empty `manifest_uri` has been revoked; its creator and
/// registration time survive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub creator: Address,
    pub manifest_uri: String,
    /// Registration time in Unix seconds. Never changes after `register`.
    pub timestamp: u64,
}

impl LedgerEntry {
    /// The zero-entry sentinel returned for absent hashes.
    pub fn empty() -> Self {
        Self {
            creator: Address::ZERO,
            manifest_uri: String::new(),
            timestamp: 0,
        }
    }

    pub fn exists(&self) -> bool {
        self.timestamp != 0
    }

    pub fn is_revoked(&self) -> bool {
        self.exists() && self.manifest_uri.is_empty()
    }
}

impl Default for LedgerEntry {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of resolving a platform identifier.
///
/// An unbound key yields the zero hash and the zero entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub content_hash: ContentHash,
    pub entry: LedgerEntry,
}

impl PlatformEntry {
    pub fn unbound() -> Self {
        Self {
            content_hash: ContentHash::ZERO,
            entry: LedgerEntry::empty(),
        }
    }

    pub fn is_bound(&self) -> bool {
        !self.content_hash.is_zero()
    }
}

/// Proof that a write was accepted by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Transaction hash, `0x`-prefixed.
    pub tx_hash: String,
    pub block_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let empty = LedgerEntry::empty();
        assert!(!empty.exists());
        assert!(!empty.is_revoked());
        assert!(empty.creator.is_zero());

        let unbound = PlatformEntry::unbound();
        assert!(!unbound.is_bound());
        assert!(!unbound.entry.exists());
    }

    #[test]
    fn test_revoked_entry_still_exists() {
        let entry = LedgerEntry {
            creator: Address([7; 20]),
            manifest_uri: String::new(),
            timestamp: 1_700_000_000,
        };
        assert!(entry.exists());
        assert!(entry.is_revoked());
    }
}
