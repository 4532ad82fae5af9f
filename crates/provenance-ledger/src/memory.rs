//! In-memory implementation of the Ledger trait.
//!
//! Enforces the same rules as the on-chain contract (write-once entries,
//! creator-only mutation, permanent platform bindings) without any network.
//! Used by tests and by local runs with no chain attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use provenance_core::{keccak256, platform_key, Address, ContentHash, PlatformId};

use crate::error::{LedgerError, Result};
use crate::traits::Ledger;
use crate::types::{LedgerEntry, PlatformEntry, TxReceipt};

/// In-memory ledger.
///
/// All state is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    inner: RwLock<MemoryLedgerInner>,
    available: AtomicBool,
    reads: AtomicUsize,
}

struct MemoryLedgerInner {
    /// Entries keyed by content hash.
    entries: HashMap<ContentHash, LedgerEntry>,

    /// Platform key -> content hash.
    bindings: HashMap<[u8; 32], ContentHash>,

    /// Monotonic block height, one block per accepted write.
    block_number: u64,
}

impl MemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                entries: HashMap::new(),
                bindings: HashMap::new(),
                block_number: 0,
            }),
            available: AtomicBool::new(true),
            reads: AtomicUsize::new(0),
        }
    }

    /// Simulate the ledger going offline. While unavailable every call
    /// fails with [`LedgerError::UpstreamUnavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of resolve calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::UpstreamUnavailable(
                "memory ledger is offline".to_string(),
            ))
        }
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerInner {
    /// Find the entry and check the caller is its creator.
    fn authorize(&self, caller: Address, hash: &ContentHash) -> Result<&LedgerEntry> {
        let entry = self
            .entries
            .get(hash)
            .filter(|e| e.exists())
            .ok_or(LedgerError::NotFound(*hash))?;
        if entry.creator != caller {
            return Err(LedgerError::AccessDenied {
                caller,
                content_hash: *hash,
            });
        }
        Ok(entry)
    }

    fn commit(&mut self, hash: &ContentHash) -> TxReceipt {
        self.block_number += 1;
        let mut preimage = Vec::with_capacity(40);
        preimage.extend_from_slice(&self.block_number.to_be_bytes());
        preimage.extend_from_slice(hash.as_bytes());
        TxReceipt {
            tx_hash: format!("0x{}", hex::encode(keccak256(&preimage))),
            block_number: self.block_number,
        }
    }
}

/// Current time in Unix seconds, never zero.
fn now_secs() -> u64 {
    // Zero is the absence sentinel; a registration must never record it.
    (chrono::Utc::now().timestamp().max(1)) as u64
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn register(
        &self,
        caller: Address,
        hash: &ContentHash,
        manifest_uri: &str,
    ) -> Result<TxReceipt> {
        self.check_available()?;
        let mut inner = self.inner.write();

        if inner.entries.get(hash).is_some_and(|e| e.exists()) {
            return Err(LedgerError::AlreadyRegistered(*hash));
        }

        inner.entries.insert(
            *hash,
            LedgerEntry {
                creator: caller,
                manifest_uri: manifest_uri.to_string(),
                timestamp: now_secs(),
            },
        );
        Ok(inner.commit(hash))
    }

    async fn update_manifest(
        &self,
        caller: Address,
        hash: &ContentHash,
        new_manifest_uri: &str,
    ) -> Result<TxReceipt> {
        self.check_available()?;
        let mut inner = self.inner.write();
        inner.authorize(caller, hash)?;

        if let Some(entry) = inner.entries.get_mut(hash) {
            entry.manifest_uri = new_manifest_uri.to_string();
        }
        Ok(inner.commit(hash))
    }

    async fn revoke(&self, caller: Address, hash: &ContentHash) -> Result<TxReceipt> {
        self.check_available()?;
        let mut inner = self.inner.write();
        inner.authorize(caller, hash)?;

        if let Some(entry) = inner.entries.get_mut(hash) {
            entry.manifest_uri.clear();
        }
        Ok(inner.commit(hash))
    }

    async fn bind_platform(
        &self,
        caller: Address,
        hash: &ContentHash,
        platform: &str,
        platform_id: &str,
    ) -> Result<TxReceipt> {
        self.check_available()?;
        let id = PlatformId::new(platform, platform_id)?;
        let mut inner = self.inner.write();
        inner.authorize(caller, hash)?;

        let key = id.key();
        if inner.bindings.contains_key(&key) {
            return Err(LedgerError::AlreadyBound {
                platform: id.platform,
                platform_id: id.platform_id,
            });
        }
        inner.bindings.insert(key, *hash);
        Ok(inner.commit(hash))
    }

    async fn resolve_by_hash(&self, hash: &ContentHash) -> Result<LedgerEntry> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read();
        Ok(inner.entries.get(hash).cloned().unwrap_or_default())
    }

    async fn resolve_by_platform(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<PlatformEntry> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.read();

        let key = platform_key(platform, platform_id);
        match inner.bindings.get(&key) {
            Some(hash) => Ok(PlatformEntry {
                content_hash: *hash,
                entry: inner.entries.get(hash).cloned().unwrap_or_default(),
            }),
            None => Ok(PlatformEntry::unbound()),
        }
    }
}
