//! Typed cache for the verification pipeline's upstream reads.
//!
//! Three classes of data, each with its own TTL:
//!
//! | Class    | Key                              | Default TTL |
//! |----------|----------------------------------|-------------|
//! | entry    | `entry:<content hash>`           | 30 s        |
//! | platform | `platform:<platform key>`        | 15 s        |
//! | manifest | `manifest:<uri>`                 | 1 h         |
//!
//! Manifests are immutable by content address, so they live longest.
//! Platform lookups are re-read soonest.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;

use provenance_core::{platform_key, ContentHash};
use provenance_ledger::{LedgerEntry, PlatformEntry};

use crate::error::CacheError;
use crate::single_flight::{CacheStats, SingleFlightCache};

/// Time-to-live per cached data class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub entry: Duration,
    pub platform: Duration,
    pub manifest: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            entry: Duration::from_secs(30),
            platform: Duration::from_secs(15),
            manifest: Duration::from_secs(60 * 60),
        }
    }
}

pub fn entry_key(hash: &ContentHash) -> String {
    format!("entry:{hash}")
}

pub fn platform_cache_key(platform: &str, platform_id: &str) -> String {
    format!("platform:0x{}", hex::encode(platform_key(platform, platform_id)))
}

pub fn manifest_key(uri: &str) -> String {
    format!("manifest:{uri}")
}

/// Shared, advisory cache in front of the ledger and storage network.
pub struct ProvenanceCache {
    ttls: CacheTtls,
    entries: SingleFlightCache<LedgerEntry>,
    platforms: SingleFlightCache<PlatformEntry>,
    manifests: SingleFlightCache<Bytes>,
}

impl ProvenanceCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            ttls,
            entries: SingleFlightCache::new(),
            platforms: SingleFlightCache::new(),
            manifests: SingleFlightCache::new(),
        }
    }

    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Ledger entry for `hash`, produced on miss.
    pub async fn entry<F, Fut, E>(&self, hash: &ContentHash, producer: F) -> Result<LedgerEntry, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<LedgerEntry, E>> + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        self.entries
            .get_or_set(&entry_key(hash), self.ttls.entry, producer)
            .await
    }

    /// Platform binding for `(platform, platform_id)`, produced on miss.
    pub async fn platform<F, Fut, E>(
        &self,
        platform: &str,
        platform_id: &str,
        producer: F,
    ) -> Result<PlatformEntry, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<PlatformEntry, E>> + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        self.platforms
            .get_or_set(
                &platform_cache_key(platform, platform_id),
                self.ttls.platform,
                producer,
            )
            .await
    }

    /// Raw manifest document at `uri`, produced on miss.
    pub async fn manifest<F, Fut, E>(&self, uri: &str, producer: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Bytes, E>> + Send + 'static,
        E: From<CacheError> + Send + 'static,
    {
        self.manifests
            .get_or_set(&manifest_key(uri), self.ttls.manifest, producer)
            .await
    }

    /// Forget everything cached about `hash`: its entry, and any platform
    /// binding resolved to it.
    pub fn invalidate_hash(&self, hash: &ContentHash) {
        self.entries.invalidate(&entry_key(hash));
        let dropped = self.platforms.invalidate_matching(|p| p.content_hash == *hash);
        tracing::debug!(content_hash = %hash, platforms = dropped, "cache invalidated");
    }

    pub fn invalidate_platform(&self, platform: &str, platform_id: &str) {
        self.platforms
            .invalidate(&platform_cache_key(platform, platform_id));
    }

    pub fn invalidate_manifest(&self, uri: &str) {
        self.manifests.invalidate(&manifest_key(uri));
    }

    /// Remove expired slots from every class.
    pub fn purge_expired(&self) -> usize {
        self.entries.purge_expired()
            + self.platforms.purge_expired()
            + self.manifests.purge_expired()
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.platforms.clear();
        self.manifests.clear();
    }

    /// Keys tracked across all classes.
    pub fn len(&self) -> usize {
        self.entries.len() + self.platforms.len() + self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combined hit and miss counts.
    pub fn stats(&self) -> CacheStats {
        [
            self.entries.stats(),
            self.platforms.stats(),
            self.manifests.stats(),
        ]
        .into_iter()
        .fold(CacheStats::default(), |acc, s| CacheStats {
            hits: acc.hits + s.hits,
            misses: acc.misses + s.misses,
        })
    }
}

impl Default for ProvenanceCache {
    fn default() -> Self {
        Self::new(CacheTtls::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_core::{hash_bytes, Address};

    #[derive(Debug)]
    struct Never;

    impl From<CacheError> for Never {
        fn from(_: CacheError) -> Self {
            Never
        }
    }

    fn entry(uri: &str) -> LedgerEntry {
        LedgerEntry {
            creator: Address([1; 20]),
            manifest_uri: uri.to_string(),
            timestamp: 1_700_000_000,
        }
    }

    #[test]
    fn test_default_ttls_ordering() {
        let ttls = CacheTtls::default();
        assert!(ttls.platform < ttls.entry);
        assert!(ttls.entry < ttls.manifest);
    }

    #[test]
    fn test_ttls_deserialize_partial() {
        let ttls: CacheTtls =
            serde_json::from_value(serde_json::json!({"entry": {"secs": 5, "nanos": 0}}))
                .unwrap();
        assert_eq!(ttls.entry, Duration::from_secs(5));
        assert_eq!(ttls.manifest, Duration::from_secs(3600));
    }

    #[test]
    fn test_keys_are_namespaced() {
        let h = hash_bytes(b"x");
        assert!(entry_key(&h).starts_with("entry:0x"));
        assert!(platform_cache_key("youtube", "abc").starts_with("platform:0x"));
        assert_ne!(
            platform_cache_key("a", "b:c"),
            platform_cache_key("a:b", "c")
        );
        assert_eq!(manifest_key("ipfs://m"), "manifest:ipfs://m");
    }

    #[tokio::test]
    async fn test_invalidate_hash_drops_entry_and_bindings() {
        let cache = ProvenanceCache::default();
        let h = hash_bytes(b"content");
        let other = hash_bytes(b"other");

        cache
            .entry(&h, || async { Ok::<_, Never>(entry("ipfs://a")) })
            .await
            .unwrap();
        cache
            .platform("youtube", "abc", move || async move {
                Ok::<_, Never>(PlatformEntry {
                    content_hash: h,
                    entry: entry("ipfs://a"),
                })
            })
            .await
            .unwrap();
        cache
            .platform("vimeo", "1", move || async move {
                Ok::<_, Never>(PlatformEntry {
                    content_hash: other,
                    entry: entry("ipfs://b"),
                })
            })
            .await
            .unwrap();
        assert_eq!(cache.len(), 3);

        cache.invalidate_hash(&h);
        assert_eq!(cache.len(), 1);

        let fresh = cache
            .entry(&h, || async { Ok::<_, Never>(entry("")) })
            .await
            .unwrap();
        assert!(fresh.is_revoked());
    }

    #[tokio::test]
    async fn test_stats_are_combined() {
        let cache = ProvenanceCache::default();
        for _ in 0..3 {
            cache
                .manifest("ipfs://m", || async { Ok::<_, Never>(Bytes::from_static(b"{}")) })
                .await
                .unwrap();
        }
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
    }
}
