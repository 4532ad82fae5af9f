//! Engine configuration.

use std::time::Duration;

use provenance_cache::CacheTtls;
use provenance_core::DEFAULT_CHAIN_ID;
use serde::Deserialize;

/// Configuration for the [`Engine`](crate::Engine).
///
/// Every outbound call is bounded by one of the timeouts below; an expired
/// call resolves to an `UpstreamUnavailable` error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chain id embedded in the `creator_did` of new manifests.
    pub chain_id: u64,
    /// Bound on ledger reads.
    pub ledger_timeout: Duration,
    /// Bound on ledger writes, including waiting for inclusion.
    pub write_timeout: Duration,
    /// Bound on storage-network fetches.
    pub fetch_timeout: Duration,
    /// Bound on uploads.
    pub upload_timeout: Duration,
    pub cache: CacheTtls,
    /// Upload the content itself during registration and record its URI in
    /// the manifest. When false, `content_uri` is left empty.
    pub upload_content: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: DEFAULT_CHAIN_ID,
            ledger_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(120),
            fetch_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(60),
            cache: CacheTtls::default(),
            upload_content: true,
        }
    }
}

impl EngineConfig {
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_ledger_timeout(mut self, timeout: Duration) -> Self {
        self.ledger_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn with_cache_ttls(mut self, ttls: CacheTtls) -> Self {
        self.cache = ttls;
        self
    }

    pub fn with_upload_content(mut self, upload: bool) -> Self {
        self.upload_content = upload;
        self
    }
}
