//! The Engine: verification and registration over one ledger and one
//! storage network.
//!
//! The engine is an explicit service object. Construct it once at startup
//! and share it; it holds no global state and every call is independent.

use std::future::Future;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use provenance_cache::ProvenanceCache;
use provenance_core::{hash_bytes, ContentHash, PlatformId, PlatformParser};
use provenance_ledger::{Ledger, LedgerEntry, LedgerError, PlatformEntry};
use provenance_storage::{ManifestFetcher, StorageError, StorageUri, UploadError, Uploader};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::pipeline::{check_manifest, decode_manifest, Binding, Stage};
use crate::verdict::{Rejection, Verdict};

/// The provenance engine.
///
/// Provides:
/// - Verification from content bytes, a file, a hash, a platform URL or a
///   manifest URI
/// - Registration, manifest update, revocation and platform binding
///
/// Ledger and storage reads go through a shared [`ProvenanceCache`].
pub struct Engine<L, F> {
    pub(crate) ledger: Arc<L>,
    pub(crate) fetcher: Arc<F>,
    pub(crate) uploader: Arc<dyn Uploader>,
    pub(crate) cache: ProvenanceCache,
    pub(crate) parser: PlatformParser,
    pub(crate) config: EngineConfig,
}

impl<L, F> Engine<L, F>
where
    L: Ledger + 'static,
    F: ManifestFetcher + 'static,
{
    /// Create an engine with the built-in platform matchers.
    pub fn new(
        ledger: Arc<L>,
        fetcher: Arc<F>,
        uploader: Arc<dyn Uploader>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            fetcher,
            uploader,
            cache: ProvenanceCache::new(config.cache),
            parser: PlatformParser::new(),
            config,
        }
    }

    /// Replace the platform parser, e.g. to add matchers.
    pub fn with_parser(mut self, parser: PlatformParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn cache(&self) -> &ProvenanceCache {
        &self.cache
    }

    pub fn parser(&self) -> &PlatformParser {
        &self.parser
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────

    /// Hash `content` and verify the claim registered under it.
    pub async fn verify_content(&self, content: &[u8]) -> Result<Verdict> {
        self.verify_hash(&hash_bytes(content)).await
    }

    /// Hash a byte stream off the async runtime, then verify.
    pub async fn verify_reader<R>(&self, reader: R) -> Result<Verdict>
    where
        R: Read + Send + 'static,
    {
        let hash = blocking_hash(move || provenance_core::hash_reader(reader)).await?;
        self.verify_hash(&hash).await
    }

    /// Hash a file off the async runtime, then verify.
    pub async fn verify_file(&self, path: impl AsRef<Path>) -> Result<Verdict> {
        let path = path.as_ref().to_path_buf();
        let hash = blocking_hash(move || provenance_core::hash_file(&path)).await?;
        self.verify_hash(&hash).await
    }

    /// Verify the claim registered under `hash`.
    ///
    /// Returns `Err` only for transient upstream failures reaching the
    /// ledger; every verification outcome is a [`Verdict`].
    pub async fn verify_hash(&self, hash: &ContentHash) -> Result<Verdict> {
        tracing::debug!(stage = %Stage::Unresolved, content_hash = %hash, "verifying hash");
        let entry = self.cached_entry(hash).await?;
        match Binding::resolve(*hash, entry, || hash.to_hex()) {
            Ok(binding) => Ok(self.verify_binding(binding).await),
            Err(rejection) => Ok(rejected(rejection)),
        }
    }

    /// Parse a platform URL and verify the claim bound to it.
    ///
    /// A URL no matcher recognizes is rejected as `UnsupportedPlatform`.
    pub async fn verify_platform_url(&self, url: &str) -> Result<Verdict> {
        match self.parser.parse(url) {
            Some(id) => self.verify_platform(&id).await,
            None => Ok(rejected(Rejection::UnsupportedPlatform {
                url: url.to_string(),
            })),
        }
    }

    /// Verify the claim bound to a platform identifier.
    pub async fn verify_platform(&self, id: &PlatformId) -> Result<Verdict> {
        tracing::debug!(stage = %Stage::Unresolved, platform = %id, "verifying platform binding");
        let resolved = self.cached_platform(id).await?;
        match Binding::resolve(resolved.content_hash, resolved.entry, || id.to_string()) {
            Ok(binding) => Ok(self.verify_binding(binding).await),
            Err(rejection) => Ok(rejected(rejection)),
        }
    }

    /// Verify a manifest fetched from `uri` against `expected`.
    ///
    /// Skips resolution: the manifest is fetched first, then checked
    /// against the ledger entry for `expected`. An unsupported URI scheme is
    /// an error raised before any network call.
    pub async fn verify_manifest_uri(&self, uri: &str, expected: &ContentHash) -> Result<Verdict> {
        StorageUri::parse(uri)?;
        tracing::debug!(stage = %Stage::Unresolved, uri, content_hash = %expected, "verifying manifest");

        let bytes = match self.cached_manifest(uri).await {
            Ok(bytes) => bytes,
            Err(e) => return Ok(rejected(manifest_unreachable(uri, &e))),
        };
        let entry = self.cached_entry(expected).await?;
        let binding = match Binding::resolve(*expected, entry, || expected.to_hex()) {
            Ok(binding) => binding,
            Err(rejection) => return Ok(rejected(rejection)),
        };
        if let Err(rejection) = binding.manifest_uri() {
            return Ok(rejected(rejection));
        }
        Ok(check(&binding, uri, &bytes))
    }

    /// Bound → Fetched → Verified/Rejected.
    async fn verify_binding(&self, binding: Binding) -> Verdict {
        tracing::debug!(
            stage = %Stage::Bound,
            content_hash = %binding.content_hash,
            creator = %binding.entry.creator,
            "ledger entry resolved"
        );
        let uri = match binding.manifest_uri() {
            Ok(uri) => uri.to_string(),
            Err(rejection) => return rejected(rejection),
        };
        match self.cached_manifest(&uri).await {
            Ok(bytes) => check(&binding, &uri, &bytes),
            Err(e) => rejected(manifest_unreachable(&uri, &e)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cached reads
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) async fn cached_entry(&self, hash: &ContentHash) -> Result<LedgerEntry> {
        let ledger = Arc::clone(&self.ledger);
        let timeout = self.config.ledger_timeout;
        let hash = *hash;
        self.cache
            .entry(&hash, move || async move {
                bounded(timeout, "resolve_by_hash", ledger.resolve_by_hash(&hash))
                    .await
                    .map_err(EngineError::from)
            })
            .await
    }

    async fn cached_platform(&self, id: &PlatformId) -> Result<PlatformEntry> {
        let ledger = Arc::clone(&self.ledger);
        let timeout = self.config.ledger_timeout;
        let owned = id.clone();
        self.cache
            .platform(&id.platform, &id.platform_id, move || async move {
                bounded(
                    timeout,
                    "resolve_by_platform",
                    ledger.resolve_by_platform(&owned.platform, &owned.platform_id),
                )
                .await
                .map_err(EngineError::from)
            })
            .await
    }

    async fn cached_manifest(&self, uri: &str) -> Result<Bytes> {
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.config.fetch_timeout;
        let owned = uri.to_string();
        self.cache
            .manifest(uri, move || async move {
                match tokio::time::timeout(timeout, fetcher.fetch(&owned)).await {
                    Ok(fetched) => fetched.map_err(EngineError::from),
                    Err(_) => Err(StorageError::UpstreamUnavailable(format!(
                        "fetch of {owned} timed out after {timeout:?}"
                    ))
                    .into()),
                }
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bounded upstream calls
    // ─────────────────────────────────────────────────────────────────────────

    /// Uncached ledger read.
    pub(crate) async fn read_entry(&self, hash: &ContentHash) -> Result<LedgerEntry> {
        Ok(bounded(
            self.config.ledger_timeout,
            "resolve_by_hash",
            self.ledger.resolve_by_hash(hash),
        )
        .await?)
    }

    pub(crate) async fn write<T>(
        &self,
        call: &'static str,
        fut: impl Future<Output = provenance_ledger::Result<T>>,
    ) -> Result<T> {
        Ok(bounded(self.config.write_timeout, call, fut).await?)
    }

    pub(crate) async fn upload(&self, name: &str, data: Bytes) -> Result<String> {
        let provider = self.uploader.provider();
        let timeout = self.config.upload_timeout;
        match tokio::time::timeout(timeout, self.uploader.upload(name, data)).await {
            Ok(uploaded) => Ok(uploaded?),
            Err(_) => Err(UploadError::Unavailable {
                provider,
                reason: format!("upload timed out after {timeout:?}"),
            }
            .into()),
        }
    }
}

/// Run a ledger call under `timeout`; expiry is `UpstreamUnavailable`.
async fn bounded<T>(
    timeout: Duration,
    call: &'static str,
    fut: impl Future<Output = provenance_ledger::Result<T>>,
) -> provenance_ledger::Result<T> {
    let result = match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::UpstreamUnavailable(format!(
            "{call} timed out after {timeout:?}"
        ))),
    };
    if let Err(e) = &result {
        if e.is_transient() {
            tracing::warn!(call, error = %e, "ledger unavailable");
        }
    }
    result
}

async fn blocking_hash<H>(hash: H) -> Result<ContentHash>
where
    H: FnOnce() -> provenance_core::Result<ContentHash> + Send + 'static,
{
    let hashed = tokio::task::spawn_blocking(hash)
        .await
        .map_err(|e| EngineError::Task(e.to_string()))?;
    Ok(hashed?)
}

/// Fetched → Verified/Rejected.
fn check(binding: &Binding, uri: &str, bytes: &[u8]) -> Verdict {
    tracing::debug!(stage = %Stage::Fetched, uri, bytes = bytes.len(), "manifest fetched");
    let checked = decode_manifest(uri, bytes).and_then(|m| check_manifest(binding, &m, uri));
    match checked {
        Ok(verified) => {
            tracing::debug!(
                stage = %Stage::Verified,
                content_hash = %verified.content_hash,
                creator = %verified.creator,
                "provenance verified"
            );
            Verdict::Verified(verified)
        }
        Err(rejection) => rejected(rejection),
    }
}

fn rejected(rejection: Rejection) -> Verdict {
    tracing::debug!(stage = %Stage::Rejected, reason = rejection.kind(), "{rejection}");
    Verdict::Rejected(rejection)
}

fn manifest_unreachable(uri: &str, error: &EngineError) -> Rejection {
    tracing::warn!(uri, error = %error, "manifest unreachable");
    Rejection::ManifestUnreachable {
        uri: uri.to_string(),
        error: error.to_string(),
        transient: error.is_transient(),
    }
}
