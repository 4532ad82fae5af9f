//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: an engine over an in-memory
//! ledger and storage network, plus a creator key.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use provenance_core::{
    hash_bytes, Address, ContentHash, Keypair, Manifest, ManifestBuilder, SigningError,
    ValidationError,
};
use provenance_engine::{Engine, EngineConfig};
use provenance_ledger::{
    Ledger, LedgerEntry, MemoryLedger, PlatformEntry, Result as LedgerResult, TxReceipt,
};
use provenance_storage::MemoryStorage;

/// An engine over in-memory backends, with a creator keypair.
pub struct TestFixture {
    pub keypair: Keypair,
    pub ledger: Arc<MemoryLedger>,
    pub storage: MemoryStorage,
    pub engine: Engine<MemoryLedger, MemoryStorage>,
}

impl TestFixture {
    /// Create a fixture with a random keypair and default configuration.
    pub fn new() -> Self {
        Self::from_parts(Keypair::generate(), EngineConfig::default())
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Result<Self, SigningError> {
        Ok(Self::from_parts(
            Keypair::from_seed(&seed)?,
            EngineConfig::default(),
        ))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::from_parts(Keypair::generate(), config)
    }

    pub fn from_parts(keypair: Keypair, config: EngineConfig) -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let storage = MemoryStorage::new();
        let engine = Engine::new(
            Arc::clone(&ledger),
            Arc::new(storage.clone()),
            Arc::new(storage.clone()),
            config,
        );
        Self {
            keypair,
            ledger,
            storage,
            engine,
        }
    }

    /// The creator address of the fixture's keypair.
    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    /// A manifest for `hash` signed by `keypair`.
    pub fn signed_manifest(
        &self,
        keypair: &Keypair,
        hash: &ContentHash,
    ) -> Result<Manifest, SigningError> {
        let signature = keypair.sign(hash)?;
        ManifestBuilder::new(hash.to_hex(), keypair.address(), signature)
            .build()
            .map_err(|e| SigningError::Failed(e.to_string()))
    }

    /// Store a manifest's JSON at `uri`.
    pub fn put_manifest(&self, uri: &str, manifest: &Manifest) -> Result<(), ValidationError> {
        self.storage.put(uri, manifest.to_json()?);
        Ok(())
    }

    /// Store raw bytes at `uri`.
    pub fn put_raw(&self, uri: &str, bytes: impl Into<Bytes>) {
        self.storage.put(uri, bytes);
    }

    /// Sign `content`'s hash with the fixture key, store the manifest at
    /// `uri` and register it directly on the ledger.
    pub async fn anchor(&self, content: &[u8], uri: &str) -> anyhow::Result<ContentHash> {
        let hash = hash_bytes(content);
        let manifest = self.signed_manifest(&self.keypair, &hash)?;
        self.put_manifest(uri, &manifest)?;
        self.ledger.register(self.address(), &hash, uri).await?;
        Ok(hash)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic keypairs for multi-party tests.
pub fn keypairs(n: u8) -> Result<Vec<Keypair>, SigningError> {
    (1..=n).map(|i| Keypair::from_seed(&[i; 32])).collect()
}

/// A ledger whose reads take `delay` before answering.
pub struct SlowLedger<L> {
    inner: Arc<L>,
    delay: Duration,
}

impl<L: Ledger> SlowLedger<L> {
    pub fn new(inner: Arc<L>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<L: Ledger> Ledger for SlowLedger<L> {
    async fn register(
        &self,
        caller: Address,
        hash: &ContentHash,
        manifest_uri: &str,
    ) -> LedgerResult<TxReceipt> {
        self.inner.register(caller, hash, manifest_uri).await
    }

    async fn update_manifest(
        &self,
        caller: Address,
        hash: &ContentHash,
        new_manifest_uri: &str,
    ) -> LedgerResult<TxReceipt> {
        self.inner
            .update_manifest(caller, hash, new_manifest_uri)
            .await
    }

    async fn revoke(&self, caller: Address, hash: &ContentHash) -> LedgerResult<TxReceipt> {
        self.inner.revoke(caller, hash).await
    }

    async fn bind_platform(
        &self,
        caller: Address,
        hash: &ContentHash,
        platform: &str,
        platform_id: &str,
    ) -> LedgerResult<TxReceipt> {
        self.inner
            .bind_platform(caller, hash, platform, platform_id)
            .await
    }

    async fn resolve_by_hash(&self, hash: &ContentHash) -> LedgerResult<LedgerEntry> {
        tokio::time::sleep(self.delay).await;
        self.inner.resolve_by_hash(hash).await
    }

    async fn resolve_by_platform(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> LedgerResult<PlatformEntry> {
        tokio::time::sleep(self.delay).await;
        self.inner.resolve_by_platform(platform, platform_id).await
    }
}

/// Install a `tracing` subscriber for test output, once per process.
///
/// Honors `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
