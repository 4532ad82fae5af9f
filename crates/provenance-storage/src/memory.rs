//! In-memory storage network.
//!
//! Acts as both fetcher and uploader. Uploads are content-addressed by
//! SHA-256 of the bytes; [`MemoryStorage::put`] writes arbitrary bytes at
//! an arbitrary URI so tests can plant tampered documents.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use provenance_core::hash_bytes;

use crate::error::{Result, StorageError, UploadError};
use crate::fetcher::{ManifestFetcher, StorageUri, CONTENT_SCHEME};
use crate::uploader::Uploader;

struct Inner {
    objects: DashMap<String, Bytes>,
    available: AtomicBool,
    fetches: AtomicUsize,
}

/// In-memory storage. Cheaply cloneable; clones share the same objects.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

impl MemoryStorage {
    pub const NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                objects: DashMap::new(),
                available: AtomicBool::new(true),
                fetches: AtomicUsize::new(0),
            }),
        }
    }

    /// Store `data` at `uri`, replacing whatever was there.
    pub fn put(&self, uri: impl Into<String>, data: impl Into<Bytes>) {
        self.inner.objects.insert(uri.into(), data.into());
    }

    pub fn get(&self, uri: &str) -> Option<Bytes> {
        self.inner.objects.get(uri).map(|b| b.value().clone())
    }

    pub fn remove(&self, uri: &str) -> Option<Bytes> {
        self.inner.objects.remove(uri).map(|(_, b)| b)
    }

    /// Simulate the network going offline.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Number of fetches served so far, including failed ones.
    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.objects.is_empty()
    }

    fn is_available(&self) -> bool {
        self.inner.available.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManifestFetcher for MemoryStorage {
    async fn fetch(&self, uri: &str) -> Result<Bytes> {
        StorageUri::parse(uri)?;
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(StorageError::UpstreamUnavailable(
                "memory storage is offline".to_string(),
            ));
        }
        self.get(uri)
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))
    }
}

#[async_trait]
impl Uploader for MemoryStorage {
    fn provider(&self) -> &'static str {
        Self::NAME
    }

    async fn upload(&self, _name: &str, data: Bytes) -> std::result::Result<String, UploadError> {
        if !self.is_available() {
            return Err(UploadError::Unavailable {
                provider: Self::NAME,
                reason: "memory storage is offline".to_string(),
            });
        }
        let hex = hash_bytes(&data).to_hex();
        let uri = format!("{CONTENT_SCHEME}://{}", &hex[2..]);
        self.put(uri.clone(), data);
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let storage = MemoryStorage::new();
        let uri = storage
            .upload("manifest.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        assert!(uri.starts_with("ipfs://"));
        assert_eq!(storage.fetch(&uri).await.unwrap(), Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn test_upload_is_content_addressed() {
        let storage = MemoryStorage::new();
        let a = storage.upload("a", Bytes::from_static(b"same")).await.unwrap();
        let b = storage.upload("b", Bytes::from_static(b"same")).await.unwrap();
        let c = storage.upload("c", Bytes::from_static(b"other")).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_errors() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.fetch("ipfs://missing").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            storage.fetch("ftp://x/y").await,
            Err(StorageError::UnsupportedUriScheme(_))
        ));
        // Rejected schemes never count as a fetch.
        assert_eq!(storage.fetch_count(), 1);

        storage.set_available(false);
        let err = storage.fetch("ipfs://missing").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryStorage::new();
        storage.put("ipfs://m", "v1");
        storage.put("ipfs://m", "v2");
        assert_eq!(storage.fetch("ipfs://m").await.unwrap(), Bytes::from("v2"));
        assert_eq!(storage.remove("ipfs://m"), Some(Bytes::from("v2")));
        assert!(storage.is_empty());
    }
}
