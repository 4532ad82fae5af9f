//! Manifest fetching.
//!
//! Two URI forms are resolved: `ipfs://<cid>[/path]` through a public
//! gateway, and plain `http(s)://` URLs fetched directly. Any other scheme
//! is rejected before a request is made.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::Deserialize;
use url::Url;

use crate::error::{Result, StorageError};

/// Scheme of content-addressed URIs.
pub const CONTENT_SCHEME: &str = "ipfs";

/// A manifest location the fetcher knows how to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageUri {
    /// `ipfs://<cid>[/path]`; holds everything after the scheme.
    ContentAddressed(String),
    /// A plain web URL.
    Http(Url),
}

impl StorageUri {
    /// Classify a URI, rejecting unsupported schemes.
    pub fn parse(uri: &str) -> Result<Self> {
        let unsupported = || StorageError::UnsupportedUriScheme(uri.to_string());
        let (scheme, rest) = uri.split_once("://").ok_or_else(unsupported)?;

        match scheme.to_ascii_lowercase().as_str() {
            CONTENT_SCHEME => {
                let path = rest.trim_start_matches('/');
                if path.is_empty() {
                    return Err(unsupported());
                }
                Ok(StorageUri::ContentAddressed(path.to_string()))
            }
            "http" | "https" => Url::parse(uri)
                .map(StorageUri::Http)
                .map_err(|_| unsupported()),
            _ => Err(unsupported()),
        }
    }
}

/// Something that can return the raw bytes stored at a manifest URI.
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetch the document at `uri`.
    ///
    /// Fails with [`StorageError::UnsupportedUriScheme`] before any network
    /// call when the scheme is not resolvable.
    async fn fetch(&self, uri: &str) -> Result<Bytes>;
}

/// Configuration for [`GatewayFetcher`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway prefix the CID is appended to. Must end with `/`.
    pub gateway_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Largest document accepted.
    pub max_manifest_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_url: "https://ipfs.io/ipfs/".to_string(),
            timeout_secs: 30,
            max_manifest_bytes: 1024 * 1024,
        }
    }
}

impl GatewayConfig {
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_manifest_bytes(mut self, limit: usize) -> Self {
        self.max_manifest_bytes = limit;
        self
    }
}

/// Fetches manifests over HTTP, resolving content-addressed URIs through
/// a gateway.
#[derive(Debug, Clone)]
pub struct GatewayFetcher {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayFetcher {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                StorageError::UpstreamUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The HTTP URL a storage URI resolves to.
    pub fn resolve(&self, uri: &str) -> Result<Url> {
        match StorageUri::parse(uri)? {
            StorageUri::Http(url) => Ok(url),
            StorageUri::ContentAddressed(path) => {
                let mut base = self.config.gateway_url.clone();
                if !base.ends_with('/') {
                    base.push('/');
                }
                Url::parse(&format!("{base}{path}"))
                    .map_err(|_| StorageError::UnsupportedUriScheme(uri.to_string()))
            }
        }
    }
}

#[async_trait]
impl ManifestFetcher for GatewayFetcher {
    async fn fetch(&self, uri: &str) -> Result<Bytes> {
        let url = self.resolve(uri)?;
        let limit = self.config.max_manifest_bytes;

        let mut resp = self.client.get(url.clone()).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("{url}: request timed out")
            } else {
                format!("{url}: {e}")
            };
            StorageError::UpstreamUnavailable(reason)
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(StorageError::NotFound(uri.to_string()));
        }
        if !status.is_success() {
            return Err(StorageError::UpstreamUnavailable(format!(
                "{url}: HTTP {status}"
            )));
        }

        let too_large = || StorageError::TooLarge {
            uri: uri.to_string(),
            limit,
        };
        if resp.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| {
            StorageError::UpstreamUnavailable(format!("{url}: reading body: {e}"))
        })? {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(uri, bytes = body.len(), "fetched manifest");
        Ok(body.freeze())
    }
}
