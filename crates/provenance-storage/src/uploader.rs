//! Uploaders: publish bytes to the content-addressed storage network.
//!
//! One implementation per backend, chosen once from a [`StorageProvider`]
//! when the engine is configured. Every backend returns `ipfs://<cid>`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::UploadError;
use crate::fetcher::CONTENT_SCHEME;

/// Default per-upload timeout.
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Publishes bytes and returns the content-addressed URI they live at.
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Short backend name for logs and errors.
    fn provider(&self) -> &'static str;

    /// Upload `data` under the display name `name`.
    async fn upload(&self, name: &str, data: Bytes) -> Result<String, UploadError>;
}

fn content_uri(cid: &str) -> String {
    format!("{CONTENT_SCHEME}://{cid}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider configuration
// ─────────────────────────────────────────────────────────────────────────────

/// The closed set of supported storage backends, each with its own
/// credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum StorageProvider {
    Pinata(PinataCredentials),
    Web3Storage(Web3StorageCredentials),
    Infura(InfuraCredentials),
    IpfsNode(IpfsNodeConfig),
}

impl StorageProvider {
    /// Build the uploader for this backend with the default timeout.
    pub fn uploader(&self) -> Result<Arc<dyn Uploader>, UploadError> {
        self.uploader_with_timeout(DEFAULT_UPLOAD_TIMEOUT)
    }

    pub fn uploader_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Arc<dyn Uploader>, UploadError> {
        Ok(match self {
            StorageProvider::Pinata(c) => Arc::new(PinataUploader::new(c.clone(), timeout)?),
            StorageProvider::Web3Storage(c) => {
                Arc::new(Web3StorageUploader::new(c.clone(), timeout)?)
            }
            StorageProvider::Infura(c) => Arc::new(InfuraUploader::new(c.clone(), timeout)?),
            StorageProvider::IpfsNode(c) => Arc::new(IpfsNodeUploader::new(c.clone(), timeout)?),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageProvider::Pinata(_) => PinataUploader::NAME,
            StorageProvider::Web3Storage(_) => Web3StorageUploader::NAME,
            StorageProvider::Infura(_) => InfuraUploader::NAME,
            StorageProvider::IpfsNode(_) => IpfsNodeUploader::NAME,
        }
    }
}

/// Pinata pinning service, authenticated with a JWT.
#[derive(Clone, Deserialize)]
pub struct PinataCredentials {
    pub jwt: String,
    #[serde(default = "PinataCredentials::default_api_url")]
    pub api_url: String,
}

impl PinataCredentials {
    pub fn new(jwt: impl Into<String>) -> Self {
        Self {
            jwt: jwt.into(),
            api_url: Self::default_api_url(),
        }
    }

    fn default_api_url() -> String {
        "https://api.pinata.cloud".to_string()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl fmt::Debug for PinataCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinataCredentials")
            .field("jwt", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// web3.storage, authenticated with an API token.
#[derive(Clone, Deserialize)]
pub struct Web3StorageCredentials {
    pub token: String,
    #[serde(default = "Web3StorageCredentials::default_api_url")]
    pub api_url: String,
}

impl Web3StorageCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_url: Self::default_api_url(),
        }
    }

    fn default_api_url() -> String {
        "https://api.web3.storage".to_string()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl fmt::Debug for Web3StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Web3StorageCredentials")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Infura IPFS, authenticated with a project id and secret.
#[derive(Clone, Deserialize)]
pub struct InfuraCredentials {
    pub project_id: String,
    pub project_secret: String,
    #[serde(default = "InfuraCredentials::default_api_url")]
    pub api_url: String,
}

impl InfuraCredentials {
    pub fn new(project_id: impl Into<String>, project_secret: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            project_secret: project_secret.into(),
            api_url: Self::default_api_url(),
        }
    }

    fn default_api_url() -> String {
        "https://ipfs.infura.io:5001".to_string()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}

impl fmt::Debug for InfuraCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfuraCredentials")
            .field("project_id", &self.project_id)
            .field("project_secret", &"<redacted>")
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// A self-hosted IPFS node's HTTP API. No credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct IpfsNodeConfig {
    #[serde(default = "IpfsNodeConfig::default_api_url")]
    pub api_url: String,
}

impl IpfsNodeConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    fn default_api_url() -> String {
        "http://127.0.0.1:5001".to_string()
    }
}

impl Default for IpfsNodeConfig {
    fn default() -> Self {
        Self::new(Self::default_api_url())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared HTTP plumbing
// ─────────────────────────────────────────────────────────────────────────────

fn build_client(provider: &'static str, timeout: Duration) -> Result<reqwest::Client, UploadError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| UploadError::Unavailable {
            provider,
            reason: format!("failed to build HTTP client: {e}"),
        })
}

fn require(provider: &'static str, field: &str, value: &str) -> Result<(), UploadError> {
    if value.trim().is_empty() {
        return Err(UploadError::InvalidCredentials {
            provider,
            reason: format!("{field} is empty"),
        });
    }
    Ok(())
}

fn file_form(name: &str, data: Bytes) -> Form {
    let part = Part::bytes(data.to_vec()).file_name(name.to_string());
    Form::new().part("file", part)
}

/// Send a request and decode the JSON body.
async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, UploadError> {
    let resp = request.send().await.map_err(|e| UploadError::Unavailable {
        provider,
        reason: if e.is_timeout() {
            "request timed out".to_string()
        } else {
            e.to_string()
        },
    })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(provider, status = status.as_u16(), "upload rejected");
        return Err(UploadError::Rejected {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    resp.json::<T>().await.map_err(|e| UploadError::InvalidResponse {
        provider,
        reason: e.to_string(),
    })
}

fn non_empty_cid(provider: &'static str, cid: String) -> Result<String, UploadError> {
    if cid.trim().is_empty() {
        return Err(UploadError::InvalidResponse {
            provider,
            reason: "empty content identifier".to_string(),
        });
    }
    Ok(content_uri(&cid))
}

/// Response of the IPFS HTTP API `add` call.
#[derive(Deserialize)]
struct IpfsAddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────────────────────────────────────

/// Uploads through Pinata's `pinFileToIPFS`.
pub struct PinataUploader {
    client: reqwest::Client,
    credentials: PinataCredentials,
}

#[derive(Deserialize)]
struct PinataResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataUploader {
    pub const NAME: &'static str = "pinata";

    pub fn new(credentials: PinataCredentials, timeout: Duration) -> Result<Self, UploadError> {
        require(Self::NAME, "jwt", &credentials.jwt)?;
        Ok(Self {
            client: build_client(Self::NAME, timeout)?,
            credentials,
        })
    }
}

#[async_trait]
impl Uploader for PinataUploader {
    fn provider(&self) -> &'static str {
        Self::NAME
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<String, UploadError> {
        let url = format!(
            "{}/pinning/pinFileToIPFS",
            self.credentials.api_url.trim_end_matches('/')
        );
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.credentials.jwt)
            .multipart(file_form(name, data));
        let resp: PinataResponse = send_json(Self::NAME, request).await?;
        non_empty_cid(Self::NAME, resp.ipfs_hash)
    }
}

/// Uploads through web3.storage's `/upload`.
pub struct Web3StorageUploader {
    client: reqwest::Client,
    credentials: Web3StorageCredentials,
}

#[derive(Deserialize)]
struct Web3StorageResponse {
    cid: String,
}

impl Web3StorageUploader {
    pub const NAME: &'static str = "web3storage";

    pub fn new(
        credentials: Web3StorageCredentials,
        timeout: Duration,
    ) -> Result<Self, UploadError> {
        require(Self::NAME, "token", &credentials.token)?;
        Ok(Self {
            client: build_client(Self::NAME, timeout)?,
            credentials,
        })
    }
}

#[async_trait]
impl Uploader for Web3StorageUploader {
    fn provider(&self) -> &'static str {
        Self::NAME
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<String, UploadError> {
        let url = format!("{}/upload", self.credentials.api_url.trim_end_matches('/'));
        let request = self
            .client
            .post(url)
            .bearer_auth(&self.credentials.token)
            .header("X-Name", name)
            .body(data);
        let resp: Web3StorageResponse = send_json(Self::NAME, request).await?;
        non_empty_cid(Self::NAME, resp.cid)
    }
}

/// Uploads through Infura's IPFS `add` endpoint.
pub struct InfuraUploader {
    client: reqwest::Client,
    credentials: InfuraCredentials,
}

impl InfuraUploader {
    pub const NAME: &'static str = "infura";

    pub fn new(credentials: InfuraCredentials, timeout: Duration) -> Result<Self, UploadError> {
        require(Self::NAME, "project_id", &credentials.project_id)?;
        require(Self::NAME, "project_secret", &credentials.project_secret)?;
        Ok(Self {
            client: build_client(Self::NAME, timeout)?,
            credentials,
        })
    }
}

#[async_trait]
impl Uploader for InfuraUploader {
    fn provider(&self) -> &'static str {
        Self::NAME
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<String, UploadError> {
        let url = format!(
            "{}/api/v0/add?pin=true",
            self.credentials.api_url.trim_end_matches('/')
        );
        let request = self
            .client
            .post(url)
            .basic_auth(
                &self.credentials.project_id,
                Some(&self.credentials.project_secret),
            )
            .multipart(file_form(name, data));
        let resp: IpfsAddResponse = send_json(Self::NAME, request).await?;
        non_empty_cid(Self::NAME, resp.hash)
    }
}

/// Uploads to a self-hosted IPFS node.
pub struct IpfsNodeUploader {
    client: reqwest::Client,
    config: IpfsNodeConfig,
}

impl IpfsNodeUploader {
    pub const NAME: &'static str = "ipfs-node";

    pub fn new(config: IpfsNodeConfig, timeout: Duration) -> Result<Self, UploadError> {
        require(Self::NAME, "api_url", &config.api_url)?;
        Ok(Self {
            client: build_client(Self::NAME, timeout)?,
            config,
        })
    }
}

#[async_trait]
impl Uploader for IpfsNodeUploader {
    fn provider(&self) -> &'static str {
        Self::NAME
    }

    async fn upload(&self, name: &str, data: Bytes) -> Result<String, UploadError> {
        let url = format!(
            "{}/api/v0/add?pin=true",
            self.config.api_url.trim_end_matches('/')
        );
        let request = self.client.post(url).multipart(file_form(name, data));
        let resp: IpfsAddResponse = send_json(Self::NAME, request).await?;
        non_empty_cid(Self::NAME, resp.hash)
    }
}
