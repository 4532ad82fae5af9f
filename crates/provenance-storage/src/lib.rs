//! # Provenance Storage
//!
//! Access to the content-addressed storage network that holds manifests.
//!
//! ## Key Types
//!
//! - [`ManifestFetcher`] - fetch raw manifest bytes by URI
//! - [`GatewayFetcher`] - resolves `ipfs://` through a public gateway, and `http(s)://` directly
//! - [`Uploader`] - publish bytes, get back `ipfs://<cid>`
//! - [`StorageProvider`] - closed set of upload backends with typed credentials
//! - [`MemoryStorage`] - in-memory fetcher and uploader for tests
//!
//! ## Design Notes
//!
//! - **Scheme check first**: unsupported URI schemes fail before any request.
//! - **Bounded reads**: documents larger than the configured limit are refused.
//! - **Backend chosen once**: a [`StorageProvider`] builds one [`Uploader`]
//!   at configuration time.

pub mod error;
pub mod fetcher;
pub mod memory;
pub mod uploader;

pub use error::{Result, StorageError, UploadError};
pub use fetcher::{GatewayConfig, GatewayFetcher, ManifestFetcher, StorageUri, CONTENT_SCHEME};
pub use memory::MemoryStorage;
pub use uploader::{
    InfuraCredentials, InfuraUploader, IpfsNodeConfig, IpfsNodeUploader, PinataCredentials,
    PinataUploader, StorageProvider, Uploader, Web3StorageCredentials, Web3StorageUploader,
    DEFAULT_UPLOAD_TIMEOUT,
};
