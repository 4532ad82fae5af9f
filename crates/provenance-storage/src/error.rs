//! Error types for storage-network access.

use thiserror::Error;

/// Errors fetching from or writing to the storage network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The URI uses a scheme the fetcher does not resolve. Raised before any
    /// network call.
    #[error("unsupported URI scheme in {0:?}")]
    UnsupportedUriScheme(String),

    /// Transport failure, timeout or server error.
    #[error("storage network unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The document does not exist at this URI.
    #[error("nothing stored at {0}")]
    NotFound(String),

    /// The document exceeds the configured size limit.
    #[error("document at {uri} exceeds {limit} bytes")]
    TooLarge { uri: String, limit: usize },

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl StorageError {
    /// Whether a caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        match self {
            StorageError::UpstreamUnavailable(_) => true,
            StorageError::Upload(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Failures from an upload backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// Credentials are missing or malformed.
    #[error("{provider}: invalid credentials: {reason}")]
    InvalidCredentials {
        provider: &'static str,
        reason: String,
    },

    /// The provider answered with a non-success status.
    #[error("{provider}: upload rejected with HTTP {status}: {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Transport failure or timeout.
    #[error("{provider}: unavailable: {reason}")]
    Unavailable {
        provider: &'static str,
        reason: String,
    },

    /// The provider's response does not carry a content identifier.
    #[error("{provider}: invalid response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },
}

impl UploadError {
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::Unavailable { .. } => true,
            UploadError::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
