//! Error types for the engine.

use provenance_cache::CacheError;
use provenance_core::{CoreError, SigningError, ValidationError};
use provenance_ledger::LedgerError;
use provenance_storage::{StorageError, UploadError};
use thiserror::Error;

/// Errors that can occur during engine operations.
///
/// Verification rejections are not errors; they are
/// [`Verdict::Rejected`](crate::Verdict::Rejected) values. What remains here
/// is caller input problems, business-rule failures reported by the ledger,
/// and transient upstream failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed hash, address, URI or manifest supplied by the caller.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Reading content for hashing failed.
    #[error("hashing failed: {0}")]
    Hashing(#[from] CoreError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    /// Ledger failure, passed through verbatim.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// No platform matcher recognizes the URL.
    #[error("unsupported platform URL: {0}")]
    UnsupportedPlatform(String),

    /// A blocking hashing task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl EngineError {
    /// Whether the caller may retry with backoff. The engine never retries
    /// on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            EngineError::Ledger(e) => e.is_transient(),
            EngineError::Storage(e) => e.is_transient(),
            EngineError::Upload(e) => e.is_transient(),
            _ => false,
        }
    }

    /// The ledger error, if this is one. Lets callers match on
    /// `AlreadyRegistered`, `AccessDenied` and friends.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            EngineError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
