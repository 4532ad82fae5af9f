//! Error types for ledger operations.

use provenance_core::{Address, ContentHash, ValidationError};
use thiserror::Error;

/// Errors surfaced by a [`Ledger`](crate::Ledger).
///
/// Business-rule failures are deterministic and are never retried.
/// Only [`LedgerError::UpstreamUnavailable`] is transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// An entry already exists for this hash.
    #[error("content hash {0} is already registered")]
    AlreadyRegistered(ContentHash),

    /// No entry exists for this hash.
    #[error("no ledger entry for content hash {0}")]
    NotFound(ContentHash),

    /// The caller is not the entry's creator.
    #[error("{caller} is not the creator of {content_hash}")]
    AccessDenied {
        caller: Address,
        content_hash: ContentHash,
    },

    /// The platform key already maps to a content hash.
    #[error("platform identifier {platform}:{platform_id} is already bound")]
    AlreadyBound {
        platform: String,
        platform_id: String,
    },

    /// Transport failure or timeout reaching the ledger.
    #[error("ledger unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The contract reverted for a reason that maps to no business rule.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// The ledger answered with data that does not decode.
    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl LedgerError {
    /// Whether a caller may retry the operation with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::UpstreamUnavailable(_))
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
