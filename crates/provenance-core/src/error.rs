//! Error types for the provenance core.

use thiserror::Error;

/// Core errors that can occur while hashing or handling primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reading the content stream failed.
    #[error("I/O error while hashing content: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("signing error: {0}")]
    Signing(#[from] SigningError),

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Caller input that is structurally malformed. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed content hash {value:?}: expected 0x followed by 64 hex characters")]
    MalformedHash { value: String },

    #[error("malformed address {value:?}: expected 0x followed by 40 hex characters")]
    MalformedAddress { value: String },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed DID {value:?}: {reason}")]
    MalformedDid { value: String, reason: String },

    #[error("malformed URI {value:?}: {reason}")]
    MalformedUri { value: String, reason: String },

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("empty platform identifier component: {0}")]
    EmptyPlatformComponent(&'static str),
}

/// Failures producing a signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The key material is not a valid secp256k1 scalar.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// The key holder refused to sign (e.g. a hardware wallet denial).
    #[error("signing rejected by key holder: {0}")]
    Rejected(String),

    /// The signing primitive failed.
    #[error("signing failed: {0}")]
    Failed(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
