//! Error types for the cache layer.

use thiserror::Error;

/// Failures of the cache itself, as opposed to its producers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The producer task was cancelled before finishing, which only happens
    /// when the runtime shuts down.
    #[error("cache producer for {key:?} was aborted")]
    ProducerAborted { key: String },
}
