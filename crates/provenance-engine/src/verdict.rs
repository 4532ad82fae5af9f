//! Verification outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use provenance_core::{Address, ContentHash};
use serde::Serialize;

/// The result of a verification. There is no partial success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    Verified(VerifiedProvenance),
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified(_))
    }

    pub fn verified(&self) -> Option<&VerifiedProvenance> {
        match self {
            Verdict::Verified(v) => Some(v),
            Verdict::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Verified(_) => None,
            Verdict::Rejected(r) => Some(r),
        }
    }
}

impl From<Rejection> for Verdict {
    fn from(rejection: Rejection) -> Self {
        Verdict::Rejected(rejection)
    }
}

/// A provenance claim that passed every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedProvenance {
    /// The address recovered from the manifest signature, which equals the
    /// ledger's recorded creator.
    pub creator: Address,
    pub content_hash: ContentHash,
    pub manifest_uri: String,
    /// Registration time in Unix seconds, as recorded by the ledger.
    pub registered_at: u64,
}

impl VerifiedProvenance {
    pub fn registered_at_utc(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.registered_at)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Why a claim could not be verified, with enough context for a precise
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// The ledger has no entry for the hash or platform identifier.
    NoBinding { subject: String },

    /// No platform matcher recognizes the URL.
    UnsupportedPlatform { url: String },

    /// The entry exists but its manifest URI was cleared.
    Revoked {
        content_hash: ContentHash,
        creator: Address,
        registered_at: u64,
    },

    /// The manifest could not be fetched. `transient` tells whether a retry
    /// may succeed.
    ManifestUnreachable {
        uri: String,
        error: String,
        transient: bool,
    },

    /// The fetched document is not a manifest.
    MalformedManifest { uri: String, error: String },

    /// The manifest names a different content hash.
    HashMismatch {
        expected: ContentHash,
        actual: String,
    },

    /// No address can be recovered from the manifest signature.
    SignatureInvalid { signature: String, error: String },

    /// The signature recovers to someone other than the recorded creator.
    CreatorMismatch { expected: Address, recovered: Address },
}

impl Rejection {
    /// Short machine-readable reason.
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::NoBinding { .. } => "no_binding",
            Rejection::UnsupportedPlatform { .. } => "unsupported_platform",
            Rejection::Revoked { .. } => "revoked",
            Rejection::ManifestUnreachable { .. } => "manifest_unreachable",
            Rejection::MalformedManifest { .. } => "malformed_manifest",
            Rejection::HashMismatch { .. } => "hash_mismatch",
            Rejection::SignatureInvalid { .. } => "signature_invalid",
            Rejection::CreatorMismatch { .. } => "creator_mismatch",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NoBinding { subject } => write!(f, "no ledger binding for {subject}"),
            Rejection::UnsupportedPlatform { url } => write!(f, "unsupported platform URL {url}"),
            Rejection::Revoked {
                content_hash,
                creator,
                ..
            } => write!(f, "{content_hash} was revoked by {creator}"),
            Rejection::ManifestUnreachable { uri, error, .. } => {
                write!(f, "manifest at {uri} is unreachable: {error}")
            }
            Rejection::MalformedManifest { uri, error } => {
                write!(f, "document at {uri} is not a valid manifest: {error}")
            }
            Rejection::HashMismatch { expected, actual } => {
                write!(f, "manifest names {actual}, expected {expected}")
            }
            Rejection::SignatureInvalid { error, .. } => {
                write!(f, "manifest signature is invalid: {error}")
            }
            Rejection::CreatorMismatch {
                expected,
                recovered,
            } => write!(f, "signature recovers to {recovered}, ledger creator is {expected}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let verdict = Verdict::from(Rejection::NoBinding {
            subject: "youtube:abc".into(),
        });
        assert!(!verdict.is_verified());
        assert!(verdict.verified().is_none());
        assert_eq!(verdict.rejection().map(Rejection::kind), Some("no_binding"));
    }

    #[test]
    fn test_registered_at_utc() {
        let v = VerifiedProvenance {
            creator: Address::ZERO,
            content_hash: ContentHash::ZERO,
            manifest_uri: "ipfs://m".into(),
            registered_at: 1_700_000_000,
        };
        let at = v.registered_at_utc().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_serialized_shape() {
        let verdict = Verdict::Rejected(Rejection::CreatorMismatch {
            expected: Address([1; 20]),
            recovered: Address([2; 20]),
        });
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "creator_mismatch");
        assert_eq!(json["expected"], Address([1; 20]).to_checksum());
    }

    #[test]
    fn test_display_carries_context() {
        let r = Rejection::HashMismatch {
            expected: ContentHash([0xab; 32]),
            actual: "0x00".into(),
        };
        let msg = r.to_string();
        assert!(msg.contains("0x00"));
        assert!(msg.contains(&ContentHash([0xab; 32]).to_hex()));
    }
}
