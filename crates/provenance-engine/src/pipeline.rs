//! Verification pipeline stages and the manifest checks.
//!
//! ```text
//! Unresolved ──resolve──▶ Bound ──fetch──▶ Fetched ──check──▶ Verified
//!      │                    │                 │
//!      └─▶ NoBinding        ├─▶ Revoked       ├─▶ MalformedManifest
//!                           └─▶ Unreachable   ├─▶ HashMismatch
//!                                             ├─▶ SignatureInvalid
//!                                             └─▶ CreatorMismatch
//! ```
//!
//! The checks short-circuit in the order above so signature recovery is
//! skipped when the hash already mismatches.

use std::fmt;

use provenance_core::{recover_signer, Address, ContentHash, Manifest, RecoverableSignature};
use provenance_ledger::LedgerEntry;

use crate::verdict::{Rejection, VerifiedProvenance};

/// Position of a request in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unresolved,
    Bound,
    Fetched,
    Verified,
    Rejected,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Unresolved => "unresolved",
            Stage::Bound => "bound",
            Stage::Fetched => "fetched",
            Stage::Verified => "verified",
            Stage::Rejected => "rejected",
        })
    }
}

/// A resolved ledger binding: the hash the claim is about and its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub content_hash: ContentHash,
    pub entry: LedgerEntry,
}

impl Binding {
    /// Enter `Bound`, or reject when the ledger returned the zero sentinel.
    pub fn resolve(
        content_hash: ContentHash,
        entry: LedgerEntry,
        subject: impl FnOnce() -> String,
    ) -> Result<Self, Rejection> {
        if !entry.exists() {
            return Err(Rejection::NoBinding { subject: subject() });
        }
        Ok(Self {
            content_hash,
            entry,
        })
    }

    /// Manifest URI to fetch, or `Revoked` for a cleared entry.
    pub fn manifest_uri(&self) -> Result<&str, Rejection> {
        if self.entry.is_revoked() {
            return Err(Rejection::Revoked {
                content_hash: self.content_hash,
                creator: self.entry.creator,
                registered_at: self.entry.timestamp,
            });
        }
        Ok(&self.entry.manifest_uri)
    }
}

/// Decode fetched bytes into a manifest.
pub fn decode_manifest(uri: &str, bytes: &[u8]) -> Result<Manifest, Rejection> {
    Manifest::from_json(bytes).map_err(|e| Rejection::MalformedManifest {
        uri: uri.to_string(),
        error: e.to_string(),
    })
}

/// The three-way check of a fetched manifest against its binding.
///
/// 1. `content_hash` equals the expected hash (case-insensitive hex)
/// 2. an address recovers from `signature` over that hash
/// 3. the recovered address is the ledger's creator
///
/// The claimed `creator_did` is never consulted.
pub fn check_manifest(
    binding: &Binding,
    manifest: &Manifest,
    manifest_uri: &str,
) -> Result<VerifiedProvenance, Rejection> {
    let expected = binding.content_hash;
    if !manifest
        .content_hash
        .eq_ignore_ascii_case(&expected.to_hex())
    {
        return Err(Rejection::HashMismatch {
            expected,
            actual: manifest.content_hash.clone(),
        });
    }

    let recovered = recover(&expected, &manifest.signature)?;
    if recovered != binding.entry.creator {
        return Err(Rejection::CreatorMismatch {
            expected: binding.entry.creator,
            recovered,
        });
    }

    Ok(VerifiedProvenance {
        creator: recovered,
        content_hash: expected,
        manifest_uri: manifest_uri.to_string(),
        registered_at: binding.entry.timestamp,
    })
}

fn recover(hash: &ContentHash, signature: &str) -> Result<Address, Rejection> {
    let invalid = |error: String| Rejection::SignatureInvalid {
        signature: signature.to_string(),
        error,
    };
    let sig = RecoverableSignature::from_hex(signature).map_err(|e| invalid(e.to_string()))?;
    recover_signer(hash, &sig).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_core::{hash_bytes, Keypair, ManifestBuilder};

    fn keypair(n: u8) -> Keypair {
        Keypair::from_seed(&[n; 32]).unwrap()
    }

    fn bound(hash: ContentHash, creator: Address) -> Binding {
        Binding {
            content_hash: hash,
            entry: LedgerEntry {
                creator,
                manifest_uri: "ipfs://manifest".into(),
                timestamp: 1_700_000_000,
            },
        }
    }

    fn signed_manifest(hash: &ContentHash, key: &Keypair) -> Manifest {
        let sig = key.sign(hash).unwrap();
        ManifestBuilder::new(hash.to_hex(), key.address(), sig)
            .build()
            .unwrap()
    }

    #[test]
    fn test_sentinel_is_no_binding() {
        let rejected = Binding::resolve(ContentHash::ZERO, LedgerEntry::empty(), || {
            "youtube:missing".into()
        })
        .unwrap_err();
        assert_eq!(
            rejected,
            Rejection::NoBinding {
                subject: "youtube:missing".into()
            }
        );
    }

    #[test]
    fn test_revoked_before_fetch() {
        let hash = hash_bytes(b"content");
        let mut binding = bound(hash, Address([7; 20]));
        binding.entry.manifest_uri.clear();

        match binding.manifest_uri() {
            Err(Rejection::Revoked {
                content_hash,
                creator,
                registered_at,
            }) => {
                assert_eq!(content_hash, hash);
                assert_eq!(creator, Address([7; 20]));
                assert_eq!(registered_at, 1_700_000_000);
            }
            other => panic!("expected Revoked, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_manifest_verifies() {
        let key = keypair(1);
        let hash = hash_bytes(b"hello world");
        let binding = bound(hash, key.address());
        let manifest = signed_manifest(&hash, &key);

        let verified = check_manifest(&binding, &manifest, "ipfs://manifest").unwrap();
        assert_eq!(verified.creator, key.address());
        assert_eq!(verified.content_hash, hash);
        assert_eq!(verified.registered_at, 1_700_000_000);
    }

    #[test]
    fn test_hash_compare_ignores_case() {
        let key = keypair(1);
        let hash = hash_bytes(b"hello world");
        let mut manifest = signed_manifest(&hash, &key);
        manifest.content_hash = manifest.content_hash.to_uppercase().replacen("0X", "0x", 1);

        assert!(check_manifest(&bound(hash, key.address()), &manifest, "u").is_ok());
    }

    #[test]
    fn test_hash_mismatch_short_circuits() {
        let key = keypair(1);
        let hash = hash_bytes(b"hello world");
        let mut manifest = signed_manifest(&hash, &key);
        manifest.content_hash = hash_bytes(b"tampered").to_hex();
        // Would also fail recovery; the hash check must win.
        manifest.signature = "0xdead".into();

        match check_manifest(&bound(hash, key.address()), &manifest, "u") {
            Err(Rejection::HashMismatch { expected, actual }) => {
                assert_eq!(expected, hash);
                assert_eq!(actual, hash_bytes(b"tampered").to_hex());
            }
            other => panic!("expected HashMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_garbage_signature_is_invalid() {
        let key = keypair(1);
        let hash = hash_bytes(b"hello world");
        let mut manifest = signed_manifest(&hash, &key);
        manifest.signature = "0x1234".into();

        let rejected = check_manifest(&bound(hash, key.address()), &manifest, "u").unwrap_err();
        assert_eq!(rejected.kind(), "signature_invalid");
    }

    #[test]
    fn test_other_signer_is_creator_mismatch() {
        let creator = keypair(1);
        let impostor = keypair(2);
        let hash = hash_bytes(b"hello world");
        let manifest = signed_manifest(&hash, &impostor);

        match check_manifest(&bound(hash, creator.address()), &manifest, "u") {
            Err(Rejection::CreatorMismatch {
                expected,
                recovered,
            }) => {
                assert_eq!(expected, creator.address());
                assert_eq!(recovered, impostor.address());
            }
            other => panic!("expected CreatorMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_claimed_did_is_not_trusted() {
        let creator = keypair(1);
        let impostor = keypair(2);
        let hash = hash_bytes(b"hello world");
        let sig = impostor.sign(&hash).unwrap();
        // Claims the real creator, signed by someone else.
        let manifest = ManifestBuilder::new(hash.to_hex(), creator.address(), sig)
            .build()
            .unwrap();

        let rejected = check_manifest(&bound(hash, creator.address()), &manifest, "u").unwrap_err();
        assert_eq!(rejected.kind(), "creator_mismatch");
    }

    #[test]
    fn test_malformed_document() {
        let rejected = decode_manifest("ipfs://x", b"<html>").unwrap_err();
        assert_eq!(rejected.kind(), "malformed_manifest");
    }
}
