//! Manifests: the signed, off-ledger record of a provenance claim.
//!
//! A manifest is created once by its author and never mutated. A "new"
//! manifest for the same content is a new document at a new URI.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::crypto::RecoverableSignature;
use crate::error::ValidationError;
use crate::hash::{ContentHash, HASH_ALGORITHM};

/// Manifest schema version written by this crate.
pub const MANIFEST_VERSION: &str = "1.0";

/// Chain the default DID is scoped to (Ethereum mainnet).
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// A creator identifier of the form `did:pkh:eip155:<chainId>:<address>`.
///
/// Mechanically derived from an address. It is a claim, never an
/// authority: verification trusts only the recovered signer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CreatorDid {
    pub chain_id: u64,
    pub address: Address,
}

impl CreatorDid {
    pub fn new(chain_id: u64, address: Address) -> Self {
        Self { chain_id, address }
    }

    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let malformed = |reason: &str| ValidationError::MalformedDid {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let rest = s
            .strip_prefix("did:pkh:eip155:")
            .ok_or_else(|| malformed("expected did:pkh:eip155: prefix"))?;
        let (chain, addr) = rest
            .split_once(':')
            .ok_or_else(|| malformed("missing address component"))?;
        let chain_id = chain
            .parse::<u64>()
            .map_err(|_| malformed("chain id is not a number"))?;
        let address = Address::from_hex(addr).map_err(|_| malformed("invalid address"))?;
        Ok(Self { chain_id, address })
    }
}

impl fmt::Display for CreatorDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "did:pkh:eip155:{}:{}", self.chain_id, self.address.to_hex())
    }
}

impl fmt::Debug for CreatorDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CreatorDid({self})")
    }
}

impl FromStr for CreatorDid {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The manifest document as stored on the content network.
///
/// `content_hash` and `signature` stay as strings so a tampered or
/// malformed document can still be decoded and diagnosed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub algorithm: String,
    pub content_hash: String,
    #[serde(default)]
    pub content_uri: String,
    pub creator_did: String,
    pub created_at: String,
    pub signature: String,
    /// Reserved for extensions. Order carries no meaning.
    #[serde(default)]
    pub attestations: Vec<serde_json::Value>,
}

impl Manifest {
    /// Decode a manifest from its JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(bytes).map_err(|e| ValidationError::MalformedManifest(e.to_string()))
    }

    /// Encode as pretty-printed JSON for upload.
    pub fn to_json(&self) -> Result<Vec<u8>, ValidationError> {
        serde_json::to_vec_pretty(self).map_err(|e| ValidationError::MalformedManifest(e.to_string()))
    }

    /// Parse the `content_hash` field.
    pub fn parsed_content_hash(&self) -> Result<ContentHash, ValidationError> {
        ContentHash::from_hex(&self.content_hash)
    }

    /// Parse the `signature` field.
    pub fn parsed_signature(&self) -> Result<RecoverableSignature, ValidationError> {
        RecoverableSignature::from_hex(&self.signature)
    }

    /// The creator the document claims. Informational only.
    pub fn claimed_creator(&self) -> Result<CreatorDid, ValidationError> {
        CreatorDid::parse(&self.creator_did)
    }

    /// Parse the `created_at` timestamp.
    pub fn created_at(&self) -> Result<DateTime<Utc>, ValidationError> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ValidationError::MalformedManifest(format!("created_at: {e}")))
    }
}

/// Assembles a [`Manifest`] from its load-bearing parts.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    content_hash: String,
    creator: Address,
    signature: RecoverableSignature,
    content_uri: String,
    chain_id: u64,
    created_at: Option<DateTime<Utc>>,
    attestations: Vec<serde_json::Value>,
}

impl ManifestBuilder {
    /// Start a manifest for `content_hash`, signed by `creator`.
    pub fn new(
        content_hash: impl Into<String>,
        creator: Address,
        signature: RecoverableSignature,
    ) -> Self {
        Self {
            content_hash: content_hash.into(),
            creator,
            signature,
            content_uri: String::new(),
            chain_id: DEFAULT_CHAIN_ID,
            created_at: None,
            attestations: Vec::new(),
        }
    }

    /// Location of the content itself. Empty when not uploaded.
    pub fn content_uri(mut self, uri: impl Into<String>) -> Self {
        self.content_uri = uri.into();
        self
    }

    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Fix the creation time (defaults to now).
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn attestation(mut self, attestation: serde_json::Value) -> Self {
        self.attestations.push(attestation);
        self
    }

    /// Validate the hash and produce the manifest.
    ///
    /// The hash is normalized to lowercase.
    pub fn build(self) -> Result<Manifest, ValidationError> {
        let hash = ContentHash::from_hex(&self.content_hash)?;
        let created_at = self.created_at.unwrap_or_else(Utc::now);
        Ok(Manifest {
            version: MANIFEST_VERSION.to_string(),
            algorithm: HASH_ALGORITHM.to_string(),
            content_hash: hash.to_hex(),
            content_uri: self.content_uri,
            creator_did: CreatorDid::new(self.chain_id, self.creator).to_string(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            signature: self.signature.to_hex(),
            attestations: self.attestations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::hash::hash_bytes;
    use chrono::TimeZone;

    fn signed(content: &[u8]) -> (Keypair, ContentHash, RecoverableSignature) {
        let keypair = Keypair::from_seed(&[0x42; 32]).unwrap();
        let hash = hash_bytes(content);
        let sig = keypair.sign(&hash).unwrap();
        (keypair, hash, sig)
    }

    #[test]
    fn test_build_fields() {
        let (keypair, hash, sig) = signed(b"hello world");
        let at = Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap();
        let manifest = ManifestBuilder::new(hash.to_hex(), keypair.address(), sig)
            .content_uri("ipfs://bafycontent")
            .chain_id(137)
            .created_at(at)
            .build()
            .unwrap();

        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.algorithm, "sha256");
        assert_eq!(manifest.content_hash, hash.to_hex());
        assert_eq!(manifest.content_uri, "ipfs://bafycontent");
        assert_eq!(
            manifest.creator_did,
            format!("did:pkh:eip155:137:{}", keypair.address().to_hex())
        );
        assert_eq!(manifest.created_at, "2026-01-14T12:00:00.000Z");
        assert_eq!(manifest.signature, sig.to_hex());
        assert!(manifest.attestations.is_empty());
    }

    #[test]
    fn test_build_rejects_malformed_hash() {
        let (keypair, _, sig) = signed(b"x");
        for bad in ["", "0x1234", "deadbeef", "0xnothex"] {
            let err = ManifestBuilder::new(bad, keypair.address(), sig)
                .build()
                .unwrap_err();
            assert!(matches!(err, ValidationError::MalformedHash { .. }));
        }
    }

    #[test]
    fn test_build_normalizes_hash_case() {
        let (keypair, hash, sig) = signed(b"case");
        let upper = format!("0x{}", hash.to_hex()[2..].to_uppercase());
        let manifest = ManifestBuilder::new(upper, keypair.address(), sig)
            .build()
            .unwrap();
        assert_eq!(manifest.content_hash, hash.to_hex());
    }

    #[test]
    fn test_json_field_names() {
        let (keypair, hash, sig) = signed(b"json");
        let manifest = ManifestBuilder::new(hash.to_hex(), keypair.address(), sig)
            .build()
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_slice(&manifest.to_json().unwrap()).unwrap();
        for field in [
            "version",
            "algorithm",
            "content_hash",
            "content_uri",
            "creator_did",
            "created_at",
            "signature",
            "attestations",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(Manifest::from_json(&manifest.to_json().unwrap()).unwrap(), manifest);
    }

    #[test]
    fn test_from_json_tolerates_missing_optional_fields() {
        let json = br#"{
            "version": "1.0",
            "algorithm": "sha256",
            "content_hash": "0xb94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
            "creator_did": "did:pkh:eip155:1:0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            "created_at": "2026-01-14T12:00:00Z",
            "signature": "0x00"
        }"#;
        let manifest = Manifest::from_json(json).unwrap();
        assert_eq!(manifest.content_uri, "");
        assert!(manifest.attestations.is_empty());
        assert!(manifest.parsed_signature().is_err());
        assert!(manifest.created_at().is_ok());
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            Manifest::from_json(b"not json"),
            Err(ValidationError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_did_parse_and_display() {
        let did = CreatorDid::parse(
            "did:pkh:eip155:1:0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf",
        )
        .unwrap();
        assert_eq!(did.chain_id, 1);
        assert_eq!(
            did.to_string(),
            "did:pkh:eip155:1:0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
        assert!(CreatorDid::parse("did:key:z6Mk").is_err());
        assert!(CreatorDid::parse("did:pkh:eip155:abc:0x00").is_err());
        assert!(CreatorDid::parse("did:pkh:eip155:1").is_err());
    }
}
