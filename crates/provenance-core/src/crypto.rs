//! Recoverable signatures over content hashes.
//!
//! Signatures are secp256k1 ECDSA over the personal-message digest of the
//! 32 raw hash bytes:
//!
//! ```text
//! digest = keccak256("\x19Ethereum Signed Message:\n32" || hash_bytes)
//! ```
//!
//! The manifest JSON is never signed, so verification does not depend on
//! serialization order or whitespace. The signer's address can be recovered
//! from the hash and the signature alone.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::address::Address;
use crate::error::{SigningError, ValidationError};
use crate::hash::ContentHash;

/// Prefix for personal-message signing of a 32-byte payload.
const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// The digest actually signed for a content hash.
pub fn personal_message_digest(hash: &ContentHash) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX);
    hasher.update(hash.as_bytes());
    hasher.finalize().into()
}

/// Derive the account address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 SEC1 tag; the address is the low 20 bytes of the hash.
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address(out)
}

/// A 65-byte `r || s || v` signature, `v` in {27, 28}.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; 65]);

impl RecoverableSignature {
    pub const fn from_bytes(bytes: [u8; 65]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Render as `0x` + 130 hex characters.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse a `0x`-prefixed 65-byte signature.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let digits = s.strip_prefix("0x").ok_or_else(|| {
            ValidationError::MalformedSignature("missing 0x prefix".into())
        })?;
        if digits.len() != 130 {
            return Err(ValidationError::MalformedSignature(format!(
                "expected 130 hex characters, got {}",
                digits.len()
            )));
        }
        let mut arr = [0u8; 65];
        hex::decode_to_slice(digits, &mut arr)
            .map_err(|e| ValidationError::MalformedSignature(e.to_string()))?;
        Ok(Self(arr))
    }

    /// Recover the address that produced this signature over `hash`.
    pub fn recover(&self, hash: &ContentHash) -> Result<Address, ValidationError> {
        recover_signer(hash, self)
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({}...)", &self.to_hex()[..18])
    }
}

impl fmt::Display for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for RecoverableSignature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for RecoverableSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RecoverableSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Recover the signer address of `signature` over `hash`.
///
/// Accepts `v` in {0, 1, 27, 28}. High-S signatures are normalized before
/// recovery.
pub fn recover_signer(
    hash: &ContentHash,
    signature: &RecoverableSignature,
) -> Result<Address, ValidationError> {
    let bytes = signature.as_bytes();
    let v = match bytes[64] {
        0 | 1 => bytes[64],
        27 | 28 => bytes[64] - 27,
        other => {
            return Err(ValidationError::MalformedSignature(format!(
                "invalid recovery byte {other}"
            )))
        }
    };
    let mut recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| ValidationError::MalformedSignature(format!("invalid recovery id {v}")))?;
    let mut sig = Signature::from_slice(&bytes[..64])
        .map_err(|e| ValidationError::MalformedSignature(e.to_string()))?;
    if let Some(normalized) = sig.normalize_s() {
        sig = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let digest = personal_message_digest(hash);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id)
        .map_err(|e| ValidationError::MalformedSignature(format!("recovery failed: {e}")))?;
    Ok(address_of(&key))
}

/// A holder of a signing key.
///
/// Implementations may prompt a user or a hardware device; a refusal
/// surfaces as [`SigningError::Rejected`].
#[async_trait]
pub trait Signer: Send + Sync {
    /// The address signatures from this holder recover to.
    fn address(&self) -> Address;

    /// Sign the raw bytes of a content hash.
    async fn sign_hash(&self, hash: &ContentHash) -> Result<RecoverableSignature, SigningError>;
}

/// A secp256k1 key held in process memory.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, SigningError> {
        let signing_key = SigningKey::from_slice(seed)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Parse a hex-encoded secret scalar, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, SigningError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let mut seed = [0u8; 32];
        hex::decode_to_slice(digits, &mut seed)
            .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
        Self::from_seed(&seed)
    }

    /// The address this key signs as.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign the raw bytes of a content hash.
    pub fn sign(&self, hash: &ContentHash) -> Result<RecoverableSignature, SigningError> {
        let digest = personal_message_digest(hash);
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| SigningError::Failed(e.to_string()))?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Ok(RecoverableSignature(out))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.address())
    }
}

#[async_trait]
impl Signer for Keypair {
    fn address(&self) -> Address {
        Keypair::address(self)
    }

    async fn sign_hash(&self, hash: &ContentHash) -> Result<RecoverableSignature, SigningError> {
        self.sign(hash)
    }
}
