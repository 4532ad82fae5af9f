//! Content hashing.
//!
//! A [`ContentHash`] is the SHA-256 digest of a byte stream, rendered as
//! `0x` followed by 64 lowercase hex characters. It is the primary key of a
//! provenance claim.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, ValidationError};

/// Size of each read from a content stream.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Prefix carried by every rendered content hash.
pub const HASH_PREFIX: &str = "0x";

/// Name of the digest algorithm, as recorded in manifests.
pub const HASH_ALGORITHM: &str = "sha256";

/// A 32-byte content address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// The all-zero hash, returned by the ledger for unbound platform keys.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create from raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render as `0x` + 64 lowercase hex characters.
    pub fn to_hex(&self) -> String {
        format!("{HASH_PREFIX}{}", hex::encode(self.0))
    }

    /// Parse a rendered hash. Hex digits may be of either case.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedHash {
            value: s.to_string(),
        };
        let digits = s.strip_prefix(HASH_PREFIX).ok_or_else(malformed)?;
        if digits.len() != 64 {
            return Err(malformed());
        }
        let mut arr = [0u8; 32];
        hex::decode_to_slice(digits, &mut arr).map_err(|_| malformed())?;
        Ok(Self(arr))
    }

    /// Whether this is the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}..)", &self.to_hex()[..18])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash an in-memory byte slice.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash(Sha256::digest(data).into())
}

/// Hash a byte stream in fixed-size chunks.
///
/// Memory use is bounded by [`HASH_CHUNK_SIZE`] regardless of the stream's
/// length. The only failure mode is an I/O error from the reader.
pub fn hash_reader<R: Read>(mut reader: R) -> Result<ContentHash, CoreError> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::Io(e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentHash(hasher.finalize().into()))
}

/// Hash the contents of a file on disk.
pub fn hash_file(path: impl AsRef<Path>) -> Result<ContentHash, CoreError> {
    let file = File::open(path)?;
    hash_reader(file)
}
