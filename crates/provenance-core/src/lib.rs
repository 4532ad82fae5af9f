//! # Provenance Core
//!
//! Pure primitives for the provenance engine: content hashes, addresses,
//! recoverable signatures, manifests, and platform identifiers.
//!
//! This crate performs no network I/O. The only I/O is reading a content
//! stream while hashing it.
//!
//! ## Key Types
//!
//! - [`ContentHash`] - SHA-256 content address, the primary key of a claim
//! - [`Address`] - 20-byte account address of a creator
//! - [`RecoverableSignature`] - signature the signer's address can be recovered from
//! - [`Signer`] - a holder of a signing key ([`Keypair`] holds one in memory)
//! - [`Manifest`] - the signed off-ledger document, built with [`ManifestBuilder`]
//! - [`PlatformParser`] - maps hosting-platform URLs to [`PlatformId`]s
//!
//! ## Signing
//!
//! Signatures cover the raw 32 hash bytes, never the manifest JSON. See the
//! [`crypto`] module.

pub mod address;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod platform;

pub use address::Address;
pub use crypto::{
    keccak256, personal_message_digest, recover_signer, Keypair, RecoverableSignature, Signer,
};
pub use error::{CoreError, Result, SigningError, ValidationError};
pub use hash::{hash_bytes, hash_file, hash_reader, ContentHash, HASH_ALGORITHM, HASH_CHUNK_SIZE};
pub use manifest::{CreatorDid, Manifest, ManifestBuilder, DEFAULT_CHAIN_ID, MANIFEST_VERSION};
pub use platform::{parse_platform_url, platform_key, PlatformId, PlatformMatcher, PlatformParser};
