//! Golden test vectors.
//!
//! Fixed inputs with independently computed outputs. Any implementation of
//! the engine must reproduce them bit for bit, or it will disagree with the
//! deployed contract and with existing manifests.

/// SHA-256 content hash of a byte string.
#[derive(Debug, Clone, Copy)]
pub struct HashVector {
    pub name: &'static str,
    pub input: &'static [u8],
    /// `0x`-prefixed lowercase hex.
    pub content_hash: &'static str,
}

/// Address derived from a secret scalar.
#[derive(Debug, Clone, Copy)]
pub struct KeyVector {
    pub name: &'static str,
    /// 32-byte secret scalar, hex without prefix.
    pub secret: &'static str,
    /// Lowercase `0x` address.
    pub address: &'static str,
}

/// `keccak256(platform ":" platform_id)`.
#[derive(Debug, Clone, Copy)]
pub struct PlatformKeyVector {
    pub platform: &'static str,
    pub platform_id: &'static str,
    /// Hex without prefix.
    pub key: &'static str,
}

/// Four-byte selector of a contract signature.
#[derive(Debug, Clone, Copy)]
pub struct SelectorVector {
    pub signature: &'static str,
    pub selector: [u8; 4],
}

pub fn hash_vectors() -> Vec<HashVector> {
    vec![
        HashVector {
            name: "empty",
            input: b"",
            content_hash: "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        HashVector {
            name: "abc",
            input: b"abc",
            content_hash: "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        HashVector {
            name: "hello world",
            input: b"hello world",
            content_hash: "0xb94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        },
    ]
}

pub fn key_vectors() -> Vec<KeyVector> {
    vec![
        KeyVector {
            name: "scalar one",
            secret: "0000000000000000000000000000000000000000000000000000000000000001",
            address: "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
        },
        KeyVector {
            name: "scalar two",
            secret: "0000000000000000000000000000000000000000000000000000000000000002",
            address: "0x2b5ad5c4795c026514f8317c7a215e218dccd6cf",
        },
        KeyVector {
            name: "account example",
            secret: "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
            address: "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23",
        },
        KeyVector {
            name: "repeated 0x01",
            secret: "0101010101010101010101010101010101010101010101010101010101010101",
            address: "0x1a642f0e3c3af545e7acbd38b07251b3990914f1",
        },
        KeyVector {
            name: "repeated 0x42",
            secret: "4242424242424242424242424242424242424242424242424242424242424242",
            address: "0x17c5185167401ed00cf5f5b2fc97d9bbfdb7d025",
        },
    ]
}

pub fn platform_key_vectors() -> Vec<PlatformKeyVector> {
    vec![
        PlatformKeyVector {
            platform: "youtube",
            platform_id: "abc123",
            key: "fd81346c7140a22c54c5488b26caa45917810d35313fbdd4d89028a7195eeca6",
        },
        PlatformKeyVector {
            platform: "tiktok",
            platform_id: "does-not-exist",
            key: "323e0fb16f99db2d24ca92ca3bc5feabdeb322215da200088f72c57c46e2122f",
        },
        PlatformKeyVector {
            platform: "github",
            platform_id: "rust-lang/rust",
            key: "e2c2f91d13c28f97f316fe046660c8a03a17669309714e80c6566c373e5317ae",
        },
    ]
}

pub fn selector_vectors() -> Vec<SelectorVector> {
    vec![
        SelectorVector {
            signature: "register(bytes32,string)",
            selector: [0xcf, 0x2d, 0x31, 0xfb],
        },
        SelectorVector {
            signature: "updateManifest(bytes32,string)",
            selector: [0xae, 0xcf, 0xba, 0x31],
        },
        SelectorVector {
            signature: "revoke(bytes32)",
            selector: [0xb7, 0x5c, 0x7d, 0xc6],
        },
        SelectorVector {
            signature: "bindPlatform(bytes32,string,string)",
            selector: [0x9f, 0x0d, 0x1a, 0x1b],
        },
        SelectorVector {
            signature: "entries(bytes32)",
            selector: [0x26, 0x7b, 0x69, 0x22],
        },
        SelectorVector {
            signature: "resolveByPlatform(string,string)",
            selector: [0xd9, 0xc5, 0xe6, 0x60],
        },
        SelectorVector {
            signature: "Error(string)",
            selector: [0x08, 0xc3, 0x79, 0xa0],
        },
        SelectorVector {
            signature: "AlreadyRegistered()",
            selector: [0x3a, 0x81, 0xd6, 0xfc],
        },
    ]
}

/// keccak256 of the empty string.
pub const KECCAK_EMPTY: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

/// The digest signed for the "hello world" content hash:
/// `keccak256("\x19Ethereum Signed Message:\n32" || sha256("hello world"))`.
pub const HELLO_WORLD_SIGNED_DIGEST: &str =
    "e7056a7651682c7da5ae015736d62a9b40d85217baa08429b466c483dc2b1dc2";
