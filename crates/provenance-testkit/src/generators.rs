//! Proptest generators for property-based testing.

use proptest::prelude::*;

use provenance_core::{Address, ContentHash, Keypair};

/// Generate a random keypair. Seeds outside the curve order are skipped.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_filter_map("seed is not a valid scalar", |seed| {
        Keypair::from_seed(&seed).ok()
    })
}

pub fn content_hash() -> impl Strategy<Value = ContentHash> {
    any::<[u8; 32]>().prop_map(ContentHash)
}

pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address)
}

/// Content bytes up to `max_len`.
pub fn content(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// A content-addressed manifest URI.
pub fn manifest_uri() -> impl Strategy<Value = String> {
    "bafy[a-z2-7]{20,40}".prop_map(|cid| format!("ipfs://{cid}"))
}

/// A platform name as the ledger stores it.
pub fn platform() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("youtube".to_string()),
        Just("twitter".to_string()),
        Just("github".to_string()),
        Just("tiktok".to_string()),
        Just("instagram".to_string()),
        "[a-z]{3,12}",
    ]
}

pub fn platform_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_-]{1,24}"
}

/// A YouTube video URL in one of its shapes, with the expected id.
pub fn youtube_url() -> impl Strategy<Value = (String, String)> {
    ("[A-Za-z0-9_-]{11}", 0..5usize).prop_map(|(id, shape)| {
        let url = match shape {
            0 => format!("https://www.youtube.com/watch?v={id}"),
            1 => format!("https://youtu.be/{id}"),
            2 => format!("https://www.youtube.com/embed/{id}"),
            3 => format!("https://youtube.com/shorts/{id}"),
            _ => format!("youtube.com/watch?v={id}&t=42"),
        };
        (url, id)
    })
}

/// One call against a ledger, by index into a small set of callers,
/// hashes and platform identifiers.
#[derive(Debug, Clone)]
pub enum LedgerOp {
    Register { caller: usize, hash: usize },
    Update { caller: usize, hash: usize },
    Revoke { caller: usize, hash: usize },
    Bind { caller: usize, hash: usize, platform_id: usize },
}

/// Sequences of ledger calls over `callers` addresses, `hashes` content
/// hashes and `ids` platform identifiers.
pub fn ledger_ops(
    callers: usize,
    hashes: usize,
    ids: usize,
    max_len: usize,
) -> impl Strategy<Value = Vec<LedgerOp>> {
    let op = prop_oneof![
        (0..callers, 0..hashes).prop_map(|(caller, hash)| LedgerOp::Register { caller, hash }),
        (0..callers, 0..hashes).prop_map(|(caller, hash)| LedgerOp::Update { caller, hash }),
        (0..callers, 0..hashes).prop_map(|(caller, hash)| LedgerOp::Revoke { caller, hash }),
        (0..callers, 0..hashes, 0..ids).prop_map(|(caller, hash, platform_id)| LedgerOp::Bind {
            caller,
            hash,
            platform_id
        }),
    ];
    prop::collection::vec(op, 1..=max_len)
}
