//! Property tests over hashing, signing, platform parsing and the ledger
//! rules.

use std::collections::HashMap;

use proptest::prelude::*;
use provenance_core::{
    hash_bytes, hash_reader, parse_platform_url, platform_key, Address, ContentHash,
};
use provenance_ledger::{Ledger, LedgerError, MemoryLedger};
use provenance_testkit::generators::{
    content, content_hash, keypair, ledger_ops, platform, platform_id, youtube_url, LedgerOp,
};

proptest! {
    #[test]
    fn hashing_is_deterministic(data in content(4096)) {
        prop_assert_eq!(hash_bytes(&data), hash_bytes(&data));
        prop_assert_eq!(hash_reader(data.as_slice()).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn one_changed_byte_changes_the_hash(
        data in content(512).prop_filter("non-empty", |d| !d.is_empty()),
        idx in any::<prop::sample::Index>(),
        flip in 1u8..=255
    ) {
        let mut tampered = data.clone();
        let i = idx.index(tampered.len());
        tampered[i] ^= flip;
        prop_assert_ne!(hash_bytes(&data), hash_bytes(&tampered));
    }

    #[test]
    fn signature_recovers_signer(key in keypair(), hash in content_hash()) {
        let sig = key.sign(&hash).unwrap();
        prop_assert_eq!(sig.recover(&hash).unwrap(), key.address());
    }

    #[test]
    fn youtube_urls_parse_to_their_id((url, id) in youtube_url()) {
        let parsed = parse_platform_url(&url).unwrap();
        prop_assert_eq!(parsed.platform, "youtube");
        prop_assert_eq!(parsed.platform_id, id);
    }

    #[test]
    fn platform_keys_separate_components(p in platform(), id in platform_id()) {
        let joined = format!("{p}{id}");
        prop_assert_eq!(platform_key(&p, &id), platform_key(&p, &id));
        prop_assert_ne!(platform_key(&p, &id), platform_key(&joined, ""));
    }
}

const CALLERS: usize = 3;
const HASHES: usize = 3;
const IDS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
struct ModelEntry {
    creator: usize,
    uri: String,
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The in-memory ledger agrees with a reference model on every call,
    /// and failed calls never change state.
    #[test]
    fn ledger_follows_contract_rules(ops in ledger_ops(CALLERS, HASHES, IDS, 40)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let ledger = MemoryLedger::new();
            let callers: Vec<Address> = (0..CALLERS).map(|i| Address([i as u8 + 1; 20])).collect();
            let hashes: Vec<ContentHash> = (0..HASHES).map(|i| hash_bytes(&[i as u8])).collect();
            let mut entries: HashMap<usize, ModelEntry> = HashMap::new();
            let mut bindings: HashMap<usize, usize> = HashMap::new();
            let mut timestamps: HashMap<usize, u64> = HashMap::new();

            for (step, op) in ops.iter().enumerate() {
                match *op {
                    LedgerOp::Register { caller, hash } => {
                        let uri = format!("ipfs://m{step}");
                        let result = ledger.register(callers[caller], &hashes[hash], &uri).await;
                        if entries.contains_key(&hash) {
                            prop_assert_eq!(result.unwrap_err(), LedgerError::AlreadyRegistered(hashes[hash]));
                        } else {
                            prop_assert!(result.is_ok());
                            entries.insert(hash, ModelEntry { creator: caller, uri });
                        }
                    }
                    LedgerOp::Update { caller, hash } => {
                        let uri = format!("ipfs://u{step}");
                        let result = ledger.update_manifest(callers[caller], &hashes[hash], &uri).await;
                        match entries.get_mut(&hash) {
                            None => prop_assert_eq!(result.unwrap_err(), LedgerError::NotFound(hashes[hash])),
                            Some(e) if e.creator != caller => {
                                let denied = matches!(result, Err(LedgerError::AccessDenied { .. }));
                                prop_assert!(denied);
                            }
                            Some(e) => {
                                prop_assert!(result.is_ok());
                                e.uri = uri;
                            }
                        }
                    }
                    LedgerOp::Revoke { caller, hash } => {
                        let result = ledger.revoke(callers[caller], &hashes[hash]).await;
                        match entries.get_mut(&hash) {
                            None => prop_assert_eq!(result.unwrap_err(), LedgerError::NotFound(hashes[hash])),
                            Some(e) if e.creator != caller => {
                                let denied = matches!(result, Err(LedgerError::AccessDenied { .. }));
                                prop_assert!(denied);
                            }
                            Some(e) => {
                                prop_assert!(result.is_ok());
                                e.uri.clear();
                            }
                        }
                    }
                    LedgerOp::Bind { caller, hash, platform_id } => {
                        let id = format!("video{platform_id}");
                        let result = ledger.bind_platform(callers[caller], &hashes[hash], "youtube", &id).await;
                        match entries.get(&hash) {
                            None => prop_assert_eq!(result.unwrap_err(), LedgerError::NotFound(hashes[hash])),
                            Some(e) if e.creator != caller => {
                                let denied = matches!(result, Err(LedgerError::AccessDenied { .. }));
                                prop_assert!(denied);
                            }
                            Some(_) if bindings.contains_key(&platform_id) => {
                                let bound = matches!(result, Err(LedgerError::AlreadyBound { .. }));
                                prop_assert!(bound);
                            }
                            Some(_) => {
                                prop_assert!(result.is_ok());
                                bindings.insert(platform_id, hash);
                            }
                        }
                    }
                }

                for (i, hash) in hashes.iter().enumerate() {
                    let entry = ledger.resolve_by_hash(hash).await.unwrap();
                    match entries.get(&i) {
                        None => prop_assert!(!entry.exists()),
                        Some(model) => {
                            prop_assert_eq!(entry.creator, callers[model.creator]);
                            prop_assert_eq!(&entry.manifest_uri, &model.uri);
                            let first = *timestamps.entry(i).or_insert(entry.timestamp);
                            prop_assert_eq!(entry.timestamp, first);
                        }
                    }
                }
                for id in 0..IDS {
                    let resolved = ledger.resolve_by_platform("youtube", &format!("video{id}")).await.unwrap();
                    match bindings.get(&id) {
                        None => prop_assert!(!resolved.is_bound()),
                        Some(&h) => prop_assert_eq!(resolved.content_hash, hashes[h]),
                    }
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}
