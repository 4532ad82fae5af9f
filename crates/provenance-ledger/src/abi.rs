//! Contract ABI encoding for the provenance registry.
//!
//! Covers exactly the value types the registry uses: `address`, `bytes32`,
//! `string` and `uint64`. Calldata is a 4-byte selector followed by the
//! standard head/tail encoding of the arguments.

use provenance_core::{keccak256, Address};

use crate::error::LedgerError;

/// Contract function signatures.
pub mod functions {
    pub const REGISTER: &str = "register(bytes32,string)";
    pub const UPDATE_MANIFEST: &str = "updateManifest(bytes32,string)";
    pub const REVOKE: &str = "revoke(bytes32)";
    pub const BIND_PLATFORM: &str = "bindPlatform(bytes32,string,string)";
    pub const ENTRIES: &str = "entries(bytes32)";
    pub const RESOLVE_BY_PLATFORM: &str = "resolveByPlatform(string,string)";
}

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Selector of the `Panic(uint256)` revert payload.
pub const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

const WORD: usize = 32;

/// A value passed to or returned from the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Bytes32([u8; 32]),
    String(String),
    Uint(u64),
}

impl Token {
    fn static_word(&self) -> [u8; WORD] {
        let mut word = [0u8; WORD];
        match self {
            Token::Address(addr) => word[12..].copy_from_slice(addr.as_bytes()),
            Token::Bytes32(b) => word.copy_from_slice(b),
            Token::Uint(n) => word[24..].copy_from_slice(&n.to_be_bytes()),
            Token::String(_) => {}
        }
        word
    }
}

/// Shape of a value to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bytes32,
    String,
    Uint64,
}

/// First four bytes of the keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Encode arguments without a selector.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            Token::String(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(s.len() as u64));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.resize(tail.len() + pad, 0);
            }
            _ => head.extend_from_slice(&token.static_word()),
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Encode a call: selector of `signature` followed by the arguments.
pub fn encode_call(signature: &str, tokens: &[Token]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&encode(tokens));
    out
}

/// Decode return data into tokens of the given shapes.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, LedgerError> {
    if data.len() < types.len() * WORD {
        return Err(invalid(format!(
            "expected at least {} bytes of return data, got {}",
            types.len() * WORD,
            data.len()
        )));
    }

    types
        .iter()
        .enumerate()
        .map(|(i, ty)| {
            let word = read_word(data, i * WORD)?;
            match ty {
                ParamType::Address => {
                    if word[..12].iter().any(|b| *b != 0) {
                        return Err(invalid("address word has non-zero padding"));
                    }
                    let mut addr = [0u8; 20];
                    addr.copy_from_slice(&word[12..]);
                    Ok(Token::Address(Address(addr)))
                }
                ParamType::Bytes32 => Ok(Token::Bytes32(word)),
                ParamType::Uint64 => Ok(Token::Uint(word_to_u64(&word)?)),
                ParamType::String => {
                    let offset = word_to_usize(&word)?;
                    let len = word_to_usize(&read_word(data, offset)?)?;
                    let start = offset
                        .checked_add(WORD)
                        .ok_or_else(|| invalid("string offset overflow"))?;
                    let end = start
                        .checked_add(len)
                        .filter(|end| *end <= data.len())
                        .ok_or_else(|| invalid("string runs past end of data"))?;
                    let s = std::str::from_utf8(&data[start..end])
                        .map_err(|e| invalid(format!("string is not UTF-8: {e}")))?;
                    Ok(Token::String(s.to_string()))
                }
            }
        })
        .collect()
}

/// Why a contract call reverted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revert {
    AlreadyRegistered,
    AlreadyBound,
    AccessDenied,
    NotFound,
    /// Anything that maps to no registry rule, with whatever reason was given.
    Other(String),
}

/// Custom errors the registry contract may revert with.
const CUSTOM_ERRORS: &[(&str, Revert)] = &[
    ("AlreadyRegistered()", Revert::AlreadyRegistered),
    ("AlreadyBound()", Revert::AlreadyBound),
    ("NotCreator()", Revert::AccessDenied),
    ("Unauthorized()", Revert::AccessDenied),
    ("NotFound()", Revert::NotFound),
    ("NotRegistered()", Revert::NotFound),
];

/// Classify raw revert data.
pub fn classify_revert_data(data: &[u8]) -> Revert {
    if data.len() < 4 {
        return Revert::Other("empty revert data".to_string());
    }
    let sel = [data[0], data[1], data[2], data[3]];

    if sel == ERROR_STRING_SELECTOR {
        return match decode(&[ParamType::String], &data[4..]) {
            Ok(tokens) => match tokens.as_slice() {
                [Token::String(reason)] => classify_revert_reason(reason),
                _ => Revert::Other("malformed Error(string)".to_string()),
            },
            Err(e) => Revert::Other(e.to_string()),
        };
    }
    if sel == PANIC_SELECTOR {
        let code = read_word(&data[4..], 0)
            .ok()
            .and_then(|w| word_to_u64(&w).ok())
            .unwrap_or_default();
        return Revert::Other(format!("panic 0x{code:02x}"));
    }

    for (signature, revert) in CUSTOM_ERRORS {
        if selector(signature) == sel {
            return revert.clone();
        }
    }
    Revert::Other(format!("unknown error selector 0x{}", hex::encode(sel)))
}

/// Classify a human-readable revert reason.
pub fn classify_revert_reason(reason: &str) -> Revert {
    let lower = reason.to_ascii_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["already registered"]) {
        Revert::AlreadyRegistered
    } else if has(&["already bound"]) {
        Revert::AlreadyBound
    } else if has(&["not creator", "only creator", "unauthorized", "access denied"]) {
        Revert::AccessDenied
    } else if has(&["not found", "not registered", "does not exist"]) {
        Revert::NotFound
    } else {
        Revert::Other(reason.to_string())
    }
}

fn uint_word(n: u64) -> [u8; WORD] {
    Token::Uint(n).static_word()
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; WORD], LedgerError> {
    let end = offset
        .checked_add(WORD)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| invalid(format!("no word at offset {offset}")))?;
    let mut word = [0u8; WORD];
    word.copy_from_slice(&data[offset..end]);
    Ok(word)
}

fn word_to_u64(word: &[u8; WORD]) -> Result<u64, LedgerError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(invalid("integer does not fit in 64 bits"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(buf))
}

fn word_to_usize(word: &[u8; WORD]) -> Result<usize, LedgerError> {
    usize::try_from(word_to_u64(word)?).map_err(|_| invalid("offset does not fit in usize"))
}

fn invalid(msg: impl Into<String>) -> LedgerError {
    LedgerError::InvalidResponse(msg.into())
}
