//! # EVM JSON-RPC Ledger
//!
//! Talks to the provenance registry contract on an EVM-compatible chain.
//!
//! ## How It Works
//!
//! 1. Reads are `eth_call` against the `latest` block.
//! 2. Writes are first simulated with `eth_call` from the caller, so a
//!    business-rule revert (`AlreadyRegistered`, `AccessDenied`, ...) is
//!    reported without spending gas.
//! 3. The transaction is then sent with `eth_sendTransaction`. The RPC
//!    endpoint signs for the `from` address (unlocked account, HSM or KMS);
//!    this client holds no private keys.
//! 4. `eth_getTransactionReceipt` is polled a bounded number of times. A
//!    mined transaction with status `0x0` lost a race after simulation; the
//!    call is simulated again to recover the reason.
//!
//! Every request carries the client timeout. Transport failures and
//! timeouts surface as [`LedgerError::UpstreamUnavailable`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use provenance_core::{Address, ContentHash};

use crate::abi::{self, functions, ParamType, Revert, Token};
use crate::error::{LedgerError, Result};
use crate::traits::Ledger;
use crate::types::{LedgerEntry, PlatformEntry, TxReceipt};

/// Configuration for [`RpcLedger`].
#[derive(Debug, Clone, Deserialize)]
pub struct RpcLedgerConfig {
    /// JSON-RPC endpoint URL (HTTPS in production).
    pub rpc_url: String,
    /// Address of the registry contract.
    pub contract_address: Address,
    /// EVM chain ID (1 for Ethereum mainnet).
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Delay between receipt polls.
    #[serde(default = "default_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    /// Polls before a sent transaction is reported unavailable.
    #[serde(default = "default_max_polls")]
    pub receipt_max_polls: u32,
}

fn default_chain_id() -> u64 {
    provenance_core::DEFAULT_CHAIN_ID
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_polls() -> u32 {
    60
}

impl RpcLedgerConfig {
    /// Defaults: mainnet, 30s timeout, 60 receipt polls one second apart.
    pub fn new(rpc_url: impl Into<String>, contract_address: Address) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract_address,
            chain_id: default_chain_id(),
            timeout_secs: default_timeout_secs(),
            receipt_poll_interval_ms: default_poll_interval_ms(),
            receipt_max_polls: default_max_polls(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the receipt polling schedule.
    pub fn with_receipt_polling(mut self, interval_ms: u64, max_polls: u32) -> Self {
        self.receipt_poll_interval_ms = interval_ms;
        self.receipt_max_polls = max_polls;
        self
    }
}

/// JSON-RPC error code nodes use for a reverted execution.
const EXECUTION_ERROR_CODE: i64 = 3;

/// Failure of a single JSON-RPC request.
enum RpcFailure {
    Ledger(LedgerError),
    /// The node answered with a JSON-RPC error object.
    Node {
        code: Option<i64>,
        message: String,
        data: Option<String>,
    },
}

impl From<LedgerError> for RpcFailure {
    fn from(e: LedgerError) -> Self {
        RpcFailure::Ledger(e)
    }
}

impl RpcFailure {
    /// Classify a node error as a contract revert.
    ///
    /// Only errors carrying revert data, the execution-error code or an
    /// `execution reverted` message count. Rate limits, internal errors and
    /// missing state are node problems and yield `None`.
    fn revert(&self) -> Option<Revert> {
        match self {
            RpcFailure::Ledger(_) => None,
            RpcFailure::Node {
                code,
                message,
                data,
            } => {
                let from_data = data
                    .as_deref()
                    .and_then(|d| hex::decode(d.trim_start_matches("0x")).ok())
                    .filter(|d| d.len() >= 4)
                    .map(|d| abi::classify_revert_data(&d));
                let reverted = from_data.is_some()
                    || *code == Some(EXECUTION_ERROR_CODE)
                    || message
                        .to_ascii_lowercase()
                        .starts_with("execution reverted");
                if !reverted {
                    return None;
                }
                match from_data {
                    Some(Revert::Other(_)) | None => Some(abi::classify_revert_reason(message)),
                    Some(known) => Some(known),
                }
            }
        }
    }
}

/// What a write was trying to do, used to build typed errors from reverts.
#[derive(Debug, Clone, Copy)]
enum WriteContext<'a> {
    Register,
    Mutate,
    Bind {
        platform: &'a str,
        platform_id: &'a str,
    },
}

/// Ledger backed by a registry contract over EVM JSON-RPC.
#[derive(Debug)]
pub struct RpcLedger {
    client: reqwest::Client,
    config: RpcLedgerConfig,
}

impl RpcLedger {
    /// Create a client from configuration.
    pub fn new(config: RpcLedgerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                LedgerError::UpstreamUnavailable(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RpcLedgerConfig {
        &self.config
    }

    /// Send a JSON-RPC request and return the `result` field.
    async fn rpc_call(&self, method: &str, params: Value) -> std::result::Result<Value, RpcFailure> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("{method}: request timed out")
                } else {
                    format!("{method}: {e}")
                };
                LedgerError::UpstreamUnavailable(reason)
            })?;

        if !resp.status().is_success() {
            return Err(LedgerError::UpstreamUnavailable(format!(
                "{method}: HTTP {}",
                resp.status()
            ))
            .into());
        }

        let json: Value = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                LedgerError::UpstreamUnavailable(format!("{method}: request timed out"))
            } else {
                LedgerError::InvalidResponse(format!("{method}: invalid JSON response: {e}"))
            }
        })?;

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown RPC error")
                .to_string();
            let code = error.get("code").and_then(|c| c.as_i64());
            let data = error.get("data").and_then(revert_data_field);
            return Err(RpcFailure::Node {
                code,
                message,
                data,
            });
        }

        json.get("result").cloned().ok_or_else(|| {
            LedgerError::InvalidResponse(format!("{method}: response missing 'result' field"))
                .into()
        })
    }

    /// `eth_call` against the contract, optionally from a given account.
    async fn call(
        &self,
        from: Option<Address>,
        calldata: &[u8],
    ) -> std::result::Result<Vec<u8>, RpcFailure> {
        let mut tx = json!({
            "to": self.config.contract_address.to_hex(),
            "data": format!("0x{}", hex::encode(calldata)),
        });
        if let Some(from) = from {
            tx["from"] = json!(from.to_hex());
        }
        let result = self.rpc_call("eth_call", json!([tx, "latest"])).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| LedgerError::InvalidResponse("eth_call returned non-string".into()))?;
        Ok(decode_hex_data(hex_str)?)
    }

    /// Read-only call; any node error is a transport-level problem.
    async fn read(&self, calldata: &[u8]) -> Result<Vec<u8>> {
        self.call(None, calldata).await.map_err(|f| match f {
            RpcFailure::Ledger(e) => e,
            RpcFailure::Node { message, .. } => {
                LedgerError::UpstreamUnavailable(format!("eth_call: {message}"))
            }
        })
    }

    /// Simulate, send and wait for a state-changing call.
    async fn transact(
        &self,
        caller: Address,
        hash: &ContentHash,
        calldata: Vec<u8>,
        ctx: WriteContext<'_>,
    ) -> Result<TxReceipt> {
        self.call(Some(caller), &calldata)
            .await
            .map_err(|f| self.write_error(f, caller, hash, ctx))?;

        let tx = json!({
            "from": caller.to_hex(),
            "to": self.config.contract_address.to_hex(),
            "data": format!("0x{}", hex::encode(&calldata)),
        });
        let result = self
            .rpc_call("eth_sendTransaction", json!([tx]))
            .await
            .map_err(|f| self.write_error(f, caller, hash, ctx))?;
        let tx_hash = result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                LedgerError::InvalidResponse("eth_sendTransaction returned non-string".into())
            })?;

        let receipt = self.wait_for_receipt(&tx_hash).await?;
        if receipt.get("status").and_then(|s| s.as_str()) == Some("0x0") {
            // Lost a race after simulation; the replay shows why.
            let reason = match self.call(Some(caller), &calldata).await {
                Err(f) => self.write_error(f, caller, hash, ctx),
                Ok(_) => LedgerError::Reverted(format!("transaction {tx_hash} reverted")),
            };
            tracing::warn!(tx_hash = %tx_hash, error = %reason, "registry transaction reverted");
            return Err(reason);
        }

        let block_number = receipt
            .get("blockNumber")
            .and_then(|b| b.as_str())
            .and_then(parse_quantity)
            .unwrap_or(0);
        tracing::debug!(tx_hash = %tx_hash, block_number, "registry transaction mined");
        Ok(TxReceipt {
            tx_hash,
            block_number,
        })
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<Value> {
        let interval = Duration::from_millis(self.config.receipt_poll_interval_ms);
        for attempt in 0..self.config.receipt_max_polls {
            if attempt > 0 {
                tokio::time::sleep(interval).await;
            }
            let receipt = self
                .rpc_call("eth_getTransactionReceipt", json!([tx_hash]))
                .await
                .map_err(|f| match f {
                    RpcFailure::Ledger(e) => e,
                    RpcFailure::Node { message, .. } => LedgerError::UpstreamUnavailable(
                        format!("eth_getTransactionReceipt: {message}"),
                    ),
                })?;
            if !receipt.is_null() {
                return Ok(receipt);
            }
        }
        Err(LedgerError::UpstreamUnavailable(format!(
            "transaction {tx_hash} not mined after {} polls",
            self.config.receipt_max_polls
        )))
    }

    /// Turn a failed write request into a typed ledger error.
    fn write_error(
        &self,
        failure: RpcFailure,
        caller: Address,
        hash: &ContentHash,
        ctx: WriteContext<'_>,
    ) -> LedgerError {
        let revert = match failure.revert() {
            Some(revert) => revert,
            None => match failure {
                RpcFailure::Ledger(e) => return e,
                RpcFailure::Node { message, .. } => {
                    let err = LedgerError::UpstreamUnavailable(message);
                    tracing::warn!(
                        content_hash = %hash,
                        ?ctx,
                        error = %err,
                        "registry call failed upstream"
                    );
                    return err;
                }
            },
        };
        let err = match (revert, ctx) {
            (Revert::AlreadyRegistered, _) => LedgerError::AlreadyRegistered(*hash),
            (Revert::NotFound, _) => LedgerError::NotFound(*hash),
            (Revert::AccessDenied, _) => LedgerError::AccessDenied {
                caller,
                content_hash: *hash,
            },
            (
                Revert::AlreadyBound,
                WriteContext::Bind {
                    platform,
                    platform_id,
                },
            ) => LedgerError::AlreadyBound {
                platform: platform.to_string(),
                platform_id: platform_id.to_string(),
            },
            (Revert::AlreadyBound, _) => LedgerError::Reverted("already bound".to_string()),
            (Revert::Other(reason), _) => LedgerError::Reverted(reason),
        };
        tracing::warn!(content_hash = %hash, ?ctx, error = %err, "registry call reverted");
        err
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn register(
        &self,
        caller: Address,
        hash: &ContentHash,
        manifest_uri: &str,
    ) -> Result<TxReceipt> {
        let calldata = abi::encode_call(
            functions::REGISTER,
            &[Token::Bytes32(hash.0), Token::String(manifest_uri.to_string())],
        );
        self.transact(caller, hash, calldata, WriteContext::Register)
            .await
    }

    async fn update_manifest(
        &self,
        caller: Address,
        hash: &ContentHash,
        new_manifest_uri: &str,
    ) -> Result<TxReceipt> {
        let calldata = abi::encode_call(
            functions::UPDATE_MANIFEST,
            &[
                Token::Bytes32(hash.0),
                Token::String(new_manifest_uri.to_string()),
            ],
        );
        self.transact(caller, hash, calldata, WriteContext::Mutate)
            .await
    }

    async fn revoke(&self, caller: Address, hash: &ContentHash) -> Result<TxReceipt> {
        let calldata = abi::encode_call(functions::REVOKE, &[Token::Bytes32(hash.0)]);
        self.transact(caller, hash, calldata, WriteContext::Mutate)
            .await
    }

    async fn bind_platform(
        &self,
        caller: Address,
        hash: &ContentHash,
        platform: &str,
        platform_id: &str,
    ) -> Result<TxReceipt> {
        provenance_core::PlatformId::new(platform, platform_id)?;
        let calldata = abi::encode_call(
            functions::BIND_PLATFORM,
            &[
                Token::Bytes32(hash.0),
                Token::String(platform.to_string()),
                Token::String(platform_id.to_string()),
            ],
        );
        self.transact(
            caller,
            hash,
            calldata,
            WriteContext::Bind {
                platform,
                platform_id,
            },
        )
        .await
    }

    async fn resolve_by_hash(&self, hash: &ContentHash) -> Result<LedgerEntry> {
        let calldata = abi::encode_call(functions::ENTRIES, &[Token::Bytes32(hash.0)]);
        let data = self.read(&calldata).await?;
        let tokens = abi::decode(
            &[ParamType::Address, ParamType::String, ParamType::Uint64],
            &data,
        )?;
        match tokens.as_slice() {
            [Token::Address(creator), Token::String(uri), Token::Uint(timestamp)] => {
                Ok(LedgerEntry {
                    creator: *creator,
                    manifest_uri: uri.clone(),
                    timestamp: *timestamp,
                })
            }
            _ => Err(LedgerError::InvalidResponse(
                "entries() returned unexpected tuple".into(),
            )),
        }
    }

    async fn resolve_by_platform(
        &self,
        platform: &str,
        platform_id: &str,
    ) -> Result<PlatformEntry> {
        let calldata = abi::encode_call(
            functions::RESOLVE_BY_PLATFORM,
            &[
                Token::String(platform.to_string()),
                Token::String(platform_id.to_string()),
            ],
        );
        let data = self.read(&calldata).await?;
        let tokens = abi::decode(
            &[
                ParamType::Address,
                ParamType::Bytes32,
                ParamType::String,
                ParamType::Uint64,
            ],
            &data,
        )?;
        match tokens.as_slice() {
            [Token::Address(creator), Token::Bytes32(hash), Token::String(uri), Token::Uint(timestamp)] => {
                Ok(PlatformEntry {
                    content_hash: ContentHash(*hash),
                    entry: LedgerEntry {
                        creator: *creator,
                        manifest_uri: uri.clone(),
                        timestamp: *timestamp,
                    },
                })
            }
            _ => Err(LedgerError::InvalidResponse(
                "resolveByPlatform() returned unexpected tuple".into(),
            )),
        }
    }
}

/// Revert payloads arrive either as a bare hex string or nested under
/// `data` / `originalError.data`, depending on the node.
fn revert_data_field(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map
            .get("data")
            .and_then(revert_data_field)
            .or_else(|| map.get("originalError").and_then(revert_data_field)),
        _ => None,
    }
}

fn decode_hex_data(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| LedgerError::InvalidResponse(format!("invalid hex data: {e}")))
}

fn parse_quantity(s: &str) -> Option<u64> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RpcLedgerConfig::new("https://rpc.example", Address([1; 20]));
        assert_eq!(config.chain_id, 1);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.receipt_max_polls, 60);

        let config = config.with_chain_id(137).with_receipt_polling(10, 3);
        assert_eq!(config.chain_id, 137);
        assert_eq!(config.receipt_poll_interval_ms, 10);
        assert_eq!(config.receipt_max_polls, 3);
    }

    #[test]
    fn test_config_deserialize_fills_defaults() {
        let config: RpcLedgerConfig = serde_json::from_value(json!({
            "rpc_url": "https://rpc.example",
            "contract_address": "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        }))
        .unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.receipt_poll_interval_ms, 1_000);
    }

    #[test]
    fn test_revert_data_field_shapes() {
        assert_eq!(
            revert_data_field(&json!("0x08c379a0")),
            Some("0x08c379a0".to_string())
        );
        assert_eq!(
            revert_data_field(&json!({"originalError": {"data": "0xdead"}})),
            Some("0xdead".to_string())
        );
        assert_eq!(revert_data_field(&json!(3)), None);
    }

    #[test]
    fn test_node_failure_falls_back_to_message() {
        let failure = RpcFailure::Node {
            code: None,
            message: "execution reverted: already registered".into(),
            data: None,
        };
        assert_eq!(failure.revert(), Some(Revert::AlreadyRegistered));

        let failure = RpcFailure::Node {
            code: Some(3),
            message: "execution reverted".into(),
            data: Some(format!("0x{}", hex::encode(abi::selector("NotCreator()")))),
        };
        assert_eq!(failure.revert(), Some(Revert::AccessDenied));
    }

    #[test]
    fn test_node_errors_are_not_reverts() {
        for (code, message) in [
            (-32005, "daily request count exceeded, request rate limited"),
            (-32603, "internal error"),
            (-32000, "header not found"),
        ] {
            let failure = RpcFailure::Node {
                code: Some(code),
                message: message.into(),
                data: None,
            };
            assert_eq!(failure.revert(), None, "{message}");
        }

        let failure = RpcFailure::Node {
            code: Some(3),
            message: "reverted".into(),
            data: None,
        };
        assert_eq!(failure.revert(), Some(Revert::Other("reverted".into())));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4"), Some(436));
        assert_eq!(parse_quantity("0x"), None);
    }
}
