//! Daemon data types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status string the daemon reports on success.
pub const STATUS_OK: &str = "OK";

/// Whether a response status means success. Older daemons omit the field on
/// some endpoints, so an empty status counts as success.
pub fn is_status_ok(status: &str) -> bool {
    status.is_empty() || status == STATUS_OK
}

/// Errors that can occur while talking to the daemon.
///
/// Logical "not found" outcomes are never errors; lookups report them as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The HTTP client could not be constructed (bad proxy, TLS setup).
    #[error("Failed to configure daemon transport: {0}")]
    Connect(String),

    /// Connection or request failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Request timed out.
    #[error("Daemon request timed out after {0} seconds")]
    Timeout(u64),

    /// The daemon's authentication challenge could not be answered.
    #[error("Daemon authentication failed: {0}")]
    Auth(String),

    /// Daemon answered with a non-success HTTP status.
    #[error("Daemon returned HTTP status {0}")]
    HttpStatus(u16),

    /// Daemon answered with a JSON-RPC error object.
    #[error("Daemon RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Daemon answered with a status other than `OK` on a call that must succeed.
    #[error("Daemon reported status '{0}'")]
    Status(String),

    /// Response body did not match the expected shape.
    #[error("Malformed daemon response: {0}")]
    Decode(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;

/// Summary of a block as reported by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub hash: String,
    /// Seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default, rename = "num_txes")]
    pub tx_count: u64,
    /// Size in bytes.
    #[serde(default, rename = "block_size")]
    pub size: u64,
    #[serde(default)]
    pub difficulty: u64,
    /// Reward in atomic units.
    #[serde(default)]
    pub reward: u64,
}

/// A block header together with its transaction hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockDetail {
    pub header: BlockHeader,
    /// Non-coinbase transactions, in block order.
    pub tx_hashes: Vec<String>,
    pub miner_tx_hash: String,
}

impl BlockDetail {
    /// Every transaction hash in the block, coinbase last.
    pub fn all_tx_hashes(&self) -> impl Iterator<Item = &str> {
        self.tx_hashes
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.miner_tx_hash.as_str()))
    }
}

/// A transaction as reported by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, rename = "tx_hash")]
    pub hash: String,
    #[serde(default)]
    pub as_hex: String,
    /// Height of the containing block, 0 while unconfirmed.
    #[serde(default)]
    pub block_height: u64,
    #[serde(default)]
    pub block_timestamp: u64,
    #[serde(default, rename = "double_spend_seen")]
    pub double_spend: bool,
    #[serde(default)]
    pub in_pool: bool,
}

impl TransactionRecord {
    pub fn is_confirmed(&self) -> bool {
        self.block_height != 0
    }

    /// Size in bytes derived from the hex payload.
    pub fn size(&self) -> usize {
        self.as_hex.len() / 2
    }
}

/// Network-wide statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    #[serde(default)]
    pub difficulty: u64,
    #[serde(default)]
    pub tx_count: u64,
    #[serde(default)]
    pub height: u64,
}

/// How a block is addressed in a `get_block` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSelector {
    Height(u64),
    Hash(String),
}

impl BlockSelector {
    /// Interpret a user-supplied block id: decimal digits are a height,
    /// anything else is a hash.
    pub fn parse(id: &str) -> Self {
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(height) = id.parse() {
                return BlockSelector::Height(height);
            }
        }
        BlockSelector::Hash(id.to_string())
    }

    pub(crate) fn to_params(&self) -> serde_json::Value {
        match self {
            BlockSelector::Height(height) => serde_json::json!({ "height": height }),
            BlockSelector::Hash(hash) => serde_json::json!({ "hash": hash }),
        }
    }
}

// Wire shapes of individual RPC responses.

#[derive(Debug, Deserialize)]
pub(crate) struct HeightResponse {
    pub height: u64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct InfoResponse {
    #[serde(flatten)]
    pub info: ChainInfo,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeadersRangeResponse {
    #[serde(default)]
    pub headers: Vec<BlockHeader>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeaderByHeightResponse {
    pub block_header: Option<BlockHeader>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeaderByHashResponse {
    #[serde(default)]
    pub block_headers: Vec<BlockHeader>,
    pub block_header: Option<BlockHeader>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GetBlockResponse {
    pub block_header: Option<BlockHeader>,
    /// Block body as a JSON document embedded in a string.
    #[serde(default)]
    pub json: String,
    #[serde(default)]
    pub miner_tx_hash: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockBody {
    #[serde(default)]
    pub tx_hashes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsResponse {
    #[serde(default)]
    pub txs: Vec<TransactionRecord>,
    #[serde(default)]
    pub status: String,
}
