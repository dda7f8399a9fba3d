//! Daemon query client.
//!
//! # Responsibilities
//! - Expose height/info/block/transaction lookups
//! - Separate "the daemon has no such record" (`Ok(None)`) from
//!   "the call failed" (`Err`)
//! - Recover the transaction list embedded in `get_block` responses

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::daemon::endpoint::DaemonEndpoint;
use crate::daemon::transport::{DaemonTransport, HttpTransport};
use crate::daemon::types::{
    is_status_ok, BlockBody, BlockDetail, BlockHeader, BlockSelector, ChainInfo, DaemonError, DaemonResult,
    GetBlockResponse, HeaderByHashResponse, HeaderByHeightResponse, HeadersRangeResponse,
    HeightResponse, InfoResponse, TransactionRecord, TransactionsResponse,
};
use crate::observability::metrics;

/// How far below the tip the recent-blocks window starts.
pub const RECENT_BLOCKS_DEPTH: u64 = 51;

/// Inclusive height range of the recent-blocks window for chain height `tip`.
///
/// The tip itself is excluded. Returns `None` when the chain has no blocks.
pub fn recent_block_range(tip: u64) -> Option<(u64, u64)> {
    let end = tip.checked_sub(1)?;
    Some((tip.saturating_sub(RECENT_BLOCKS_DEPTH), end))
}

/// Query client for a single daemon.
#[derive(Clone)]
pub struct DaemonClient {
    transport: Arc<dyn DaemonTransport>,
}

impl DaemonClient {
    /// Wrap an existing transport.
    pub fn new(transport: Arc<dyn DaemonTransport>) -> Self {
        Self { transport }
    }

    /// Configure an HTTP transport for `endpoint`. No request is sent.
    pub fn connect(endpoint: &DaemonEndpoint, timeout: Duration) -> DaemonResult<Self> {
        let transport = HttpTransport::connect(endpoint, timeout)?;
        Ok(Self::new(Arc::new(transport)))
    }

    /// Current chain height.
    pub async fn get_height(&self) -> DaemonResult<u64> {
        let response: HeightResponse = decode(self.transport.call("get_height", json!({})).await?)?;
        require_ok(&response.status)?;
        Ok(response.height)
    }

    /// Network difficulty and transaction totals.
    pub async fn get_info(&self) -> DaemonResult<ChainInfo> {
        let response: InfoResponse = decode(self.transport.json_rpc("get_info", json!({})).await?)?;
        require_ok(&response.status)?;
        Ok(response.info)
    }

    /// Headers of the blocks just below the tip, in ascending height order.
    pub async fn get_recent_blocks(&self) -> DaemonResult<Vec<BlockHeader>> {
        let tip = self.get_height().await?;
        let Some((start_height, end_height)) = recent_block_range(tip) else {
            return Ok(Vec::new());
        };

        let response: HeadersRangeResponse = decode(
            self.transport
                .json_rpc(
                    "get_block_headers_range",
                    json!({ "start_height": start_height, "end_height": end_height }),
                )
                .await?,
        )?;
        require_ok(&response.status)?;

        tracing::debug!(
            tip,
            start_height,
            end_height,
            count = response.headers.len(),
            "Fetched recent block headers"
        );
        Ok(response.headers)
    }

    /// Header of the block at `height`, or `None` if there is none.
    pub async fn get_block_by_height(&self, height: u64) -> DaemonResult<Option<BlockHeader>> {
        let response: Option<HeaderByHeightResponse> = self
            .lookup("get_block_header_by_height", json!({ "height": height }))
            .await?;

        Ok(response
            .filter(|r| is_status_ok(&r.status))
            .and_then(|r| r.block_header))
    }

    /// Header of the block with `hash`, or `None` if unknown.
    pub async fn get_block_by_hash(&self, hash: &str) -> DaemonResult<Option<BlockHeader>> {
        let response: Option<HeaderByHashResponse> = self
            .lookup("get_block_header_by_hash", json!({ "hashes": [hash] }))
            .await?;

        Ok(response
            .filter(|r| is_status_ok(&r.status))
            .and_then(|r| r.block_headers.into_iter().next().or(r.block_header)))
    }

    /// Full block with its transaction hashes, or `None` if unknown.
    ///
    /// If the embedded block body cannot be parsed the block is still returned,
    /// with an empty transaction list.
    pub async fn get_block(&self, selector: &BlockSelector) -> DaemonResult<Option<BlockDetail>> {
        let response: Option<GetBlockResponse> =
            self.lookup("get_block", selector.to_params()).await?;

        let Some(response) = response.filter(|r| is_status_ok(&r.status)) else {
            return Ok(None);
        };
        let Some(header) = response.block_header else {
            return Ok(None);
        };

        let tx_hashes = match serde_json::from_str::<BlockBody>(&response.json) {
            Ok(body) => body.tx_hashes,
            Err(e) => {
                tracing::warn!(
                    height = header.height,
                    hash = %header.hash,
                    error = %e,
                    "Could not parse block body, showing no transactions"
                );
                metrics::record_block_body_parse_failure();
                Vec::new()
            }
        };

        Ok(Some(BlockDetail {
            header,
            tx_hashes,
            miner_tx_hash: response.miner_tx_hash,
        }))
    }

    /// Transaction with `hash`, or `None` if the daemon does not know it.
    pub async fn get_transaction(&self, hash: &str) -> DaemonResult<Option<TransactionRecord>> {
        let response: TransactionsResponse = decode(
            self.transport
                .call("get_transactions", json!({ "txs_hashes": [hash] }))
                .await?,
        )?;
        require_ok(&response.status)?;
        Ok(response.txs.into_iter().next())
    }

    /// Run a JSON-RPC lookup, treating an RPC error object as "not found".
    async fn lookup<T: DeserializeOwned>(&self, method: &str, params: Value) -> DaemonResult<Option<T>> {
        match self.transport.json_rpc(method, params).await {
            Ok(value) => decode(value).map(Some),
            Err(DaemonError::Rpc { code, message }) => {
                tracing::debug!(method, code, message = %message, "Daemon reported no such record");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for DaemonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonClient").finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> DaemonResult<T> {
    serde_json::from_value(value).map_err(|e| DaemonError::Decode(e.to_string()))
}

fn require_ok(status: &str) -> DaemonResult<()> {
    if is_status_ok(status) {
        Ok(())
    } else {
        Err(DaemonError::Status(status.to_string()))
    }
}
