//! In-memory daemon used by unit tests across the crate.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::daemon::client::DaemonClient;
use crate::daemon::transport::DaemonTransport;
use crate::daemon::types::{BlockHeader, DaemonError, DaemonResult};

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;
pub const DIFFICULTY: u64 = 300_000_000_000;

#[derive(Default)]
struct MockState {
    height: u64,
    status: String,
    offline: bool,
    failures_remaining: usize,
    txs: HashMap<String, u64>,
    corrupt_bodies: HashSet<u64>,
    hash_overrides: HashMap<u64, String>,
    last_range: Option<(u64, u64)>,
    calls: HashMap<String, usize>,
}

/// Fake daemon holding a synthetic chain.
#[derive(Clone, Default)]
pub struct MockDaemon {
    state: Arc<Mutex<MockState>>,
}

impl MockDaemon {
    /// Chain with `height` blocks (heights `0..height`).
    pub fn with_chain(height: u64) -> Self {
        let daemon = Self::default();
        {
            let mut state = daemon.state.lock().unwrap();
            state.height = height;
            state.status = "OK".to_string();
        }
        daemon
    }

    pub fn client(&self) -> DaemonClient {
        DaemonClient::new(Arc::new(self.clone()))
    }

    pub fn block_hash(height: u64) -> String {
        format!("b{:063x}", height)
    }

    pub fn tx_hash(n: u64) -> String {
        format!("e{:063x}", n)
    }

    pub fn miner_tx_hash(height: u64) -> String {
        format!("c{:063x}", height)
    }

    pub fn set_height(&self, height: u64) {
        self.state.lock().unwrap().height = height;
    }

    pub fn set_status(&self, status: &str) {
        self.state.lock().unwrap().status = status.to_string();
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Fail the next `n` calls with a transport error.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().failures_remaining = n;
    }

    /// Register a transaction mined at `height` (0 = still in the pool).
    pub fn add_transaction(&self, hash: &str, height: u64) {
        self.state.lock().unwrap().txs.insert(hash.to_string(), height);
    }

    pub fn corrupt_block_body(&self, height: u64) {
        self.state.lock().unwrap().corrupt_bodies.insert(height);
    }

    /// Make the daemon report `hash` for the block at `height`.
    pub fn override_block_hash(&self, height: u64, hash: &str) {
        self.state
            .lock()
            .unwrap()
            .hash_overrides
            .insert(height, hash.to_string());
    }

    pub fn last_range(&self) -> Option<(u64, u64)> {
        self.state.lock().unwrap().last_range
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state.lock().unwrap().calls.get(method).copied().unwrap_or(0)
    }

    fn check_reachable(state: &mut MockState, method: &str) -> DaemonResult<()> {
        *state.calls.entry(method.to_string()).or_default() += 1;
        if state.offline {
            return Err(DaemonError::Transport("connection refused".to_string()));
        }
        if state.failures_remaining > 0 {
            state.failures_remaining -= 1;
            return Err(DaemonError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    fn hash_of(state: &MockState, height: u64) -> String {
        state
            .hash_overrides
            .get(&height)
            .cloned()
            .unwrap_or_else(|| Self::block_hash(height))
    }

    fn txs_in_block(state: &MockState, height: u64) -> Vec<String> {
        let mut txs: Vec<String> = state
            .txs
            .iter()
            .filter(|(_, h)| **h == height && height != 0)
            .map(|(hash, _)| hash.clone())
            .collect();
        txs.sort();
        txs
    }

    fn header(state: &MockState, height: u64) -> BlockHeader {
        BlockHeader {
            height,
            hash: Self::hash_of(state, height),
            timestamp: GENESIS_TIMESTAMP + height * 120,
            tx_count: Self::txs_in_block(state, height).len() as u64 + 1,
            size: 1_000 + height,
            difficulty: DIFFICULTY,
            reward: 600_000_000_000,
        }
    }

    fn find_height(state: &MockState, hash: &str) -> Option<u64> {
        (0..state.height).find(|h| Self::hash_of(state, *h) == hash)
    }

    fn not_found(code: i64, message: &str) -> DaemonError {
        DaemonError::Rpc {
            code,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl DaemonTransport for MockDaemon {
    async fn json_rpc(&self, method: &str, params: Value) -> DaemonResult<Value> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&mut state, method)?;
        let status = state.status.clone();

        match method {
            "get_info" => Ok(json!({
                "difficulty": DIFFICULTY,
                "tx_count": 42_000_000u64,
                "height": state.height,
                "status": status,
            })),
            "get_block_headers_range" => {
                let start = params["start_height"].as_u64().unwrap_or_default();
                let end = params["end_height"].as_u64().unwrap_or_default();
                state.last_range = Some((start, end));
                if end >= state.height || start > end {
                    return Err(Self::not_found(-2, "Invalid start/end heights"));
                }
                let headers: Vec<_> = (start..=end).map(|h| Self::header(&state, h)).collect();
                Ok(json!({ "headers": headers, "status": status }))
            }
            "get_block_header_by_height" => {
                let height = params["height"].as_u64().unwrap_or_default();
                if height >= state.height {
                    return Err(Self::not_found(-2, "Requested block height too big"));
                }
                Ok(json!({ "block_header": Self::header(&state, height), "status": status }))
            }
            "get_block_header_by_hash" => {
                let hash = params["hashes"][0].as_str().unwrap_or_default();
                match Self::find_height(&state, hash) {
                    Some(height) => Ok(json!({
                        "block_headers": [Self::header(&state, height)],
                        "status": status,
                    })),
                    None => Err(Self::not_found(-5, "Internal error: can't get block by hash")),
                }
            }
            "get_block" => {
                let height = match (params["height"].as_u64(), params["hash"].as_str()) {
                    (Some(height), _) if height < state.height => Some(height),
                    (None, Some(hash)) => Self::find_height(&state, hash),
                    _ => None,
                };
                let Some(height) = height else {
                    return Err(Self::not_found(-2, "Block not found"));
                };
                let body = if state.corrupt_bodies.contains(&height) {
                    "{\"tx_hashes\": [".to_string()
                } else {
                    json!({ "tx_hashes": Self::txs_in_block(&state, height) }).to_string()
                };
                Ok(json!({
                    "block_header": Self::header(&state, height),
                    "json": body,
                    "miner_tx_hash": Self::miner_tx_hash(height),
                    "status": status,
                }))
            }
            _ => Err(Self::not_found(-32601, "Method not found")),
        }
    }

    async fn call(&self, path: &str, body: Value) -> DaemonResult<Value> {
        let mut state = self.state.lock().unwrap();
        Self::check_reachable(&mut state, path)?;
        let status = state.status.clone();

        match path {
            "get_height" => Ok(json!({ "height": state.height, "status": status })),
            "get_transactions" => {
                let hash = body["txs_hashes"][0].as_str().unwrap_or_default();
                match state.txs.get(hash).copied() {
                    Some(height) => {
                        let in_pool = height == 0;
                        let block_timestamp = if in_pool {
                            0
                        } else {
                            GENESIS_TIMESTAMP + height * 120
                        };
                        Ok(json!({
                            "txs": [{
                                "tx_hash": hash,
                                "as_hex": "ab".repeat(1_500),
                                "block_height": height,
                                "block_timestamp": block_timestamp,
                                "double_spend_seen": false,
                                "in_pool": in_pool,
                            }],
                            "status": status,
                        }))
                    }
                    None => Ok(json!({ "missed_tx": [hash], "status": status })),
                }
            }
            _ => Err(DaemonError::HttpStatus(404)),
        }
    }
}
