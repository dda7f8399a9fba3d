//! Shared utilities for integration tests: a mock daemon speaking the RPC
//! dialect over HTTP, with optional digest authentication, and a minimal
//! SOCKS5 relay.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

pub const DIGEST_REALM: &str = "monero-rpc";
const DIGEST_NONCE: &str = "Zm9yIHRoZSBtb2NrIGRhZW1vbg";

/// Last SOCKS5 CONNECT request seen by [`start_socks5_proxy`], raw bytes.
pub type SocksRequest = Arc<Mutex<Option<Vec<u8>>>>;

/// Programmable chain state behind the mock daemon.
#[derive(Clone, Default)]
pub struct DaemonState {
    height: Arc<AtomicU64>,
    txs: Arc<Mutex<HashMap<String, u64>>>,
    hash_overrides: Arc<Mutex<HashMap<u64, String>>>,
    /// `Authorization` header of the last request.
    pub last_auth: Arc<Mutex<Option<String>>>,
    /// `Host` header of the last request.
    pub last_host: Arc<Mutex<Option<String>>>,
    /// Method or path of every request, in order.
    pub requests: Arc<Mutex<Vec<String>>>,
    /// `(username, password)` the daemon demands, if any.
    login: Arc<Mutex<Option<(String, String)>>>,
    challenges: Arc<AtomicUsize>,
}

impl DaemonState {
    pub fn with_chain(height: u64) -> Self {
        let state = Self::default();
        state.height.store(height, Ordering::SeqCst);
        state
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn add_transaction(&self, hash: &str, height: u64) {
        self.txs.lock().unwrap().insert(hash.to_string(), height);
    }

    pub fn override_block_hash(&self, height: u64, hash: &str) {
        self.hash_overrides.lock().unwrap().insert(height, hash.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Demand HTTP digest authentication with these credentials.
    pub fn require_login(&self, username: &str, password: &str) {
        *self.login.lock().unwrap() = Some((username.to_string(), password.to_string()));
    }

    /// Number of 401 digest challenges issued so far.
    pub fn challenges(&self) -> usize {
        self.challenges.load(Ordering::SeqCst)
    }

    fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    fn hash_of(&self, height: u64) -> String {
        self.hash_overrides
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_else(|| block_hash(height))
    }

    fn txs_in_block(&self, height: u64) -> Vec<String> {
        let mut txs: Vec<String> = self
            .txs
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, h)| **h == height && height != 0)
            .map(|(hash, _)| hash.clone())
            .collect();
        txs.sort();
        txs
    }

    fn header(&self, height: u64) -> Value {
        json!({
            "height": height,
            "hash": self.hash_of(height),
            "timestamp": GENESIS_TIMESTAMP + height * 120,
            "num_txes": self.txs_in_block(height).len() + 1,
            "block_size": 1_000 + height,
            "difficulty": 300_000_000_000u64,
            "reward": 600_000_000_000u64,
            "major_version": 16,
        })
    }

    fn find_height(&self, hash: &str) -> Option<u64> {
        (0..self.height()).find(|h| self.hash_of(*h) == hash)
    }

    fn record(&self, headers: &HeaderMap, what: &str) {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        *self.last_auth.lock().unwrap() = header("authorization");
        *self.last_host.lock().unwrap() = header("host");
        self.requests.lock().unwrap().push(what.to_string());
    }
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

fn rpc_result(result: Value) -> Json<Value> {
    Json(json!({ "id": "0", "jsonrpc": "2.0", "result": result }))
}

fn rpc_error(code: i64, message: &str) -> Json<Value> {
    Json(json!({ "id": "0", "jsonrpc": "2.0", "error": { "code": code, "message": message } }))
}

async fn json_rpc(State(state): State<DaemonState>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let method = body["method"].as_str().unwrap_or_default().to_string();
    state.record(&headers, &method);
    let params = &body["params"];
    let height = state.height();

    match method.as_str() {
        "get_info" => rpc_result(json!({
            "difficulty": 300_000_000_000u64,
            "tx_count": 42_000_000u64,
            "height": height,
            "status": "OK",
        })),
        "get_block_headers_range" => {
            let start = params["start_height"].as_u64().unwrap_or_default();
            let end = params["end_height"].as_u64().unwrap_or_default();
            if end >= height || start > end {
                return rpc_error(-2, "Invalid start/end heights");
            }
            let headers: Vec<_> = (start..=end).map(|h| state.header(h)).collect();
            rpc_result(json!({ "headers": headers, "status": "OK" }))
        }
        "get_block_header_by_height" => {
            let h = params["height"].as_u64().unwrap_or_default();
            if h >= height {
                return rpc_error(-2, "Requested block height too big");
            }
            rpc_result(json!({ "block_header": state.header(h), "status": "OK" }))
        }
        "get_block_header_by_hash" => {
            let hash = params["hashes"][0].as_str().unwrap_or_default();
            match state.find_height(hash) {
                Some(h) => rpc_result(json!({ "block_headers": [state.header(h)], "status": "OK" })),
                None => rpc_error(-5, "Internal error: can't get block by hash"),
            }
        }
        "get_block" => {
            let found = match (params["height"].as_u64(), params["hash"].as_str()) {
                (Some(h), _) if h < height => Some(h),
                (None, Some(hash)) => state.find_height(hash),
                _ => None,
            };
            match found {
                Some(h) => rpc_result(json!({
                    "block_header": state.header(h),
                    "json": json!({ "major_version": 16, "tx_hashes": state.txs_in_block(h) }).to_string(),
                    "miner_tx_hash": miner_tx_hash(h),
                    "status": "OK",
                })),
                None => rpc_error(-2, "Block not found"),
            }
        }
        _ => rpc_error(-32601, "Method not found"),
    }
}

async fn get_height(State(state): State<DaemonState>, headers: HeaderMap) -> Json<Value> {
    state.record(&headers, "get_height");
    Json(json!({ "height": state.height(), "status": "OK", "untrusted": false }))
}

async fn get_transactions(
    State(state): State<DaemonState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.record(&headers, "get_transactions");
    let hash = body["txs_hashes"][0].as_str().unwrap_or_default().to_string();
    let known = state.txs.lock().unwrap().get(&hash).copied();

    match known {
        Some(height) => {
            let in_pool = height == 0;
            let block_timestamp = if in_pool { 0 } else { GENESIS_TIMESTAMP + height * 120 };
            Json(json!({
                "txs": [{
                    "tx_hash": hash,
                    "as_hex": "ab".repeat(1_500),
                    "block_height": height,
                    "block_timestamp": block_timestamp,
                    "double_spend_seen": false,
                    "in_pool": in_pool,
                }],
                "status": "OK",
            }))
        }
        None => Json(json!({ "missed_tx": [hash], "status": "OK" })),
    }
}

async fn server_error() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn garbage() -> &'static str {
    "this is not json"
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "height": 1, "status": "OK" }))
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// `key=value` and `key="value"` pairs of a digest `Authorization` header.
fn digest_fields(params: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    let mut rest = params.trim();
    while let Some((key, tail)) = rest.split_once('=') {
        let (value, tail) = match tail.strip_prefix('"') {
            Some(quoted) => quoted.split_once('"').unwrap_or((quoted, "")),
            None => tail.split_once(',').unwrap_or((tail, "")),
        };
        fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        rest = tail.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }
    fields
}

/// RFC 2617 check with `qop=auth` and MD5, as the daemon's RPC server does it.
fn digest_matches(header: &str, method: &str, username: &str, password: &str) -> bool {
    let Some(params) = header.strip_prefix("Digest ") else {
        return false;
    };
    let fields = digest_fields(params);
    let field = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();

    if field("username") != username || field("realm") != DIGEST_REALM || field("nonce") != DIGEST_NONCE {
        return false;
    }
    let ha1 = md5_hex(&format!("{username}:{DIGEST_REALM}:{password}"));
    let ha2 = md5_hex(&format!("{method}:{}", field("uri")));
    let expected = md5_hex(&format!(
        "{ha1}:{}:{}:{}:{}:{ha2}",
        field("nonce"),
        field("nc"),
        field("cnonce"),
        field("qop"),
    ));
    field("response") == expected
}

async fn digest_guard(State(state): State<DaemonState>, request: Request, next: Next) -> Response {
    let login = state.login.lock().unwrap().clone();
    let Some((username, password)) = login else {
        return next.run(request).await;
    };

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|h| digest_matches(h, request.method().as_str(), &username, &password));
    if authorized {
        return next.run(request).await;
    }

    state.challenges.fetch_add(1, Ordering::SeqCst);
    let challenge = format!(
        "Digest qop=\"auth\",algorithm=MD5,realm=\"{DIGEST_REALM}\",nonce=\"{DIGEST_NONCE}\",stale=false"
    );
    (StatusCode::UNAUTHORIZED, [(WWW_AUTHENTICATE, challenge)]).into_response()
}

/// Start the mock daemon on an ephemeral port.
///
/// Besides the regular endpoints, `/broken/*` answers 500, `/garbage/*`
/// answers a non-JSON body and `/slow/*` answers after three seconds.
pub async fn start_mock_daemon(state: DaemonState) -> SocketAddr {
    let app = Router::new()
        .route("/json_rpc", post(json_rpc))
        .route("/get_height", post(get_height))
        .route("/get_transactions", post(get_transactions))
        .route("/broken/{*rest}", post(server_error))
        .route("/garbage/{*rest}", post(garbage))
        .route("/slow/{*rest}", post(slow))
        .layer(middleware::from_fn_with_state(state.clone(), digest_guard))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a SOCKS5 relay (no authentication) that tunnels every CONNECT to
/// `target`, whatever address the client asked for.
pub async fn start_socks5_proxy(target: SocketAddr) -> (SocketAddr, SocksRequest) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: SocksRequest = Arc::default();

    let record = seen.clone();
    tokio::spawn(async move {
        while let Ok((inbound, _)) = listener.accept().await {
            let record = record.clone();
            tokio::spawn(async move {
                let _ = socks5_session(inbound, target, record).await;
            });
        }
    });
    (addr, seen)
}

async fn socks5_session(mut inbound: TcpStream, target: SocketAddr, record: SocksRequest) -> std::io::Result<()> {
    // VER NMETHODS METHODS...
    let mut greeting = [0u8; 2];
    inbound.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    inbound.read_exact(&mut methods).await?;
    inbound.write_all(&[5, 0]).await?;

    // VER CMD RSV ATYP DST.ADDR DST.PORT
    let mut request = vec![0u8; 4];
    inbound.read_exact(&mut request).await?;
    let remaining = match request[3] {
        1 => 4 + 2,
        4 => 16 + 2,
        3 => {
            let len = inbound.read_u8().await?;
            request.push(len);
            len as usize + 2
        }
        _ => return Ok(()),
    };
    let mut address = vec![0u8; remaining];
    inbound.read_exact(&mut address).await?;
    request.extend_from_slice(&address);
    *record.lock().unwrap() = Some(request);

    let mut outbound = TcpStream::connect(target).await?;
    inbound.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
    tokio::io::copy_bidirectional(&mut inbound, &mut outbound).await?;
    Ok(())
}
