//! Wire transport to the daemon.
//!
//! # Responsibilities
//! - Build an HTTP client honouring proxy and login settings
//! - Speak JSON-RPC 2.0 on `/json_rpc` and plain JSON on the other endpoints
//! - Answer the daemon's digest authentication challenge
//! - Classify failures: transport, HTTP status, RPC error object, decode
//!
//! # Design Decisions
//! - Construction never touches the network
//! - With a proxy configured every request goes through it, no direct fallback
//! - SOCKS proxies resolve the daemon hostname themselves
//! - The last digest challenge is reused until the daemon issues a new one
//! - [`DaemonTransport`] is a trait so the query layer can be driven in-memory

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use digest_auth::{AuthContext, WwwAuthenticateHeader};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde_json::{json, Value};
use url::Url;

use crate::daemon::endpoint::{Credentials, DaemonEndpoint};
use crate::daemon::types::{DaemonError, DaemonResult};
use crate::observability::metrics;

/// Path of the JSON-RPC endpoint, relative to the daemon base URL.
const JSON_RPC_PATH: &str = "json_rpc";

/// A request/response channel to the daemon.
#[async_trait]
pub trait DaemonTransport: Send + Sync {
    /// Invoke a JSON-RPC method and return its `result` member.
    async fn json_rpc(&self, method: &str, params: Value) -> DaemonResult<Value>;

    /// POST a JSON body to a non-JSON-RPC endpoint such as `get_height`.
    async fn call(&self, path: &str, body: Value) -> DaemonResult<Value>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    credentials: Option<Credentials>,
    challenge: Mutex<Option<WwwAuthenticateHeader>>,
    timeout_secs: u64,
}

impl HttpTransport {
    /// Configure a client for `endpoint`. No request is sent.
    pub fn connect(endpoint: &DaemonEndpoint, timeout: Duration) -> DaemonResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);

        if let Some(proxy_url) = endpoint.proxy() {
            let proxy = reqwest::Proxy::all(remote_dns_proxy(proxy_url))
                .map_err(|e| DaemonError::Connect(format!("invalid proxy '{}': {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        } else {
            // Ignore HTTP(S)_PROXY from the environment so only configured proxies apply.
            builder = builder.no_proxy();
        }

        let http = builder
            .build()
            .map_err(|e| DaemonError::Connect(e.to_string()))?;

        tracing::info!(
            daemon = %endpoint.base_url(),
            proxied = endpoint.proxy().is_some(),
            login = endpoint.credentials().is_some(),
            "Daemon transport configured"
        );

        Ok(Self {
            http,
            base_url: endpoint.base_url().clone(),
            credentials: endpoint.credentials().cloned(),
            challenge: Mutex::new(None),
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn post(&self, path: &str, body: &Value) -> DaemonResult<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| DaemonError::Transport(format!("bad RPC path '{}': {}", path, e)))?;
        let payload =
            serde_json::to_vec(body).map_err(|e| DaemonError::Transport(e.to_string()))?;

        let authorization = self.authorization(&url, &payload)?;
        let mut response = self.send(&url, &payload, authorization).await?;

        if response.status() == StatusCode::UNAUTHORIZED && self.credentials.is_some() {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| DaemonError::Auth("401 without a digest challenge".to_string()))?;
            let prompt =
                digest_auth::parse(challenge).map_err(|e| DaemonError::Auth(e.to_string()))?;
            tracing::debug!(daemon = %self.base_url, "Answering daemon digest challenge");
            *self.challenge.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt);

            let authorization = self.authorization(&url, &payload)?;
            response = self.send(&url, &payload, authorization).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(DaemonError::HttpStatus(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DaemonError::Decode(e.to_string()))
    }

    async fn send(
        &self,
        url: &Url,
        payload: &[u8],
        authorization: Option<String>,
    ) -> DaemonResult<reqwest::Response> {
        let mut request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_vec());
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }
        request.send().await.map_err(|e| self.map_error(e))
    }

    /// `Authorization` value answering the cached challenge, if there is one.
    fn authorization(&self, url: &Url, payload: &[u8]) -> DaemonResult<Option<String>> {
        let Some(creds) = &self.credentials else {
            return Ok(None);
        };
        let mut challenge = self.challenge.lock().unwrap_or_else(|e| e.into_inner());
        let Some(prompt) = challenge.as_mut() else {
            return Ok(None);
        };

        let context = AuthContext::new_post(
            creds.username.as_str(),
            creds.password.as_str(),
            url.path(),
            Some(payload),
        );
        prompt
            .respond(&context)
            .map(|answer| Some(answer.to_header_string()))
            .map_err(|e| DaemonError::Auth(e.to_string()))
    }

    fn map_error(&self, err: reqwest::Error) -> DaemonError {
        if err.is_timeout() {
            DaemonError::Timeout(self.timeout_secs)
        } else {
            DaemonError::Transport(err.to_string())
        }
    }
}

/// Proxy URL handed to reqwest: SOCKS schemes are switched to their
/// remote-resolution variants so the daemon hostname never hits local DNS.
pub(crate) fn remote_dns_proxy(proxy: &Url) -> String {
    let raw = proxy.as_str();
    match proxy.scheme() {
        "socks5" => format!("socks5h{}", &raw["socks5".len()..]),
        "socks4" => format!("socks4a{}", &raw["socks4".len()..]),
        _ => raw.to_string(),
    }
}

#[async_trait]
impl DaemonTransport for HttpTransport {
    async fn json_rpc(&self, method: &str, params: Value) -> DaemonResult<Value> {
        let start = Instant::now();
        let request = json!({
            "jsonrpc": "2.0",
            "id": "0",
            "method": method,
            "params": params,
        });

        let result = self.post(JSON_RPC_PATH, &request).await.and_then(unwrap_envelope);
        metrics::record_rpc_call(method, &result, start);
        result
    }

    async fn call(&self, path: &str, body: Value) -> DaemonResult<Value> {
        let start = Instant::now();
        let result = self.post(path, &body).await;
        metrics::record_rpc_call(path, &result, start);
        result
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("login", &self.credentials.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Split a JSON-RPC response into its `result` or an [`DaemonError::Rpc`].
pub(crate) fn unwrap_envelope(mut envelope: Value) -> DaemonResult<Value> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        return Err(DaemonError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    match envelope.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(DaemonError::Decode(
            "JSON-RPC response has neither result nor error".to_string(),
        )),
    }
}
