//! HTTP server setup and page handlers.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request timeout, request metrics)
//! - Serve HTTP/1.1 connections with a header read deadline until the
//!   shutdown signal fires, then drain open connections
//! - Map daemon failures and unsafe content to a failed response, never a crash

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{MatchedPath, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::RecentBlocks;
use crate::config::ListenerConfig;
use crate::daemon::{BlockSelector, DaemonClient, DaemonError};
use crate::lifecycle::ShutdownSignal;
use crate::http::render;
use crate::observability::metrics;
use crate::safety::{is_safe, UnsafeContent};
use crate::search::{SearchClassifier, SearchKind};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: DaemonClient,
    pub blocks: Arc<RecentBlocks>,
    pub classifier: SearchClassifier,
}

/// Ways a page request can fail.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("ERROR: Missing {0}")]
    MissingParameter(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error(transparent)]
    Unsafe(#[from] UnsafeContent),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Daemon(e) => {
                tracing::error!(error = %e, "Daemon request failed");
                StatusCode::BAD_GATEWAY
            }
            AppError::Unsafe(_) => StatusCode::BAD_GATEWAY,
        };
        let message = match &self {
            AppError::Daemon(_) => "ERROR: Daemon unavailable".to_string(),
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}

type PageResult = Result<Html<String>, AppError>;

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdParams {
    id: Option<String>,
}

/// Pause after a failed `accept`, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Connection deadlines.
#[derive(Debug, Clone, Copy)]
pub struct ServerTimeouts {
    /// Time allowed to receive a request head. Idle keep-alive connections
    /// wait for their next request head under the same deadline.
    pub read: Duration,
    /// Time allowed to produce a response. Also bounds the shutdown drain.
    pub request: Duration,
}

impl ServerTimeouts {
    pub fn from_config(config: &ListenerConfig) -> Self {
        Self {
            read: Duration::from_secs(config.read_timeout_secs),
            request: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// HTTP server for the explorer.
pub struct HttpServer {
    router: Router,
    timeouts: ServerTimeouts,
}

impl HttpServer {
    /// Create a server around `state`.
    pub fn new(state: AppState, timeouts: ServerTimeouts) -> Self {
        Self {
            router: build_router(state, timeouts.request),
            timeouts,
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            read_timeout = ?self.timeouts.read,
            request_timeout = ?self.timeouts.request,
            "HTTP server starting"
        );

        let mut http = http1::Builder::new();
        http.timer(TokioTimer::new())
            .header_read_timeout(self.timeouts.read);
        let graceful = GracefulShutdown::new();

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                _ = shutdown.recv() => break,
            };

            let service = TowerToHyperService::new(self.router.clone());
            let connection = graceful.watch(http.serve_connection(TokioIo::new(stream), service));
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                }
            });
        }

        tracing::info!(open_connections = graceful.count(), "HTTP server draining");
        if tokio::time::timeout(self.timeouts.request, graceful.shutdown())
            .await
            .is_err()
        {
            tracing::warn!("Connections still open after drain deadline, dropping them");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/search", get(search_handler))
        .route("/block", get(block_handler))
        .route("/tx", get(tx_handler))
        .route("/health", get(health_handler))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}

async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Front page from the cached snapshot plus live network stats.
async fn index_handler(State(state): State<AppState>) -> PageResult {
    let info = state.client.get_info().await?;
    let snapshot = state.blocks.load();
    Ok(Html(render::render_index(&snapshot, &info, unix_now())?))
}

async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let query = params.q.ok_or(AppError::MissingParameter("search query"))?;
    if !is_safe(&query) {
        return Err(AppError::NotFound("Transaction or block not found"));
    }

    let location = match state.classifier.classify(&query).await? {
        SearchKind::Transaction => format!("/tx?id={}", query),
        SearchKind::Block => format!("/block?id={}", query),
        SearchKind::Invalid => return Err(AppError::NotFound("Transaction or block not found")),
    };

    tracing::debug!(query = %query, location = %location, "Search resolved");
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        render::redirect(&location),
    )
        .into_response())
}

async fn block_handler(State(state): State<AppState>, Query(params): Query<IdParams>) -> PageResult {
    let id = params.id.ok_or(AppError::MissingParameter("block ID"))?;
    if !is_safe(&id) {
        return Err(AppError::NotFound("Block not found"));
    }

    let detail = state
        .client
        .get_block(&BlockSelector::parse(&id))
        .await?
        .ok_or(AppError::NotFound("ERROR: Block not found"))?;
    Ok(Html(render::render_block(&detail)?))
}

async fn tx_handler(State(state): State<AppState>, Query(params): Query<IdParams>) -> PageResult {
    let id = params.id.ok_or(AppError::MissingParameter("transaction ID"))?;
    if !is_safe(&id) {
        return Err(AppError::NotFound("Transaction not found"));
    }

    let tx = state
        .client
        .get_transaction(&id)
        .await?
        .ok_or(AppError::NotFound("ERROR: Transaction not found"))?;

    let chain_height = if tx.is_confirmed() {
        state.client.get_height().await?
    } else {
        0
    };
    Ok(Html(render::render_transaction(&tx, chain_height)?))
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if state.blocks.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "warming up")
    }
}
