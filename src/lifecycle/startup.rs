//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the daemon endpoint and client (no network traffic)
//! - Start the cache refresher
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener starts last (main.rs), after the refresher is running

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::cache::{CacheRefresher, RecentBlocks};
use crate::config::{validate_config, ConfigError, ExplorerConfig};
use crate::daemon::{DaemonClient, DaemonEndpoint, DaemonError, EndpointError};
use crate::http::AppState;
use crate::lifecycle::Shutdown;
use crate::search::SearchClassifier;

/// Fatal problems detected before serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Invalid daemon settings: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("{0}")]
    Daemon(#[from] DaemonError),
}

/// The wired-up core services.
#[derive(Clone)]
pub struct Explorer {
    pub config: Arc<ExplorerConfig>,
    pub client: DaemonClient,
    pub blocks: Arc<RecentBlocks>,
}

impl Explorer {
    /// Validate `config` and build the daemon client.
    pub fn build(config: ExplorerConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let endpoint = DaemonEndpoint::from_config(&config.daemon)?;
        let client = DaemonClient::connect(&endpoint, Duration::from_secs(config.daemon.timeout_secs))?;
        Ok(Self::with_client(config, client))
    }

    /// Assemble services around an existing client.
    pub fn with_client(config: ExplorerConfig, client: DaemonClient) -> Self {
        Self {
            config: Arc::new(config),
            client,
            blocks: Arc::new(RecentBlocks::new()),
        }
    }

    /// Spawn the background refresher; it stops when `shutdown` fires.
    pub fn spawn_refresher(&self, shutdown: &Shutdown) -> JoinHandle<()> {
        let refresher = CacheRefresher::new(
            self.client.clone(),
            self.blocks.clone(),
            &self.config.cache,
            self.config.retries.clone(),
        );
        tokio::spawn(refresher.run(shutdown.subscribe()))
    }

    /// State shared by the HTTP handlers.
    pub fn app_state(&self) -> AppState {
        AppState {
            client: self.client.clone(),
            blocks: self.blocks.clone(),
            classifier: SearchClassifier::new(self.client.clone())
                .verify_block_hash(self.config.search.verify_block_hash),
        }
    }
}
