//! Block explorer binary.
//!
//! ```text
//!   visitor ──▶ http (axum) ──▶ search / render ──▶ safety
//!                   │                                  ▲
//!                   ▼                                  │
//!              cache snapshot ◀── refresher ──▶ daemon client ──▶ daemon RPC
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use block_explorer::config::{read_config, ExplorerConfig};
use block_explorer::lifecycle::signals::forward_shutdown_signal;
use block_explorer::lifecycle::{Explorer, Shutdown};
use block_explorer::observability::{logging, metrics};
use block_explorer::{HttpServer, ServerTimeouts};

#[derive(Parser)]
#[command(name = "block-explorer")]
#[command(about = "Read-only block explorer for a Monero daemon", version)]
struct Cli {
    /// TOML configuration file. Flags below override its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address and port to bind.
    #[arg(long)]
    bind: Option<String>,

    /// Daemon URL. A third-party daemon can harm privacy unless a proxy is used.
    #[arg(long)]
    daemon: Option<String>,

    /// Proxy for daemon traffic: socks5://, socks4:// or http://, or "none".
    #[arg(long)]
    proxy: Option<String>,

    /// Daemon login as "password:username", or "none".
    #[arg(long = "rpc-login")]
    rpc_login: Option<String>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<ExplorerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ExplorerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(daemon) = self.daemon {
            config.daemon.url = daemon;
        }
        if let Some(proxy) = self.proxy {
            config.daemon.proxy = proxy;
        }
        if let Some(login) = self.rpc_login {
            config.daemon.login = login;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;
    logging::init_tracing(&config.observability.log_level);

    tracing::info!("block-explorer v{} starting", env!("CARGO_PKG_VERSION"));

    let explorer = Explorer::build(config).map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration, aborting");
        e
    })?;
    let config = explorer.config.clone();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        daemon = %config.daemon.url,
        refresh_interval_secs = config.cache.refresh_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let shutdown = Shutdown::new();
    tokio::spawn(forward_shutdown_signal(shutdown.clone()));
    let refresher = explorer.spawn_refresher(&shutdown);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Server listening");

    let server = HttpServer::new(
        explorer.app_state(),
        ServerTimeouts::from_config(&config.listener),
    );
    server.run(listener, shutdown.subscribe()).await?;

    shutdown.trigger();
    refresher.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
