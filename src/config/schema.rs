//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the explorer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the block explorer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Remote daemon connection settings.
    pub daemon: DaemonConfig,

    /// Recent-block cache settings.
    pub cache: CacheConfig,

    /// Retry configuration for the cache refresher.
    pub retries: RetryConfig,

    /// Search classification settings.
    pub search: SearchConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:31312").
    pub bind_address: String,

    /// Time allowed to receive a request head, in seconds. An idle
    /// keep-alive connection is closed after the same delay.
    pub read_timeout_secs: u64,

    /// Request timeout (total time to produce a response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:31312".to_string(),
            read_timeout_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

/// Daemon connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Daemon URL. A bare `host:port` is treated as `http://host:port`.
    pub url: String,

    /// Proxy URL (`socks4://`, `socks5://`, `http://`) or `none`.
    pub proxy: String,

    /// Login as `password:username`, or `none`.
    pub login: String,

    /// Transport timeout for a single daemon call in seconds.
    pub timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:18081".to_string(),
            proxy: "none".to_string(),
            login: "none".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Recent-block cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds between two refresh cycles.
    pub refresh_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries.
    pub enabled: bool,

    /// Maximum number of attempts per refresh cycle (first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

/// Search classification configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Confirm that a 64-hex query names an existing block before
    /// classifying it as one.
    pub verify_block_hash: bool,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
