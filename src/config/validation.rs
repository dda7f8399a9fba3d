//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check daemon URL, proxy scheme and login format
//! - Validate value ranges (timeouts > 0, bind address parses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ExplorerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ExplorerConfig;
use crate::daemon::endpoint::{parse_daemon_url, parse_login, parse_proxy};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ExplorerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_bind_address(&config.listener.bind_address) {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a host:port address", config.listener.bind_address),
        ));
    }
    if config.listener.read_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.read_timeout_secs", "must be > 0"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if let Err(e) = parse_daemon_url(&config.daemon.url) {
        errors.push(ValidationError::new("daemon.url", e.to_string()));
    }
    if let Err(e) = parse_proxy(&config.daemon.proxy) {
        errors.push(ValidationError::new("daemon.proxy", e.to_string()));
    }
    if let Err(e) = parse_login(&config.daemon.login) {
        errors.push(ValidationError::new("daemon.login", e.to_string()));
    }
    if config.daemon.timeout_secs == 0 {
        errors.push(ValidationError::new("daemon.timeout_secs", "must be > 0"));
    }

    if config.cache.refresh_interval_secs == 0 {
        errors.push(ValidationError::new("cache.refresh_interval_secs", "must be > 0"));
    }

    if config.retries.enabled && config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be >= 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `ip:port`, `[v6]:port` or `hostname:port`. Hostnames are resolved at bind
/// time, not here.
fn is_bind_address(address: &str) -> bool {
    if address.parse::<SocketAddr>().is_ok() {
        return true;
    }
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty()
                && !host.contains(':')
                && !host.contains(char::is_whitespace)
                && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}
