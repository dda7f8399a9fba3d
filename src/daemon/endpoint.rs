//! Daemon endpoint description and parsing of the connection settings.
//!
//! A [`DaemonEndpoint`] is built once at startup from [`DaemonConfig`] and is
//! never mutated afterwards.

use thiserror::Error;
use url::Url;

use crate::config::DaemonConfig;

/// Proxy schemes the transport can tunnel through.
pub const SUPPORTED_PROXY_SCHEMES: [&str; 3] = ["socks4", "socks5", "http"];

/// Sentinel accepted by the CLI for "no proxy" / "no login".
const NONE: &str = "none";

/// Errors raised while interpreting the daemon connection settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    /// Daemon URL did not parse.
    #[error("invalid daemon URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Daemon URL parsed but is not http(s).
    #[error("unsupported daemon URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    /// Proxy URL did not parse.
    #[error("invalid proxy URL '{url}': {reason}")]
    InvalidProxy { url: String, reason: String },

    /// Proxy URL uses a scheme other than socks4/socks5/http.
    #[error("unsupported proxy scheme '{0}', expected socks4://, socks5:// or http://")]
    UnsupportedProxyScheme(String),

    /// Login string is not `password:username`.
    #[error("login must have the form 'password:username'")]
    InvalidLogin,
}

/// Credentials sent to a daemon with RPC login enabled.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how to reach the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonEndpoint {
    base_url: Url,
    proxy: Option<Url>,
    credentials: Option<Credentials>,
}

impl DaemonEndpoint {
    /// Create an endpoint with no proxy and no credentials.
    pub fn direct(base_url: Url) -> Self {
        Self {
            base_url,
            proxy: None,
            credentials: None,
        }
    }

    /// Build an endpoint from configuration, rejecting malformed settings.
    pub fn from_config(config: &DaemonConfig) -> Result<Self, EndpointError> {
        Ok(Self {
            base_url: parse_daemon_url(&config.url)?,
            proxy: parse_proxy(&config.proxy)?,
            credentials: parse_login(&config.login)?,
        })
    }

    /// Route all traffic through `proxy`.
    pub fn with_proxy(mut self, proxy: Url) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Answer the daemon's digest challenges with `credentials`.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }
}

/// Parse the daemon URL, defaulting to `http://` when no scheme is given.
///
/// The returned URL always has a trailing `/` in its path so RPC paths can be
/// joined onto it.
pub fn parse_daemon_url(raw: &str) -> Result<Url, EndpointError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| EndpointError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(EndpointError::UnsupportedScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(EndpointError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse the proxy setting. `none` or an empty string disables the proxy.
pub fn parse_proxy(raw: &str) -> Result<Option<Url>, EndpointError> {
    let raw = raw.trim();
    if raw.is_empty() || raw == NONE {
        return Ok(None);
    }

    let url = Url::parse(raw).map_err(|e| EndpointError::InvalidProxy {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !SUPPORTED_PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(EndpointError::UnsupportedProxyScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(EndpointError::InvalidProxy {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(Some(url))
}

/// Parse a `password:username` login string. `none` or empty disables login.
pub fn parse_login(raw: &str) -> Result<Option<Credentials>, EndpointError> {
    if raw.is_empty() || raw == NONE {
        return Ok(None);
    }

    let (password, username) = raw.split_once(':').ok_or(EndpointError::InvalidLogin)?;
    Ok(Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }))
}
