//! Daemon integration subsystem.
//!
//! # Data Flow
//! ```text
//! DaemonConfig (url, proxy, login)
//!     → endpoint.rs (parse & validate, immutable DaemonEndpoint)
//!     → transport.rs (reqwest client, JSON-RPC envelope)
//!     → client.rs (typed lookups, found / not-found / error)
//! ```
//!
//! # Security Constraints
//! - Never log the RPC password
//! - With a proxy configured, no request bypasses it
//! - Strings returned here are untrusted; see [`crate::safety`]

pub mod client;
pub mod endpoint;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{recent_block_range, DaemonClient};
pub use endpoint::{Credentials, DaemonEndpoint, EndpointError};
pub use transport::{DaemonTransport, HttpTransport};
pub use types::{
    BlockDetail, BlockHeader, BlockSelector, ChainInfo, DaemonError, DaemonResult,
    TransactionRecord,
};
