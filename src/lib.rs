//! Read-only block explorer for a Monero-style daemon.
//!
//! The core is the daemon access layer ([`daemon`]), the recent-block cache
//! ([`cache`]), search classification ([`search`]) and the trust boundary for
//! daemon strings ([`safety`]). [`http`] is a thin HTML shell on top.

// Core subsystems
pub mod cache;
pub mod daemon;
pub mod safety;
pub mod search;

// Presentation
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use cache::RecentBlocks;
pub use config::ExplorerConfig;
pub use daemon::DaemonClient;
pub use http::{HttpServer, ServerTimeouts};
pub use lifecycle::{Explorer, Shutdown, ShutdownSignal};
pub use search::{SearchClassifier, SearchKind};
