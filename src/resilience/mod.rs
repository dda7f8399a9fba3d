//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Background daemon call (cache refresh):
//!     → retries.rs (bounded attempts, exponential delay + jitter between them)
//! ```
//!
//! # Design Decisions
//! - Every daemon call is bounded by the transport timeout
//! - Retries only on the background path; user-facing requests fail fast

pub mod retries;

pub use retries::{backoff_delay, retry_with_backoff};
