//! HTTP presentation subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum router, timeout, tracing, request metrics)
//!     → handler (snapshot / DaemonClient / SearchClassifier)
//!     → render.rs (safety check on every daemon string, HTML)
//!     → Send to client
//! ```

pub mod render;
pub mod server;

pub use server::{build_router, AppError, AppState, HttpServer, ServerTimeouts};
