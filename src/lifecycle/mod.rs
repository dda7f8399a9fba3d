//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build daemon client → Spawn refresher → (main) bind listener
//!
//! Shutdown (shutdown.rs):
//!     Flag raised → refresher loop exits → server stops accepting and drains → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{Explorer, StartupError};
