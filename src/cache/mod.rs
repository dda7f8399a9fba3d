//! Recent-block cache subsystem.
//!
//! # Data Flow
//! ```text
//! refresher.rs (background task, fixed interval)
//!     → DaemonClient::get_recent_blocks (with bounded retries)
//!     → snapshot.rs (atomic swap of Arc<BlocksSnapshot>)
//!     → HTTP handlers load the current snapshot
//! ```
//!
//! # Design Decisions
//! - Snapshots are replaced, never mutated in place
//! - Readers may see data up to one interval stale
//! - A failed cycle keeps the previous snapshot

pub mod refresher;
pub mod snapshot;

pub use refresher::CacheRefresher;
pub use snapshot::{BlocksSnapshot, RecentBlocks};
