//! Atomically published snapshot of recent block headers.

use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwap;

use crate::daemon::BlockHeader;

/// Immutable view of the recent blocks at one point in time.
#[derive(Debug, Clone, Default)]
pub struct BlocksSnapshot {
    headers: Vec<BlockHeader>,
    refreshed_at: Option<SystemTime>,
}

impl BlocksSnapshot {
    /// Snapshot taken now. Headers are stored in ascending height order.
    pub fn new(mut headers: Vec<BlockHeader>) -> Self {
        headers.sort_by_key(|h| h.height);
        Self {
            headers,
            refreshed_at: Some(SystemTime::now()),
        }
    }

    /// Headers in ascending height order.
    pub fn headers(&self) -> &[BlockHeader] {
        &self.headers
    }

    /// Headers from the highest block down.
    pub fn newest_first(&self) -> impl Iterator<Item = &BlockHeader> {
        self.headers.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Height of the newest cached block.
    pub fn highest(&self) -> Option<u64> {
        self.headers.last().map(|h| h.height)
    }

    /// When this snapshot was produced; `None` for the initial empty one.
    pub fn refreshed_at(&self) -> Option<SystemTime> {
        self.refreshed_at
    }
}

/// Shared holder of the current snapshot.
///
/// Single writer (the refresher), any number of readers. Readers get an
/// `Arc` to a complete snapshot and never block the writer.
#[derive(Debug)]
pub struct RecentBlocks {
    current: ArcSwap<BlocksSnapshot>,
}

impl RecentBlocks {
    /// Start with an empty, never-refreshed snapshot.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(BlocksSnapshot::default()),
        }
    }

    /// Current snapshot. Hold it for one logical use only; it may be
    /// superseded at any time.
    pub fn load(&self) -> Arc<BlocksSnapshot> {
        self.current.load_full()
    }

    /// Replace the snapshot wholesale.
    pub fn publish(&self, headers: Vec<BlockHeader>) -> Arc<BlocksSnapshot> {
        let snapshot = Arc::new(BlocksSnapshot::new(headers));
        self.current.store(snapshot.clone());
        snapshot
    }

    /// Whether at least one refresh has completed.
    pub fn is_ready(&self) -> bool {
        self.current.load().refreshed_at.is_some()
    }
}

impl Default for RecentBlocks {
    fn default() -> Self {
        Self::new()
    }
}
