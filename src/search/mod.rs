//! Search query classification.
//!
//! Rules, first match wins:
//! 1. 64 lowercase hex chars: a transaction if the daemon knows it, else a block hash
//! 2. decimal digits: a block height
//! 3. anything else: invalid
//!
//! Only the ambiguous hex case costs a daemon round trip.

use serde::Serialize;

use crate::daemon::{DaemonClient, DaemonResult};

/// Length of a block or transaction hash in hex characters.
pub const HASH_HEX_LEN: usize = 64;

/// What a search query refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Transaction,
    Block,
    Invalid,
}

impl SearchKind {
    /// Numeric code: 0 transaction, 1 block, 2 invalid.
    pub fn code(self) -> u8 {
        match self {
            SearchKind::Transaction => 0,
            SearchKind::Block => 1,
            SearchKind::Invalid => 2,
        }
    }
}

/// Exactly 64 lowercase hex characters.
pub fn is_hash(query: &str) -> bool {
    query.len() == HASH_HEX_LEN && query.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// One or more ASCII decimal digits.
pub fn is_height(query: &str) -> bool {
    !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit())
}

/// Classifies free-text queries against a daemon.
#[derive(Debug, Clone)]
pub struct SearchClassifier {
    client: DaemonClient,
    verify_block_hash: bool,
}

impl SearchClassifier {
    pub fn new(client: DaemonClient) -> Self {
        Self {
            client,
            verify_block_hash: false,
        }
    }

    /// Also require a hex query that is not a transaction to name a known block.
    pub fn verify_block_hash(mut self, enabled: bool) -> Self {
        self.verify_block_hash = enabled;
        self
    }

    /// Classify `query`. Daemon failures propagate; unknown records do not.
    pub async fn classify(&self, query: &str) -> DaemonResult<SearchKind> {
        if is_hash(query) {
            if self.client.get_transaction(query).await?.is_some() {
                return Ok(SearchKind::Transaction);
            }
            if self.verify_block_hash && self.client.get_block_by_hash(query).await?.is_none() {
                return Ok(SearchKind::Invalid);
            }
            return Ok(SearchKind::Block);
        }

        if is_height(query) {
            return Ok(SearchKind::Block);
        }
        Ok(SearchKind::Invalid)
    }
}
