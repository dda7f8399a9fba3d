//! Trust boundary for daemon-supplied strings.
//!
//! The daemon is a third party whenever a non-local URL is configured. Any
//! string it returns (block hash, miner tx hash, tx hashes, tx ids) must pass
//! [`assert_safe`] before it is interpolated into HTML. Hashes also land in
//! attribute values and must pass the stricter [`assert_hash`]. Numeric fields
//! need no check.

use thiserror::Error;

use crate::observability::metrics;
use crate::search::is_hash;

/// Characters that could open markup or an entity.
const FORBIDDEN: [char; 3] = ['<', '>', '&'];

/// A daemon string contained markup characters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Daemon sent unsafe data; it should not be trusted")]
pub struct UnsafeContent {
    /// Offending value, truncated for logging.
    pub excerpt: String,
}

/// Whether `s` is free of `<`, `>` and `&`. True for the empty string.
pub fn is_safe(s: &str) -> bool {
    !s.contains(FORBIDDEN)
}

/// Pass `s` through if it is safe, otherwise fail the current response.
pub fn assert_safe(s: &str) -> Result<&str, UnsafeContent> {
    if is_safe(s) {
        Ok(s)
    } else {
        Err(reject(s))
    }
}

/// Pass `s` through if it is a 64-character lowercase hex hash.
pub fn assert_hash(s: &str) -> Result<&str, UnsafeContent> {
    if is_hash(s) {
        Ok(s)
    } else {
        Err(reject(s))
    }
}

/// Check every hash in `values`, stopping at the first violation.
pub fn assert_all_hashes<'a, I>(values: I) -> Result<(), UnsafeContent>
where
    I: IntoIterator<Item = &'a str>,
{
    values.into_iter().try_for_each(|v| assert_hash(v).map(|_| ()))
}

fn reject(s: &str) -> UnsafeContent {
    let excerpt: String = s.chars().take(80).collect();
    tracing::warn!(excerpt = %excerpt.escape_debug(), "Rejected unsafe daemon data");
    metrics::record_unsafe_content();
    UnsafeContent { excerpt }
}
