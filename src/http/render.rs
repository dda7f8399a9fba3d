//! HTML rendering of explorer pages.
//!
//! Every daemon-supplied string is checked before it is interpolated. Hashes
//! end up inside `href` attributes, so they must be plain hex
//! ([`assert_hash`]); numbers are formatted locally and need no check.

use std::fmt::Write;

use chrono::DateTime;

use crate::cache::BlocksSnapshot;
use crate::daemon::{BlockDetail, ChainInfo, TransactionRecord};
use crate::safety::{assert_all_hashes, assert_hash, UnsafeContent};

/// Target block time of the network in seconds.
pub const BLOCK_TIME_SECS: u64 = 120;

/// Atomic units per coin.
pub const ATOMIC_UNITS_PER_COIN: f64 = 1e12;

const SECS_PER_MIN: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MIN;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
const SECS_PER_YEAR: i64 = 365 * SECS_PER_DAY;

/// Compact "time ago" label for an age in seconds.
pub fn format_time_ago(age_secs: i64) -> String {
    if age_secs > 2 * SECS_PER_YEAR {
        format!("{} y", age_secs / SECS_PER_YEAR)
    } else if age_secs > SECS_PER_DAY {
        format!("{} d", age_secs / SECS_PER_DAY)
    } else if age_secs > SECS_PER_HOUR {
        format!("{} h", age_secs / SECS_PER_HOUR)
    } else if age_secs > SECS_PER_MIN {
        format!("{} min", age_secs / SECS_PER_MIN)
    } else {
        format!("{} sec", age_secs)
    }
}

/// UTC `YYYY-MM-DD HH:MM` for a Unix timestamp.
pub fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Amount in coins with five decimals.
pub fn format_coins(atomic: u64) -> String {
    format!("{:.5}", atomic as f64 / ATOMIC_UNITS_PER_COIN)
}

/// Estimated network hashrate in MH/s.
pub fn hashrate_mhs(difficulty: u64) -> u64 {
    difficulty / 1_000_000 / BLOCK_TIME_SECS
}

/// Confirmations of `tx` given the chain height; 0 while unconfirmed.
pub fn confirmations(tx: &TransactionRecord, chain_height: u64) -> u64 {
    if tx.is_confirmed() {
        chain_height.saturating_sub(tx.block_height)
    } else {
        0
    }
}

/// Wrap `body` in a minimal HTML document.
pub fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><header><a href=\"/\">Explorer</a>\
         <form action=\"/search\"><input name=\"q\" placeholder=\"Block height, block hash or tx hash\">\
         </form></header>{body}</body></html>"
    )
}

/// Client-side redirect page. `location` must be built from a classified
/// query (hash or height), never from daemon data.
pub fn redirect(location: &str) -> String {
    format!("<!DOCTYPE HTML><body><meta http-equiv=\"refresh\" content=\"0;url='{location}'\"/></body>")
}

/// Front page: network stats and the cached recent blocks, newest first.
pub fn render_index(snapshot: &BlocksSnapshot, info: &ChainInfo, now: u64) -> Result<String, UnsafeContent> {
    let mut rows = String::new();
    for header in snapshot.newest_first() {
        let hash = assert_hash(&header.hash)?;
        let age = now as i64 - header.timestamp as i64;
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td><a href=\"/block?id={hash}\">{hash}</a></td><td>{}</td></tr>",
            header.height,
            header.tx_count,
            format_time_ago(age),
        );
    }

    let body = format!(
        "<section><p>Difficulty: {} M</p><p>Transactions: {}k</p><p>Hashrate: {} MH/s</p></section>\
         <table><tr><th>Height</th><th>Txs</th><th>Hash</th><th>Age</th></tr>{rows}</table>",
        info.difficulty / 1_000_000,
        info.tx_count / 1_000,
        hashrate_mhs(info.difficulty),
    );
    Ok(page("Explorer", &body))
}

/// Block page listing its transactions, coinbase last.
pub fn render_block(detail: &BlockDetail) -> Result<String, UnsafeContent> {
    let header = &detail.header;
    let hash = assert_hash(&header.hash)?;
    let miner_tx = assert_hash(&detail.miner_tx_hash)?;
    assert_all_hashes(detail.all_tx_hashes())?;

    let mut rows = String::new();
    for (i, tx) in detail.all_tx_hashes().enumerate() {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td><a href=\"/tx?id={tx}\">{tx}</a></td></tr>",
            i + 1
        );
    }

    let body = format!(
        "<h1>Block {height}</h1><dl>\
         <dt>Hash</dt><dd>{hash}</dd>\
         <dt>Transactions</dt><dd>{tx_count}</dd>\
         <dt>Size</dt><dd>{size:.1} kB</dd>\
         <dt>Time</dt><dd>{time}</dd>\
         <dt>Difficulty</dt><dd>{difficulty} M</dd>\
         <dt>Reward</dt><dd>{reward}</dd>\
         <dt>Miner transaction</dt><dd><a href=\"/tx?id={miner_tx}\">{miner_tx}</a></dd>\
         </dl><table><tr><th>#</th><th>Hash</th></tr>{rows}</table>",
        height = header.height,
        tx_count = header.tx_count,
        size = header.size as f64 / 1000.0,
        time = format_timestamp(header.timestamp),
        difficulty = header.difficulty / 1_000_000,
        reward = format_coins(header.reward),
    );
    Ok(page(&format!("Block {}", header.height), &body))
}

/// Transaction page.
pub fn render_transaction(tx: &TransactionRecord, chain_height: u64) -> Result<String, UnsafeContent> {
    let hash = assert_hash(&tx.hash)?;
    let (height, time) = if tx.is_confirmed() {
        (
            format!("<a href=\"/block?id={0}\">{0}</a>", tx.block_height),
            format_timestamp(tx.block_timestamp),
        )
    } else {
        ("pending".to_string(), "-".to_string())
    };

    let body = format!(
        "<h1>Transaction</h1><dl>\
         <dt>Hash</dt><dd>{hash}</dd>\
         <dt>Confirmations</dt><dd>{confirmations}</dd>\
         <dt>Block</dt><dd>{height}</dd>\
         <dt>Time</dt><dd>{time}</dd>\
         <dt>Size</dt><dd>{size:.2} kB</dd>\
         <dt>Double spend seen</dt><dd>{double_spend}</dd>\
         </dl>",
        confirmations = confirmations(tx, chain_height),
        size = tx.size() as f64 / 1000.0,
        double_spend = tx.double_spend,
    );
    Ok(page("Transaction", &body))
}
