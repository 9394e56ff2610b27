//! JSON-lines trade tape: one `Trade` object per line.
//!
//! ```text
//! {"symbol":"AAA","price":10.25,"shares":100,"timestamp_us":1700000000000000}
//! ```

use tracing::info;

use common::{Error, Result, Trade};

/// Parse a tape. Blank lines are ignored; a malformed line fails with its
/// 1-based line number.
pub fn parse_tape(content: &str) -> Result<Vec<Trade>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<Trade>(line)
                .map_err(|e| Error::Other(format!("trade tape line {}: {e}", i + 1)))
        })
        .collect()
}

pub fn load_tape(path: &str) -> Result<Vec<Trade>> {
    let content = std::fs::read_to_string(path)?;
    let trades = parse_tape(&content)?;
    info!(path, trades = trades.len(), "Trade tape loaded");
    Ok(trades)
}
