use std::time::Duration;

use tracing::{debug, warn};

use common::{Result, Trade};

use crate::aggregate::{aggregate, bin_count, bin_width_us};
use crate::series::BinSeries;

/// Per-symbol trade log and its current bin series.
///
/// Owned by exactly one trader; nothing here is shared across symbols.
/// Every ingest re-aggregates the whole log rather than patching the
/// newest bins, so the series is always what `aggregate` would return
/// for the same log.
#[derive(Debug, Clone)]
pub struct SymbolAccumulator {
    symbol: String,
    bin_width: Duration,
    /// Newest trade timestamp seen so far; the next pull asks for
    /// anything strictly newer.
    last_seen_us: u64,
    /// Earliest and latest timestamps in the log.
    span_us: Option<(u64, u64)>,
    trades: Vec<Trade>,
    series: BinSeries,
}

impl SymbolAccumulator {
    pub fn new(symbol: impl Into<String>, bin_width: Duration) -> Result<Self> {
        bin_width_us(bin_width)?;
        Ok(Self {
            symbol: symbol.into(),
            bin_width,
            last_seen_us: 0,
            span_us: None,
            trades: Vec::new(),
            series: BinSeries::empty(bin_width),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bin_width(&self) -> Duration {
        self.bin_width
    }

    pub fn last_seen_us(&self) -> u64 {
        self.last_seen_us
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn series(&self) -> &BinSeries {
        &self.series
    }

    /// Append newly pulled trades and rebuild the series.
    ///
    /// Records for another symbol, failing validation, or so far from the
    /// rest of the log that the series would exceed `MAX_BINS` are logged
    /// and skipped. Returns how many trades were kept.
    pub fn ingest<I>(&mut self, new_trades: I) -> Result<usize>
    where
        I: IntoIterator<Item = Trade>,
    {
        let width_us = bin_width_us(self.bin_width)?;
        let mut accepted = 0;
        for trade in new_trades {
            if trade.symbol != self.symbol {
                warn!(expected = %self.symbol, got = %trade.symbol, "Skipping trade for another symbol");
                continue;
            }
            if let Err(reason) = trade.validate() {
                warn!(symbol = %self.symbol, ts = trade.timestamp_us, %reason, "Skipping malformed trade");
                continue;
            }
            let ts = trade.timestamp_us;
            let span = match self.span_us {
                Some((lo, hi)) => (lo.min(ts), hi.max(ts)),
                None => (ts, ts),
            };
            if let Err(e) = bin_count(span.0, span.1, width_us) {
                warn!(symbol = %self.symbol, ts, error = %e, "Skipping out-of-range trade");
                continue;
            }
            self.span_us = Some(span);
            self.last_seen_us = self.last_seen_us.max(trade.timestamp_us);
            self.trades.push(trade);
            accepted += 1;
        }

        if accepted > 0 {
            self.rebuild()?;
            debug!(
                symbol = %self.symbol,
                new = accepted,
                total = self.trades.len(),
                bins = self.series.len(),
                "Trade log re-aggregated"
            );
        }
        Ok(accepted)
    }

    /// Change the bin width and recompute the series from the raw log.
    ///
    /// On error the previous width and series are kept.
    pub fn set_bin_width(&mut self, bin_width: Duration) -> Result<()> {
        self.series = aggregate(&self.trades, bin_width)?;
        self.bin_width = bin_width;
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        self.series = aggregate(&self.trades, self.bin_width)?;
        Ok(())
    }
}
