use std::time::Duration;

use common::{Error, Result, Trade};

use crate::series::{Bin, BinSeries, Ohlc};

/// Upper bound on the bins one series may span.
pub const MAX_BINS: usize = 1_000_000;

/// Convert a bin width to whole microseconds, rejecting widths the
/// timestamp resolution cannot express.
pub fn bin_width_us(bin_width: Duration) -> Result<u64> {
    let micros = u64::try_from(bin_width.as_micros()).map_err(|_| {
        Error::InvalidConfiguration(format!("bin width {bin_width:?} is too large"))
    })?;
    if micros == 0 {
        return Err(Error::InvalidConfiguration(format!(
            "bin width must be at least 1µs, got {bin_width:?}"
        )));
    }
    Ok(micros)
}

/// Number of bins spanning `first_us..=last_us` at `width_us`, rejecting
/// spans wider than `MAX_BINS`.
pub fn bin_count(first_us: u64, last_us: u64, width_us: u64) -> Result<usize> {
    if width_us == 0 {
        return Err(Error::InvalidConfiguration("bin width must be at least 1µs".into()));
    }
    let (lo, hi) = (first_us.min(last_us), first_us.max(last_us));
    let steps = (floor(hi, width_us) - floor(lo, width_us)) / width_us;
    match usize::try_from(steps) {
        Ok(steps) if steps < MAX_BINS => Ok(steps + 1),
        _ => Err(Error::InvalidConfiguration(format!(
            "trades {lo}µs..{hi}µs span more than {MAX_BINS} bins of {width_us}µs"
        ))),
    }
}

/// Running OHLCV state for one bin while trades are assigned.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    ohlc: Ohlc,
    volume: u64,
    trade_count: usize,
}

impl Bucket {
    fn open(trade: &Trade) -> Self {
        Self {
            ohlc: Ohlc {
                open: trade.price,
                high: trade.price,
                low: trade.price,
                close: trade.price,
            },
            // validated non-negative
            volume: trade.shares as u64,
            trade_count: 1,
        }
    }

    fn push(&mut self, trade: &Trade) {
        self.ohlc.high = self.ohlc.high.max(trade.price);
        self.ohlc.low = self.ohlc.low.min(trade.price);
        self.ohlc.close = trade.price;
        self.volume = self.volume.saturating_add(trade.shares as u64);
        self.trade_count += 1;
    }
}

/// Bucket `trades` (in arrival order) into a gap-free series of
/// `bin_width` bins.
///
/// Bins span from the bin holding the earliest timestamp to the bin
/// holding the latest one. Open and close follow arrival order, not
/// timestamp order. Empty bins forward-fill prices from the closest
/// earlier non-empty bin and have zero volume.
///
/// Fails on the first trade that does not pass `Trade::validate`, and
/// with `InvalidConfiguration` when the trades span more than `MAX_BINS`
/// bins.
pub fn aggregate(trades: &[Trade], bin_width: Duration) -> Result<BinSeries> {
    let width = bin_width_us(bin_width)?;

    for (index, trade) in trades.iter().enumerate() {
        trade
            .validate()
            .map_err(|reason| Error::InvalidTrade { index, reason })?;
    }

    let (Some(min_ts), Some(max_ts)) = (
        trades.iter().map(|t| t.timestamp_us).min(),
        trades.iter().map(|t| t.timestamp_us).max(),
    ) else {
        return Ok(BinSeries::empty(bin_width));
    };

    let first_start = floor(min_ts, width);
    let mut buckets: Vec<Option<Bucket>> = vec![None; bin_count(min_ts, max_ts, width)?];
    for trade in trades {
        let slot = ((floor(trade.timestamp_us, width) - first_start) / width) as usize;
        if let Some(bucket) = &mut buckets[slot] {
            bucket.push(trade);
        } else {
            buckets[slot] = Some(Bucket::open(trade));
        }
    }

    let mut last_prices: Option<Ohlc> = None;
    let bins = buckets
        .into_iter()
        .enumerate()
        .map(|(i, bucket)| {
            let start_us = first_start + i as u64 * width;
            match bucket {
                Some(b) => {
                    last_prices = Some(b.ohlc);
                    Bin {
                        start_us,
                        prices: Some(b.ohlc),
                        volume: b.volume,
                        trade_count: b.trade_count,
                    }
                }
                None => Bin {
                    start_us,
                    prices: last_prices,
                    volume: 0,
                    trade_count: 0,
                },
            }
        })
        .collect();

    Ok(BinSeries::from_bins(bin_width, bins))
}

fn floor(ts: u64, width: u64) -> u64 {
    ts - ts % width
}
