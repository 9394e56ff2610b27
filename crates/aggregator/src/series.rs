use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Open/high/low/close of one bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Ohlc {
    /// Percent change from open to close, as a fraction.
    pub fn change(&self) -> f64 {
        self.close / self.open - 1.0
    }
}

/// One fixed-width time bucket.
///
/// `prices` is `None` only for leading empty bins that have no earlier
/// bin to forward-fill from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    /// Inclusive start of `[start_us, start_us + width)`.
    pub start_us: u64,
    pub prices: Option<Ohlc>,
    pub volume: u64,
    /// Number of trades that fell in this bin. Zero for forward-filled bins.
    pub trade_count: usize,
}

impl Bin {
    pub fn is_empty(&self) -> bool {
        self.trade_count == 0
    }

    pub fn close(&self) -> Option<f64> {
        self.prices.map(|p| p.close)
    }
}

/// Ordered, gap-free run of bins at a constant stride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSeries {
    width: Duration,
    bins: Vec<Bin>,
}

impl BinSeries {
    pub fn empty(width: Duration) -> Self {
        Self {
            width,
            bins: Vec::new(),
        }
    }

    pub(crate) fn from_bins(width: Duration, bins: Vec<Bin>) -> Self {
        Self { width, bins }
    }

    pub fn width(&self) -> Duration {
        self.width
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    pub fn first(&self) -> Option<&Bin> {
        self.bins.first()
    }

    pub fn last(&self) -> Option<&Bin> {
        self.bins.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bin> {
        self.bins.iter()
    }

    /// The first `len` bins, i.e. the series as it looked when bin
    /// `len - 1` was the newest. Clamped to the series length.
    pub fn prefix(&self, len: usize) -> &[Bin] {
        &self.bins[..len.min(self.bins.len())]
    }
}

impl<'a> IntoIterator for &'a BinSeries {
    type Item = &'a Bin;
    type IntoIter = std::slice::Iter<'a, Bin>;

    fn into_iter(self) -> Self::IntoIter {
        self.bins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(start_us: u64, close: f64) -> Bin {
        Bin {
            start_us,
            prices: Some(Ohlc {
                open: close,
                high: close,
                low: close,
                close,
            }),
            volume: 1,
            trade_count: 1,
        }
    }

    #[test]
    fn prefix_is_clamped() {
        let series = BinSeries::from_bins(
            Duration::from_millis(1),
            vec![bin(0, 1.0), bin(1000, 2.0), bin(2000, 3.0)],
        );
        assert_eq!(series.prefix(2).len(), 2);
        assert_eq!(series.prefix(10).len(), 3);
        assert_eq!(series.prefix(2)[1].close(), Some(2.0));
        assert!(series.prefix(0).is_empty());
    }

    #[test]
    fn change_is_close_over_open() {
        let ohlc = Ohlc {
            open: 100.0,
            high: 103.0,
            low: 99.0,
            close: 102.0,
        };
        assert!((ohlc.change() - 0.02).abs() < 1e-12);
    }
}
