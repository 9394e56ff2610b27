//! Time-and-sales to OHLC binning.

pub mod accumulator;
pub mod aggregate;
pub mod series;

pub use accumulator::SymbolAccumulator;
pub use aggregate::{aggregate, bin_count, bin_width_us, MAX_BINS};
pub use series::{Bin, BinSeries, Ohlc};
