use std::collections::BTreeMap;

use rand::Rng;
use tracing::{info, warn};

use aggregator::aggregate;
use common::Trade;
use strategy::AlgoBank;

use crate::{Backtester, ExecutedAction};

/// Backtest outcome of one algo on one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAlgo {
    pub roi: f64,
    pub symbol: String,
    pub algo: String,
    pub actions: Vec<ExecutedAction>,
}

/// Backtest every algo in `bank` on every symbol's history and return the
/// results best ROI first.
///
/// Each symbol is aggregated once and shared by all algos. Symbols whose
/// history cannot be replayed (no trades, bad records) are logged and left
/// out rather than failing the whole ranking.
pub fn rank_algos<R: Rng + ?Sized>(
    backtester: &Backtester,
    bank: &AlgoBank,
    histories: &BTreeMap<String, Vec<Trade>>,
    rng: &mut R,
) -> Vec<RankedAlgo> {
    let mut results = Vec::with_capacity(bank.len() * histories.len());

    for (symbol, trades) in histories {
        let series = match aggregate(trades, backtester.bin_width) {
            Ok(series) => series,
            Err(e) => {
                warn!(%symbol, error = %e, "Skipping symbol in ranking");
                continue;
            }
        };
        for algo in bank.iter() {
            match backtester.run_series(&series, &algo.strategy, rng) {
                Ok(report) => {
                    report.log_summary(symbol, &algo.name);
                    results.push(RankedAlgo {
                        roi: report.roi,
                        symbol: symbol.clone(),
                        algo: algo.name,
                        actions: report.actions,
                    });
                }
                Err(e) => {
                    warn!(%symbol, algo = %algo.name, error = %e, "Backtest failed");
                }
            }
        }
    }

    results.sort_by(|a, b| b.roi.total_cmp(&a.roi));
    if let Some(best) = results.first() {
        info!(
            ranked = results.len(),
            best_symbol = %best.symbol,
            best_algo = %best.algo,
            best_roi = best.roi,
            "Algos ranked"
        );
    }
    results
}

/// The `n` symbols with the most shares traded in `histories`, busiest
/// first. Ties go to the alphabetically earlier symbol.
///
/// Records failing `Trade::validate` are logged and not counted; totals
/// saturate at `u64::MAX`.
pub fn rank_symbols_by_volume(
    histories: &BTreeMap<String, Vec<Trade>>,
    n: usize,
) -> Vec<(String, u64)> {
    let mut volumes: Vec<(String, u64)> = histories
        .iter()
        .map(|(symbol, trades)| {
            let volume = trades
                .iter()
                .filter(|t| match t.validate() {
                    Ok(()) => true,
                    Err(reason) => {
                        warn!(%symbol, ts = t.timestamp_us, %reason, "Not counting malformed trade");
                        false
                    }
                })
                // validated non-negative
                .fold(0u64, |acc, t| acc.saturating_add(t.shares as u64));
            (symbol.clone(), volume)
        })
        .collect();
    // Stable sort keeps the map's name order within equal volumes.
    volumes.sort_by(|a, b| b.1.cmp(&a.1));
    volumes.truncate(n);
    volumes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::time::Duration;
    use strategy::StrategySpec;

    fn history(symbol: &str, prices: &[f64], shares: i64) -> Vec<Trade> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Trade::new(symbol, p, shares, i as u64 * 100_000))
            .collect()
    }

    fn histories() -> BTreeMap<String, Vec<Trade>> {
        BTreeMap::from([
            ("UP".to_string(), history("UP", &[10.0, 11.0, 12.0, 13.0], 3)),
            ("DOWN".to_string(), history("DOWN", &[13.0, 12.0, 11.0, 10.0], 7)),
            ("EMPTY".to_string(), Vec::new()),
        ])
    }

    #[test]
    fn algos_ranked_by_roi_descending() {
        let mut bank = AlgoBank::default();
        bank.insert("buy", StrategySpec::AlwaysBuy).unwrap();
        bank.insert("sell", StrategySpec::AlwaysSell).unwrap();
        let bt = Backtester::new(Duration::from_millis(100), 10, 1_000.0, 50);
        let mut rng = StdRng::seed_from_u64(7);

        let ranked = rank_algos(&bt, &bank, &histories(), &mut rng);

        // EMPTY is skipped; two symbols times two algos remain.
        assert_eq!(ranked.len(), 4);
        assert!(ranked.windows(2).all(|w| w[0].roi >= w[1].roi));
        let best = &ranked[0];
        assert_eq!((best.symbol.as_str(), best.algo.as_str()), ("UP", "buy"));
        let worst = ranked.last().unwrap();
        assert_eq!((worst.symbol.as_str(), worst.algo.as_str()), ("DOWN", "buy"));
    }

    #[test]
    fn symbols_ranked_by_traded_shares() {
        let top = rank_symbols_by_volume(&histories(), 2);
        assert_eq!(top, vec![("DOWN".to_string(), 28), ("UP".to_string(), 12)]);
    }

    #[test]
    fn volume_ties_keep_name_order() {
        let map = BTreeMap::from([
            ("B".to_string(), history("B", &[1.0], 5)),
            ("A".to_string(), history("A", &[1.0], 5)),
        ]);
        let top = rank_symbols_by_volume(&map, 10);
        assert_eq!(top[0].0, "A");
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn huge_volumes_saturate() {
        let map = BTreeMap::from([
            ("BIG".to_string(), history("BIG", &[1.0, 1.0, 1.0], i64::MAX)),
            ("SMALL".to_string(), history("SMALL", &[1.0], 1)),
        ]);
        let top = rank_symbols_by_volume(&map, 2);
        assert_eq!(top[0], ("BIG".to_string(), u64::MAX));
        assert_eq!(top[1], ("SMALL".to_string(), 1));
    }

    #[test]
    fn malformed_records_are_not_counted() {
        let trades = vec![
            Trade::new("A", 10.0, 4, 0),
            Trade::new("A", 10.0, -100, 1),
            Trade::new("A", f64::NAN, 50, 2),
            Trade::new("A", -1.0, 50, 3),
        ];
        let map = BTreeMap::from([
            ("A".to_string(), trades),
            ("B".to_string(), history("B", &[1.0], 5)),
        ]);
        let top = rank_symbols_by_volume(&map, 2);
        assert_eq!(top, vec![("B".to_string(), 5), ("A".to_string(), 4)]);
    }
}
