//! Offline replay of a strategy over a historical trade log.

pub mod portfolio;
pub mod ranking;

pub use portfolio::Portfolio;
pub use ranking::{rank_algos, rank_symbols_by_volume, RankedAlgo};

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use aggregator::{aggregate, BinSeries};
use common::{Error, OrderSide, Result, Trade};
use strategy::StrategySpec;

/// One executed fill during a replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    /// Index of the newest bin in the prefix that produced the decision.
    pub bin_index: usize,
    pub side: OrderSide,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Percent change in net worth over the run.
    pub roi: f64,
    pub actions: Vec<ExecutedAction>,
    pub final_portfolio: Portfolio,
    pub bins: usize,
}

/// Replay settings shared by every run.
#[derive(Debug, Clone)]
pub struct Backtester {
    pub bin_width: Duration,
    /// Shares moved per executed decision.
    pub num_shares: u64,
    pub init_capital: f64,
    pub init_shares: u64,
}

impl Backtester {
    pub fn new(bin_width: Duration, num_shares: u64, init_capital: f64, init_shares: u64) -> Self {
        Self {
            bin_width,
            num_shares,
            init_capital,
            init_shares,
        }
    }

    pub fn from_config(config: &common::Config) -> Self {
        Self::new(
            config.bin_interval,
            config.backtest_num_shares,
            config.backtest_init_capital,
            config.backtest_init_shares,
        )
    }

    /// Aggregate `trades` once and replay `strategy` over every prefix.
    pub fn run<R: Rng + ?Sized>(
        &self,
        trades: &[Trade],
        strategy: &StrategySpec,
        rng: &mut R,
    ) -> Result<BacktestReport> {
        let series = aggregate(trades, self.bin_width)?;
        self.run_series(&series, strategy, rng)
    }

    /// Walk `series` prefix by prefix, filling decisions against a
    /// portfolio, and liquidate at the last close to compute ROI.
    pub fn run_series<R: Rng + ?Sized>(
        &self,
        series: &BinSeries,
        strategy: &StrategySpec,
        rng: &mut R,
    ) -> Result<BacktestReport> {
        let (Some(first_close), Some(last_close)) = (
            series.first().and_then(|b| b.close()),
            series.last().and_then(|b| b.close()),
        ) else {
            return Err(Error::InsufficientData(
                "backtest needs at least one priced bin".into(),
            ));
        };

        let mut portfolio = Portfolio::new(self.init_capital, self.init_shares);
        let init_net_worth = portfolio.net_worth(first_close);
        if !(init_net_worth > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "initial net worth must be positive, got {init_net_worth}"
            )));
        }

        let mut actions = Vec::new();
        for i in 1..=series.len() {
            let decision = strategy.evaluate(series.prefix(i), rng);
            let (Some(side), Some(price)) = (decision.side(), decision.price()) else {
                continue;
            };
            if portfolio.try_fill(side, self.num_shares, price) {
                actions.push(ExecutedAction {
                    bin_index: i - 1,
                    side,
                    price,
                });
            }
        }

        let final_net_worth = portfolio.net_worth(last_close);
        let roi = final_net_worth / init_net_worth * 100.0 - 100.0;
        debug!(
            %strategy,
            bins = series.len(),
            actions = actions.len(),
            init_net_worth,
            final_net_worth,
            "Backtest finished"
        );

        Ok(BacktestReport {
            roi,
            actions,
            final_portfolio: portfolio,
            bins: series.len(),
        })
    }
}

impl BacktestReport {
    pub fn log_summary(&self, symbol: &str, algo: &str) {
        info!(symbol, algo, roi = self.roi, trades = self.actions.len(), "Backtest result");
    }
}
