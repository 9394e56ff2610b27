use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use aggregator::SymbolAccumulator;
use common::{Config, ExchangeClient, OrderId, Result};
use strategy::Algo;

use crate::executor::OrderExecutor;

/// Loop settings shared by every trader in a deployment.
#[derive(Debug, Clone)]
pub struct TraderConfig {
    pub num_shares: u64,
    pub max_num_orders: usize,
    pub wait_interval: Duration,
    pub bin_width: Duration,
}

impl TraderConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_shares: config.num_shares,
            max_num_orders: config.max_num_orders,
            wait_interval: config.wait_interval,
            bin_width: config.bin_interval,
        }
    }
}

/// What one trader did over its lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct TraderReport {
    pub trader_id: String,
    pub symbol: String,
    pub algo: String,
    /// One entry per iteration; `None` where nothing was submitted.
    pub order_ids: Vec<Option<OrderId>>,
}

impl TraderReport {
    pub fn submitted(&self) -> usize {
        self.order_ids.iter().filter(|id| id.is_some()).count()
    }
}

/// Runs one algo against one symbol: pull, re-aggregate, decide, submit.
pub struct Trader {
    id: String,
    algo: Algo,
    accumulator: SymbolAccumulator,
    client: Arc<dyn ExchangeClient>,
    executor: OrderExecutor,
    config: TraderConfig,
    rng: StdRng,
}

impl Trader {
    pub fn new(
        symbol: impl Into<String>,
        algo: Algo,
        client: Arc<dyn ExchangeClient>,
        config: TraderConfig,
        rng: StdRng,
    ) -> Result<Self> {
        let id = format!("{}_{}", algo.name, chrono::Utc::now().timestamp());
        let accumulator = SymbolAccumulator::new(symbol, config.bin_width)?;
        let executor = OrderExecutor::new(client.clone(), config.num_shares);
        Ok(Self {
            id,
            algo,
            accumulator,
            client,
            executor,
            config,
            rng,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbol(&self) -> &str {
        self.accumulator.symbol()
    }

    pub fn accumulator(&self) -> &SymbolAccumulator {
        &self.accumulator
    }

    /// One iteration without the wait. Pull failures and rejected orders
    /// yield `None`; the loop carries on.
    pub async fn step(&mut self) -> Option<OrderId> {
        let symbol = self.accumulator.symbol().to_string();
        let since = self.accumulator.last_seen_us();

        let trades = match self.client.recent_trades(&symbol, since).await {
            Ok(trades) => trades,
            Err(e) => {
                warn!(trader = %self.id, %symbol, error = %e, "Trade pull failed");
                return None;
            }
        };
        if let Err(e) = self.accumulator.ingest(trades) {
            warn!(trader = %self.id, %symbol, error = %e, "Aggregation failed");
            return None;
        }

        let decision = self
            .algo
            .strategy
            .evaluate(self.accumulator.series().bins(), &mut self.rng);
        debug!(
            trader = %self.id,
            %symbol,
            bins = self.accumulator.series().len(),
            %decision,
            "Evaluated"
        );
        self.executor.execute(&symbol, decision, &self.id).await
    }

    /// Trade for `max_num_orders` iterations, sleeping `wait_interval`
    /// between them.
    pub async fn run(mut self) -> TraderReport {
        info!(
            trader = %self.id,
            symbol = %self.symbol(),
            algo = %self.algo.name,
            strategy = %self.algo.strategy,
            iterations = self.config.max_num_orders,
            "Trader started"
        );

        let mut order_ids = Vec::with_capacity(self.config.max_num_orders);
        for i in 0..self.config.max_num_orders {
            if i > 0 {
                tokio::time::sleep(self.config.wait_interval).await;
            }
            order_ids.push(self.step().await);
        }

        let report = TraderReport {
            trader_id: self.id,
            symbol: self.accumulator.symbol().to_string(),
            algo: self.algo.name,
            order_ids,
        };
        info!(
            trader = %report.trader_id,
            symbol = %report.symbol,
            submitted = report.submitted(),
            order_ids = %serde_json::to_string(&report.order_ids).unwrap_or_default(),
            "Trader finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Trade;
    use paper::PaperClient;
    use rand::SeedableRng;
    use strategy::StrategySpec;

    const MS: u64 = 1_000;

    fn config(max_num_orders: usize) -> TraderConfig {
        TraderConfig {
            num_shares: 2,
            max_num_orders,
            wait_interval: Duration::from_millis(250),
            bin_width: Duration::from_millis(250),
        }
    }

    async fn client(trades: Vec<Trade>) -> Arc<PaperClient> {
        let client = Arc::new(PaperClient::new(trades, 0.0));
        client
            .configure_active_symbols(&["AAA".to_string()])
            .await
            .unwrap();
        client
    }

    fn algo(name: &str, strategy: StrategySpec) -> Algo {
        Algo {
            name: name.to_string(),
            strategy,
        }
    }

    #[tokio::test]
    async fn trader_id_carries_algo_name() {
        let client = client(vec![Trade::new("AAA", 10.0, 1, MS)]).await;
        let trader = Trader::new(
            "AAA",
            algo("sell", StrategySpec::AlwaysSell),
            client,
            config(1),
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        let (name, secs) = trader.id().split_once('_').unwrap();
        assert_eq!(name, "sell");
        assert!(secs.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn step_pulls_only_new_trades() {
        let client = client(vec![
            Trade::new("AAA", 10.0, 1, MS),
            Trade::new("AAA", 11.0, 1, 300 * MS),
        ])
        .await;
        let mut trader = Trader::new(
            "AAA",
            algo("hold", StrategySpec::random_buy(0.0)),
            client.clone(),
            config(3),
            StdRng::seed_from_u64(0),
        )
        .unwrap();

        assert!(trader.step().await.is_none());
        assert_eq!(trader.accumulator().trades().len(), 1);

        client.set_clock(1_000 * MS).await;
        trader.step().await;
        trader.step().await;
        assert_eq!(trader.accumulator().trades().len(), 2);
        assert_eq!(trader.accumulator().last_seen_us(), 300 * MS);
        assert_eq!(trader.accumulator().series().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn run_records_one_entry_per_iteration() {
        let client = client(vec![Trade::new("AAA", 10.0, 1, MS)]).await;
        let trader = Trader::new(
            "AAA",
            algo("buy", StrategySpec::AlwaysBuy),
            client.clone(),
            config(4),
            StdRng::seed_from_u64(0),
        )
        .unwrap();

        let report = trader.run().await;
        assert_eq!(report.order_ids.len(), 4);
        assert_eq!(report.submitted(), 4);
        assert_eq!(report.algo, "buy");
        assert_eq!(client.holdings().await.get("AAA"), Some(&8));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_pulls_do_not_stop_the_loop() {
        let client = client(vec![Trade::new("AAA", 10.0, 1, MS)]).await;
        client.configure_active_symbols(&[]).await.unwrap();
        let trader = Trader::new(
            "AAA",
            algo("buy", StrategySpec::AlwaysBuy),
            client,
            config(3),
            StdRng::seed_from_u64(0),
        )
        .unwrap();
        let report = trader.run().await;
        assert_eq!(report.order_ids, vec![None, None, None]);
    }
}
