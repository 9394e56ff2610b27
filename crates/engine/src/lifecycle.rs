use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use backtest::{rank_algos, rank_symbols_by_volume, Backtester, RankedAlgo};
use common::{Config, EngineCommand, EngineState, ExchangeClient, Result, Trade};
use strategy::AlgoBank;

use crate::rng::RngSource;
use crate::trader::{Trader, TraderConfig, TraderReport};

/// Cloneable handle for driving the engine from other tasks.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<RwLock<EngineState>>,
}

impl EngineHandle {
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }
}

/// Engine-level settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Candidate symbols; empty means every symbol the exchange lists.
    pub symbols: Vec<String>,
    pub top_symbols: usize,
    pub deploy_top_n: usize,
    pub max_cycles: Option<usize>,
    pub backtest_lookback: Duration,
    pub rng_seed: Option<u64>,
    pub trader: TraderConfig,
}

impl EngineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            symbols: config.symbols.clone(),
            top_symbols: config.top_symbols,
            deploy_top_n: config.deploy_top_n,
            max_cycles: config.max_cycles,
            backtest_lookback: config.backtest_lookback,
            rng_seed: config.rng_seed,
            trader: TraderConfig::from_config(config),
        }
    }
}

/// Outcome of one rank-and-deploy cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: usize,
    pub symbols: Vec<String>,
    pub ranked: Vec<RankedAlgo>,
    pub traders: Vec<TraderReport>,
}

/// The part of the engine that does the work, split from the command
/// receiver so a cycle can run while commands are still being read.
struct Cycles {
    client: Arc<dyn ExchangeClient>,
    bank: Arc<AlgoBank>,
    backtester: Backtester,
    config: EngineConfig,
    rng: RngSource,
}

/// The main engine: backtests the algo bank, deploys the winners, waits for
/// them, and repeats while running.
pub struct Engine {
    cycles: Cycles,
    state: Arc<RwLock<EngineState>>,
    command_rx: mpsc::Receiver<EngineCommand>,
}

impl Engine {
    pub fn new(
        client: Arc<dyn ExchangeClient>,
        bank: AlgoBank,
        backtester: Backtester,
        config: EngineConfig,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let state = Arc::new(RwLock::new(EngineState::Stopped));

        let handle = EngineHandle {
            command_tx,
            state: state.clone(),
        };

        let engine = Engine {
            cycles: Cycles {
                client,
                bank: Arc::new(bank),
                backtester,
                rng: RngSource::new(config.rng_seed),
                config,
            },
            state,
            command_rx,
        };

        (engine, handle)
    }

    /// Run the engine until every handle is dropped or `max_cycles` cycles
    /// have completed. Call from `tokio::spawn`.
    pub async fn run(mut self) -> Vec<CycleReport> {
        info!(
            seeded = self.cycles.rng.is_seeded(),
            "Engine initialized in Stopped state. Waiting for Start command."
        );
        let mut reports = Vec::new();
        let mut cycle = 0;

        loop {
            if *self.state.read().await == EngineState::Stopped {
                match self.command_rx.recv().await {
                    Some(EngineCommand::Start) => {
                        info!("Engine starting");
                        *self.state.write().await = EngineState::Running;
                    }
                    Some(EngineCommand::Stop) => {
                        info!("Engine already stopped");
                        continue;
                    }
                    None => {
                        warn!("Engine command channel closed, shutting down");
                        break;
                    }
                }
            }

            if self.cycles.config.max_cycles.is_some_and(|max| cycle >= max) {
                info!(cycles = cycle, "Cycle limit reached, engine stopping");
                *self.state.write().await = EngineState::Stopped;
                break;
            }
            cycle += 1;

            tokio::select! {
                result = self.cycles.run_cycle(cycle) => match result {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        error!(cycle, error = %e, "Cycle failed");
                        tokio::time::sleep(self.cycles.config.trader.wait_interval).await;
                    }
                },
                cmd = self.command_rx.recv() => match cmd {
                    Some(EngineCommand::Stop) => {
                        info!(cycle, "Engine stopping, aborting traders");
                        *self.state.write().await = EngineState::Stopped;
                    }
                    Some(EngineCommand::Start) => {
                        info!("Engine already running; restarting cycle");
                    }
                    None => {
                        warn!("Engine command channel closed, shutting down");
                        break;
                    }
                },
            }
        }

        reports
    }
}

impl Cycles {
    /// Rank symbols, rank algos, deploy the top N and wait for them.
    async fn run_cycle(&self, cycle: usize) -> Result<CycleReport> {
        info!(cycle, "Cycle starting: backtesting algo bank");
        let now = self.client.now_us().await?;
        let lookback = u64::try_from(self.config.backtest_lookback.as_micros()).unwrap_or(u64::MAX);
        let start = now.saturating_sub(lookback);

        let candidates = if self.config.symbols.is_empty() {
            self.client.symbols().await?
        } else {
            self.config.symbols.clone()
        };
        let histories = self.fetch_histories(&candidates, start, now).await?;

        let symbols: Vec<String> = rank_symbols_by_volume(&histories, self.config.top_symbols)
            .into_iter()
            .map(|(symbol, _)| symbol)
            .collect();
        info!(cycle, symbols = ?symbols, "Top symbols by volume");
        self.client.configure_active_symbols(&symbols).await?;

        let top: BTreeMap<String, Vec<Trade>> = histories
            .into_iter()
            .filter(|(symbol, _)| symbols.contains(symbol))
            .collect();
        let mut rng = self.rng.rng_for("backtest", cycle as u64);
        let ranked = rank_algos(&self.backtester, &self.bank, &top, &mut rng);
        if ranked.is_empty() {
            warn!(cycle, "No algo could be backtested; nothing to deploy");
            tokio::time::sleep(self.config.trader.wait_interval).await;
        }

        let traders = self.deploy(cycle, &ranked).await;
        info!(
            cycle,
            traders = traders.len(),
            submitted = traders.iter().map(TraderReport::submitted).sum::<usize>(),
            "Cycle finished"
        );

        Ok(CycleReport {
            cycle,
            symbols,
            ranked,
            traders,
        })
    }

    async fn fetch_histories(
        &self,
        symbols: &[String],
        start_us: u64,
        now_us: u64,
    ) -> Result<BTreeMap<String, Vec<Trade>>> {
        let mut histories = BTreeMap::new();
        for symbol in symbols {
            let trades = self
                .client
                .historical_trades(symbol, start_us, now_us.saturating_add(1))
                .await?;
            histories.insert(symbol.clone(), trades);
        }
        Ok(histories)
    }

    /// Spawn one trader per top-ranked (symbol, algo) and join them all.
    /// Dropping the returned future aborts every trader still running.
    async fn deploy(&self, cycle: usize, ranked: &[RankedAlgo]) -> Vec<TraderReport> {
        let mut traders = JoinSet::new();

        for (i, entry) in ranked.iter().take(self.config.deploy_top_n).enumerate() {
            let Some(algo) = self.bank.get(&entry.algo) else {
                warn!(algo = %entry.algo, "Ranked algo missing from bank");
                continue;
            };
            let label = format!("{}/{}/{}", entry.symbol, entry.algo, i);
            let rng = self.rng.rng_for(&label, cycle as u64);
            match Trader::new(
                entry.symbol.clone(),
                algo,
                self.client.clone(),
                self.config.trader.clone(),
                rng,
            ) {
                Ok(trader) => {
                    info!(
                        cycle,
                        rank = i + 1,
                        symbol = %entry.symbol,
                        algo = %entry.algo,
                        roi = entry.roi,
                        "Deploying trader"
                    );
                    traders.spawn(trader.run());
                }
                Err(e) => error!(symbol = %entry.symbol, algo = %entry.algo, error = %e, "Trader setup failed"),
            }
        }

        let mut reports = Vec::with_capacity(traders.len());
        while let Some(joined) = traders.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!(error = %e, "Trader task failed"),
            }
        }
        reports.sort_by(|a, b| (&a.symbol, &a.algo).cmp(&(&b.symbol, &b.algo)));
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Trade;
    use paper::PaperClient;
    use strategy::StrategySpec;

    const MS: u64 = 1_000;

    fn tape() -> Vec<Trade> {
        let mut trades = Vec::new();
        for i in 0..20u64 {
            trades.push(Trade::new("UP", 10.0 + i as f64, 5, i * 250 * MS));
            trades.push(Trade::new("DOWN", 40.0 - i as f64, 9, i * 250 * MS));
            trades.push(Trade::new("THIN", 5.0, 1, i * 250 * MS));
        }
        trades
    }

    fn bank() -> AlgoBank {
        let mut bank = AlgoBank::default();
        bank.insert("buy", StrategySpec::AlwaysBuy).unwrap();
        bank.insert("sell", StrategySpec::AlwaysSell).unwrap();
        bank
    }

    fn config(max_cycles: Option<usize>) -> EngineConfig {
        EngineConfig {
            symbols: Vec::new(),
            top_symbols: 2,
            deploy_top_n: 2,
            max_cycles,
            backtest_lookback: Duration::from_secs(60),
            rng_seed: Some(7),
            trader: TraderConfig {
                num_shares: 1,
                max_num_orders: 3,
                wait_interval: Duration::from_millis(250),
                bin_width: Duration::from_millis(250),
            },
        }
    }

    async fn paper() -> Arc<PaperClient> {
        let client = Arc::new(PaperClient::new(tape(), 0.0));
        client.set_clock(client.tape_end_us()).await;
        client
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_ranks_and_deploys_top_algos() {
        let client = paper().await;
        let backtester = Backtester::new(Duration::from_millis(250), 10, 10_000.0, 100);
        let (engine, handle) = Engine::new(client.clone(), bank(), backtester, config(Some(1)));

        handle.send(EngineCommand::Start).await;
        let reports = engine.run().await;

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        // THIN has the least volume and is never considered.
        assert_eq!(report.symbols, vec!["DOWN".to_string(), "UP".to_string()]);
        assert_eq!(report.ranked.len(), 4);
        assert_eq!((report.ranked[0].symbol.as_str(), report.ranked[0].algo.as_str()), ("UP", "buy"));

        assert_eq!(report.traders.len(), 2);
        for trader in &report.traders {
            assert_eq!(trader.order_ids.len(), 3);
        }
        assert_eq!(client.active_symbols().await, vec!["DOWN".to_string(), "UP".to_string()]);
        assert_eq!(handle.state().await, EngineState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_waits_for_start() {
        let client = paper().await;
        let backtester = Backtester::new(Duration::from_millis(250), 1, 1_000.0, 10);
        let (engine, handle) = Engine::new(client.clone(), bank(), backtester, config(Some(3)));

        handle.send(EngineCommand::Stop).await;
        let task = tokio::spawn(engine.run());
        tokio::task::yield_now().await;
        assert_eq!(handle.state().await, EngineState::Stopped);
        assert!(client.fills().await.is_empty());

        handle.send(EngineCommand::Start).await;
        let reports = task.await.unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(
            reports.iter().map(|r| r.cycle).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stop_aborts_running_cycle() {
        let client = paper().await;
        let backtester = Backtester::new(Duration::from_millis(250), 1, 1_000.0, 10);
        let mut cfg = config(None);
        cfg.trader.max_num_orders = 10_000;
        let (engine, handle) = Engine::new(client, bank(), backtester, cfg);

        handle.send(EngineCommand::Start).await;
        let task = tokio::spawn(engine.run());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.state().await, EngineState::Running);

        handle.send(EngineCommand::Stop).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.state().await, EngineState::Stopped);

        // Parked waiting for Start; dropping the last handle ends it.
        drop(handle);
        let reports = task.await.unwrap();
        assert!(reports.is_empty());
    }
}
