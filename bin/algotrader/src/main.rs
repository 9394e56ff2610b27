use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use backtest::Backtester;
use common::{Config, EngineCommand};
use engine::{Engine, EngineConfig};
use paper::PaperClient;
use strategy::{AlgoBank, AlgoBankFile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("loading configuration")?;
    info!(
        tape = %cfg.trade_tape_path,
        bin_ms = cfg.bin_interval.as_millis() as u64,
        deploy_top_n = cfg.deploy_top_n,
        "AlgoTrader starting"
    );

    // ── Algo bank ─────────────────────────────────────────────────────────────
    let bank = match &cfg.algo_bank_path {
        Some(path) => {
            let file = AlgoBankFile::load(path)
                .with_context(|| format!("reading algo bank {path}"))?;
            AlgoBank::from_config(&file).context("building algo bank")?
        }
        None => AlgoBank::standard(),
    };
    info!(algos = bank.len(), names = ?bank.names().collect::<Vec<_>>(), "Algo bank ready");

    // ── Exchange (paper replay) ───────────────────────────────────────────────
    let paper = Arc::new(
        PaperClient::from_tape_file(&cfg.trade_tape_path, cfg.paper_slippage_bps)
            .with_context(|| format!("loading trade tape {}", cfg.trade_tape_path))?,
    );
    // Open one lookback window into the tape so the first backtest has data.
    let lookback_us = u64::try_from(cfg.backtest_lookback.as_micros()).unwrap_or(u64::MAX);
    let opened_at = paper.clock_us().await.saturating_add(lookback_us);
    paper.set_clock(opened_at).await;

    // ── Engine ────────────────────────────────────────────────────────────────
    let (engine, handle) = Engine::new(
        paper.clone(),
        bank,
        Backtester::from_config(&cfg),
        EngineConfig::from_config(&cfg),
    );
    let mut engine_task = tokio::spawn(engine.run());
    handle.send(EngineCommand::Start).await;

    // ── Replay clock: tape time advances with wall time ───────────────────────
    let mut clock = {
        let paper = paper.clone();
        let handle = handle.clone();
        let step = cfg.wait_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(step);
            loop {
                ticker.tick().await;
                paper.advance(step).await;
                if paper.is_exhausted().await {
                    info!("Trade tape exhausted, stopping engine");
                    handle.send(EngineCommand::Stop).await;
                    break;
                }
            }
        })
    };

    info!("All subsystems started. Waiting for shutdown signal.");
    let reports = tokio::select! {
        joined = &mut engine_task => joined,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Stopping engine.");
            handle.send(EngineCommand::Stop).await;
            clock.abort();
            drop(handle);
            engine_task.await
        }
        _ = &mut clock => {
            drop(handle);
            engine_task.await
        }
    }
    .context("engine task failed")?;

    // ── Summary ───────────────────────────────────────────────────────────────
    for report in &reports {
        for trader in &report.traders {
            info!(
                cycle = report.cycle,
                trader = %trader.trader_id,
                symbol = %trader.symbol,
                submitted = trader.submitted(),
                "Trader summary"
            );
        }
    }
    for (symbol, shares) in paper.holdings().await {
        info!(%symbol, shares, "Final paper holdings");
    }
    info!(cycles = reports.len(), fills = paper.fills().await.len(), "Exiting.");
    Ok(())
}
