use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

use crate::{Error, Result};

/// All configuration loaded from environment variables at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Universe
    /// Symbols to consider. Empty means every symbol the exchange lists.
    pub symbols: Vec<String>,
    /// How many symbols (by traded volume) survive the pre-filter.
    pub top_symbols: usize,

    // Trading
    pub num_shares: u64,
    pub bin_interval: Duration,
    pub wait_interval: Duration,
    pub max_num_orders: usize,
    pub deploy_top_n: usize,
    pub max_cycles: Option<usize>,

    // Backtest
    pub backtest_lookback: Duration,
    pub backtest_init_capital: f64,
    pub backtest_init_shares: u64,
    pub backtest_num_shares: u64,

    // Strategies
    pub algo_bank_path: Option<String>,
    pub rng_seed: Option<u64>,

    // Paper exchange
    pub trade_tape_path: String,
    pub paper_slippage_bps: f64,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present.
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            debug!(error = %e, "No .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let symbols = lookup("SYMBOLS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let trade_tape_path = lookup("TRADE_TAPE_PATH").ok_or_else(|| {
            Error::Config(
                "Required environment variable 'TRADE_TAPE_PATH' is not set. Check your .env file."
                    .to_string(),
            )
        })?;

        let bin_interval_ms: u64 = parse_or(&lookup, "BIN_INTERVAL_MS", 250)?;
        if bin_interval_ms == 0 {
            return Err(Error::Config("BIN_INTERVAL_MS must be positive".to_string()));
        }

        Ok(Config {
            symbols,
            top_symbols: parse_or(&lookup, "TOP_SYMBOLS", 10)?,
            num_shares: parse_or(&lookup, "NUM_SHARES", 1)?,
            bin_interval: Duration::from_millis(bin_interval_ms),
            wait_interval: Duration::from_millis(parse_or(&lookup, "WAIT_INTERVAL_MS", 250)?),
            max_num_orders: parse_or(&lookup, "MAX_NUM_ORDERS", 60 * 2 * 4)?,
            deploy_top_n: parse_or(&lookup, "DEPLOY_TOP_N", 5)?,
            max_cycles: parse_opt(&lookup, "MAX_CYCLES")?,
            backtest_lookback: Duration::from_secs(parse_or(
                &lookup,
                "BACKTEST_LOOKBACK_SECS",
                60 * 2,
            )?),
            backtest_init_capital: parse_or(&lookup, "BACKTEST_INIT_CAPITAL", 100_000.0)?,
            backtest_init_shares: parse_or(&lookup, "BACKTEST_INIT_SHARES", 1000)?,
            backtest_num_shares: parse_or(&lookup, "BACKTEST_NUM_SHARES", 10)?,
            algo_bank_path: lookup("ALGO_BANK_PATH"),
            rng_seed: parse_opt(&lookup, "RNG_SEED")?,
            trade_tape_path,
            paper_slippage_bps: parse_or(&lookup, "PAPER_SLIPPAGE_BPS", 0.0)?,
        })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match parse_opt(lookup, key)? {
        Some(value) => Ok(value),
        None => {
            debug!(key, ?default, "Config key unset, using default");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parse_or_prefers_set_value_over_default() {
        let lookup = lookup_from(&[("NUM_SHARES", " 7 ")]);
        assert_eq!(parse_or(&lookup, "NUM_SHARES", 1u64).unwrap(), 7);
        assert_eq!(parse_or(&lookup, "TOP_SYMBOLS", 10usize).unwrap(), 10);
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let cfg = Config::from_lookup(lookup_from(&[("TRADE_TAPE_PATH", "tape.jsonl")])).unwrap();
        assert!(cfg.symbols.is_empty());
        assert_eq!(cfg.num_shares, 1);
        assert_eq!(cfg.bin_interval, Duration::from_millis(250));
        assert_eq!(cfg.max_num_orders, 480);
        assert_eq!(cfg.deploy_top_n, 5);
        assert_eq!(cfg.backtest_lookback, Duration::from_secs(120));
        assert_eq!(cfg.max_cycles, None);
        assert_eq!(cfg.rng_seed, None);
    }

    #[test]
    fn symbols_are_split_and_trimmed() {
        let cfg = Config::from_lookup(lookup_from(&[
            ("TRADE_TAPE_PATH", "tape.jsonl"),
            ("SYMBOLS", " AAPL, MSFT ,,GOOG"),
        ]))
        .unwrap();
        assert_eq!(cfg.symbols, vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn missing_tape_path_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = Config::from_lookup(lookup_from(&[
            ("TRADE_TAPE_PATH", "tape.jsonl"),
            ("NUM_SHARES", "ten"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("NUM_SHARES"));
    }

    #[test]
    fn zero_bin_interval_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("TRADE_TAPE_PATH", "tape.jsonl"),
            ("BIN_INTERVAL_MS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
