pub mod tape;

pub use tape::{load_tape, parse_tape};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, ExchangeClient, Order, OrderId, OrderSide, Result, Trade};

/// A simulated fill recorded by the paper exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperFill {
    pub order_id: OrderId,
    pub client_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub shares: u64,
    pub fill_price: f64,
    pub timestamp_us: u64,
}

/// Simulated exchange replaying a recorded trade tape.
///
/// A replay clock decides which part of the tape is visible: pulls only
/// return trades at or before the clock, and market orders fill at the
/// last visible price with configurable slippage. Nothing is ever sent
/// to a real venue.
pub struct PaperClient {
    /// Per-symbol tape, sorted by timestamp (arrival order kept on ties).
    tape: HashMap<String, Vec<Trade>>,
    clock_us: Arc<RwLock<u64>>,
    active: Arc<RwLock<BTreeSet<String>>>,
    /// Net shares held per symbol. Sells may take it negative.
    holdings: Arc<RwLock<HashMap<String, i64>>>,
    fills: Arc<RwLock<Vec<PaperFill>>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperClient {
    /// Build from a flat trade list. The clock starts at the first trade.
    pub fn new(trades: Vec<Trade>, slippage_bps: f64) -> Self {
        let mut tape: HashMap<String, Vec<Trade>> = HashMap::new();
        for trade in trades {
            tape.entry(trade.symbol.clone()).or_default().push(trade);
        }
        for trades in tape.values_mut() {
            trades.sort_by_key(|t| t.timestamp_us);
        }
        let start = tape
            .values()
            .filter_map(|t| t.first())
            .map(|t| t.timestamp_us)
            .min()
            .unwrap_or(0);

        info!(
            symbols = tape.len(),
            trades = tape.values().map(Vec::len).sum::<usize>(),
            slippage_bps,
            start_us = start,
            "PaperClient initialized"
        );
        Self {
            tape,
            clock_us: Arc::new(RwLock::new(start)),
            active: Arc::new(RwLock::new(BTreeSet::new())),
            holdings: Arc::new(RwLock::new(HashMap::new())),
            fills: Arc::new(RwLock::new(Vec::new())),
            slippage_bps,
        }
    }

    /// Load a JSON-lines tape from disk.
    pub fn from_tape_file(path: &str, slippage_bps: f64) -> Result<Self> {
        Ok(Self::new(load_tape(path)?, slippage_bps))
    }

    pub async fn clock_us(&self) -> u64 {
        *self.clock_us.read().await
    }

    pub async fn set_clock(&self, us: u64) {
        *self.clock_us.write().await = us;
    }

    /// Move the replay clock forward. Returns the new clock.
    pub async fn advance(&self, by: Duration) -> u64 {
        let step = u64::try_from(by.as_micros()).unwrap_or(u64::MAX);
        let mut clock = self.clock_us.write().await;
        *clock = clock.saturating_add(step);
        *clock
    }

    /// Timestamp of the newest trade on the tape.
    pub fn tape_end_us(&self) -> u64 {
        self.tape
            .values()
            .filter_map(|t| t.last())
            .map(|t| t.timestamp_us)
            .max()
            .unwrap_or(0)
    }

    pub async fn is_exhausted(&self) -> bool {
        self.clock_us().await >= self.tape_end_us()
    }

    pub async fn active_symbols(&self) -> Vec<String> {
        self.active.read().await.iter().cloned().collect()
    }

    pub async fn holdings(&self) -> BTreeMap<String, i64> {
        self.holdings
            .read()
            .await
            .iter()
            .map(|(s, n)| (s.clone(), *n))
            .collect()
    }

    pub async fn fills(&self) -> Vec<PaperFill> {
        self.fills.read().await.clone()
    }

    fn symbol_tape(&self, symbol: &str) -> Result<&[Trade]> {
        self.tape
            .get(symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Exchange(format!("unknown symbol '{symbol}'")))
    }

    /// Tape entries up to and including the clock.
    fn visible<'a>(trades: &'a [Trade], clock: u64) -> &'a [Trade] {
        let end = trades.partition_point(|t| t.timestamp_us <= clock);
        &trades[..end]
    }
}

#[async_trait]
impl ExchangeClient for PaperClient {
    async fn now_us(&self) -> Result<u64> {
        Ok(self.clock_us().await)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let mut symbols: Vec<String> = self.tape.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    async fn configure_active_symbols(&self, symbols: &[String]) -> Result<()> {
        for symbol in symbols {
            self.symbol_tape(symbol)?;
        }
        let mut active = self.active.write().await;
        *active = symbols.iter().cloned().collect();
        info!(symbols = ?*active, "Active symbols configured");
        Ok(())
    }

    async fn recent_trades(&self, symbol: &str, since_us: u64) -> Result<Vec<Trade>> {
        if !self.active.read().await.contains(symbol) {
            return Err(Error::Exchange(format!("symbol '{symbol}' is not active")));
        }
        let clock = self.clock_us().await;
        let visible = Self::visible(self.symbol_tape(symbol)?, clock);
        let start = visible.partition_point(|t| t.timestamp_us <= since_us);
        Ok(visible[start..].to_vec())
    }

    async fn historical_trades(
        &self,
        symbol: &str,
        start_us: u64,
        end_us: u64,
    ) -> Result<Vec<Trade>> {
        let clock = self.clock_us().await;
        let visible = Self::visible(self.symbol_tape(symbol)?, clock);
        Ok(visible
            .iter()
            .filter(|t| t.timestamp_us >= start_us && t.timestamp_us < end_us)
            .cloned()
            .collect())
    }

    async fn submit_order(&self, order: &Order) -> Result<OrderId> {
        if order.shares == 0 {
            return Err(Error::OrderRejected {
                symbol: order.symbol.clone(),
                reason: "order for zero shares".to_string(),
            });
        }
        if !self.active.read().await.contains(&order.symbol) {
            return Err(Error::OrderRejected {
                symbol: order.symbol.clone(),
                reason: "symbol is not active".to_string(),
            });
        }

        let clock = self.clock_us().await;
        let last = Self::visible(self.symbol_tape(&order.symbol)?, clock)
            .last()
            .ok_or_else(|| {
                Error::Exchange(format!(
                    "PaperClient has no price for '{}' yet. Advance the replay clock.",
                    order.symbol
                ))
            })?;
        let last_price = last.price;

        // Buys pay more, sells receive less
        let fill_price = match order.side {
            OrderSide::Buy => last_price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => last_price * (1.0 - self.slippage_bps / 10_000.0),
        };
        let order_id = OrderId(format!("paper-{}", uuid::Uuid::new_v4()));

        debug!(
            symbol = %order.symbol,
            side = %order.side,
            reference = order.price,
            last = last_price,
            priced_at = ?last.time(),
            fill = fill_price,
            shares = order.shares,
            order_id = %order_id,
            "Paper fill simulated"
        );

        let delta = i64::try_from(order.shares).unwrap_or(i64::MAX);
        {
            let mut holdings = self.holdings.write().await;
            let held = holdings.entry(order.symbol.clone()).or_insert(0);
            *held = match order.side {
                OrderSide::Buy => held.saturating_add(delta),
                OrderSide::Sell => held.saturating_sub(delta),
            };
        }
        self.fills.write().await.push(PaperFill {
            order_id: order_id.clone(),
            client_id: order.client_id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            shares: order.shares,
            fill_price,
            timestamp_us: clock,
        });

        Ok(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tape() -> Vec<Trade> {
        vec![
            Trade::new("AAA", 10.0, 5, 1_000),
            Trade::new("BBB", 50.0, 1, 1_500),
            Trade::new("AAA", 11.0, 2, 2_000),
            Trade::new("AAA", 12.0, 3, 3_000),
        ]
    }

    async fn client(slippage_bps: f64) -> PaperClient {
        let client = PaperClient::new(tape(), slippage_bps);
        client
            .configure_active_symbols(&["AAA".to_string()])
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn clock_starts_at_first_trade_and_hides_the_future() {
        let client = client(0.0).await;
        assert_eq!(client.clock_us().await, 1_000);
        let seen = client.recent_trades("AAA", 0).await.unwrap();
        assert_eq!(seen.len(), 1);

        client.advance(Duration::from_micros(1_500)).await;
        let seen = client.recent_trades("AAA", 1_000).await.unwrap();
        assert_eq!(seen.iter().map(|t| t.price).collect::<Vec<_>>(), vec![11.0]);
        assert!(!client.is_exhausted().await);

        client.advance(Duration::from_secs(1)).await;
        assert!(client.is_exhausted().await);
        assert_eq!(client.now_us().await.unwrap(), 1_002_500);
    }

    #[tokio::test]
    async fn recent_pull_is_strictly_newer() {
        let client = client(0.0).await;
        client.set_clock(10_000).await;
        let seen = client.recent_trades("AAA", 2_000).await.unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].timestamp_us, 3_000);
    }

    #[tokio::test]
    async fn historical_pull_is_half_open() {
        let client = client(0.0).await;
        client.set_clock(10_000).await;
        let window = client.historical_trades("AAA", 1_000, 3_000).await.unwrap();
        assert_eq!(window.len(), 2);
        // Inactive symbols are still available historically.
        assert_eq!(client.historical_trades("BBB", 0, 10_000).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inactive_and_unknown_symbols_rejected() {
        let client = client(0.0).await;
        assert!(client.recent_trades("BBB", 0).await.is_err());
        assert!(client
            .configure_active_symbols(&["ZZZ".to_string()])
            .await
            .is_err());
        let order = Order::market("BBB", OrderSide::Buy, 1, 50.0);
        assert!(matches!(
            client.submit_order(&order).await,
            Err(Error::OrderRejected { .. })
        ));
    }

    #[tokio::test]
    async fn buy_fill_applies_positive_slippage() {
        let client = client(10.0).await; // 10 bps
        client.set_clock(3_000).await;
        let order = Order::market("AAA", OrderSide::Buy, 2, 12.0);
        let id = client.submit_order(&order).await.unwrap();
        assert!(id.0.starts_with("paper-"));

        let fills = client.fills().await;
        let expected = 12.0 * (1.0 + 10.0 / 10_000.0);
        assert!((fills[0].fill_price - expected).abs() < 1e-9);
        assert_eq!(fills[0].client_id, order.client_id);
    }

    #[tokio::test]
    async fn sell_fill_applies_negative_slippage() {
        let client = client(10.0).await;
        let order = Order::market("AAA", OrderSide::Sell, 1, 10.0);
        client.submit_order(&order).await.unwrap();
        let expected = 10.0 * (1.0 - 10.0 / 10_000.0);
        assert!((client.fills().await[0].fill_price - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn holdings_track_net_shares() {
        let client = client(0.0).await;
        client
            .submit_order(&Order::market("AAA", OrderSide::Buy, 5, 10.0))
            .await
            .unwrap();
        client
            .submit_order(&Order::market("AAA", OrderSide::Sell, 2, 10.0))
            .await
            .unwrap();
        assert_eq!(client.holdings().await.get("AAA"), Some(&3));
    }

    #[tokio::test]
    async fn zero_share_order_rejected() {
        let client = client(0.0).await;
        let order = Order::market("AAA", OrderSide::Buy, 0, 10.0);
        assert!(matches!(
            client.submit_order(&order).await,
            Err(Error::OrderRejected { .. })
        ));
        assert!(client.fills().await.is_empty());
    }
}
