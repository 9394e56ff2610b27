use async_trait::async_trait;

use crate::{Order, OrderId, Result, Trade};

/// Abstraction over the exchange connection.
///
/// The exchange owns matching, sequencing and market-data distribution.
/// Traders only pull trades and push market orders through this trait.
/// `PaperClient` implements it for simulation.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Exchange clock in microseconds since the Unix epoch. Lookback
    /// windows are measured against this, not the local wall clock.
    async fn now_us(&self) -> Result<u64>;

    /// All symbols listed on the exchange.
    async fn symbols(&self) -> Result<Vec<String>>;

    /// Restrict market data to the given symbols.
    async fn configure_active_symbols(&self, symbols: &[String]) -> Result<()>;

    /// Trades for `symbol` with a timestamp strictly newer than `since_us`,
    /// oldest first.
    async fn recent_trades(&self, symbol: &str, since_us: u64) -> Result<Vec<Trade>>;

    /// Historical trades for `symbol` in `[start_us, end_us)`, oldest first.
    async fn historical_trades(&self, symbol: &str, start_us: u64, end_us: u64)
        -> Result<Vec<Trade>>;

    /// Submit an order. Returns the exchange-assigned id once it has been
    /// accepted for sequencing.
    async fn submit_order(&self, order: &Order) -> Result<OrderId>;
}
