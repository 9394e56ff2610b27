use std::sync::Arc;

use tracing::{info, warn};

use common::{Decision, ExchangeClient, Order, OrderId};

/// Turns trading decisions into market orders and submits them.
///
/// This is the only component that calls `ExchangeClient::submit_order`.
/// Submission failures are logged and reported as `None`; they never stop
/// the trader that asked.
#[derive(Clone)]
pub struct OrderExecutor {
    client: Arc<dyn ExchangeClient>,
    num_shares: u64,
}

impl OrderExecutor {
    pub fn new(client: Arc<dyn ExchangeClient>, num_shares: u64) -> Self {
        Self { client, num_shares }
    }

    /// Submit a market order for `decision`. Holds submit nothing.
    pub async fn execute(&self, symbol: &str, decision: Decision, trader_id: &str) -> Option<OrderId> {
        let (side, price) = (decision.side()?, decision.price()?);
        let order = Order::market(symbol, side, self.num_shares, price);
        info!(
            trader = trader_id,
            symbol,
            %side,
            shares = order.shares,
            price,
            client_id = %order.client_id,
            "Submitting order"
        );

        match self.client.submit_order(&order).await {
            Ok(order_id) => {
                info!(trader = trader_id, symbol, %order_id, "Order accepted");
                Some(order_id)
            }
            Err(e) => {
                warn!(trader = trader_id, symbol, error = %e, "Order submission failed");
                None
            }
        }
    }
}
