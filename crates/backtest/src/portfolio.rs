use serde::{Deserialize, Serialize};
use tracing::debug;

use common::OrderSide;

/// Cash-and-shares ledger for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub capital: f64,
    pub shares: u64,
}

impl Portfolio {
    pub fn new(capital: f64, shares: u64) -> Self {
        Self { capital, shares }
    }

    pub fn net_worth(&self, price: f64) -> f64 {
        self.capital + self.shares as f64 * price
    }

    /// Apply a fill of `qty` shares at `price` if the ledger can cover it:
    /// buys need the cash, sells need the shares. Returns whether it
    /// transacted.
    pub fn try_fill(&mut self, side: OrderSide, qty: u64, price: f64) -> bool {
        let notional = qty as f64 * price;
        let filled = match side {
            OrderSide::Buy if self.capital >= notional => {
                self.capital -= notional;
                self.shares += qty;
                true
            }
            OrderSide::Sell if self.shares >= qty => {
                self.capital += notional;
                self.shares -= qty;
                true
            }
            _ => false,
        };
        if !filled {
            debug!(%side, qty, price, capital = self.capital, shares = self.shares, "Fill skipped: ledger cannot cover");
        }
        filled
    }
}
