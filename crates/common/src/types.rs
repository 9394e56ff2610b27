use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single executed trade as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    /// Execution price.
    pub price: f64,
    /// Shares exchanged. Negative values are rejected by `validate`.
    pub shares: i64,
    /// Exchange creation timestamp in microseconds since the Unix epoch.
    pub timestamp_us: u64,
}

impl Trade {
    pub fn new(symbol: impl Into<String>, price: f64, shares: i64, timestamp_us: u64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            shares,
            timestamp_us,
        }
    }

    /// Check the record is usable for aggregation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.price.is_finite() {
            return Err(format!("price is not a finite number: {}", self.price));
        }
        if self.price <= 0.0 {
            return Err(format!("price must be positive, got {}", self.price));
        }
        if self.shares < 0 {
            return Err(format!("shares must be non-negative, got {}", self.shares));
        }
        Ok(())
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_us)
            .ok()
            .and_then(DateTime::from_timestamp_micros)
    }
}

/// Side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Why an evaluator declined to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldReason {
    /// The rule ran and its thresholds were not crossed.
    NoSignal,
    /// Too few bins, or the bins needed carry no prices yet.
    InsufficientData,
}

/// Output of one strategy evaluation. A price is present iff the
/// decision is to trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Buy(f64),
    Sell(f64),
    Hold(HoldReason),
}

impl Decision {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Decision::Buy(_) => Some(OrderSide::Buy),
            Decision::Sell(_) => Some(OrderSide::Sell),
            Decision::Hold(_) => None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Decision::Buy(price) | Decision::Sell(price) => Some(*price),
            Decision::Hold(_) => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        matches!(self, Decision::Hold(_))
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Buy(price) => write!(f, "BUY @ {price}"),
            Decision::Sell(price) => write!(f, "SELL @ {price}"),
            Decision::Hold(HoldReason::NoSignal) => write!(f, "HOLD"),
            Decision::Hold(HoldReason::InsufficientData) => write!(f, "HOLD (insufficient data)"),
        }
    }
}

/// Only market orders are ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
}

/// Exchange-assigned order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An order to be submitted to the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Client-side id, used to correlate logs with the exchange id.
    pub client_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub shares: u64,
    /// Reference price taken from the decision. Market orders fill at
    /// whatever the exchange gives.
    pub price: f64,
}

impl Order {
    pub fn market(symbol: impl Into<String>, side: OrderSide, shares: u64, price: f64) -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            side,
            order_type: OrderType::Market,
            shares,
            price,
        }
    }
}

/// Current state of the trading engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
        }
    }
}

/// Commands sent to the engine via the command channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Start,
    Stop,
}
