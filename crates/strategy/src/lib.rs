pub mod config;
pub mod indicators;
pub mod registry;
pub mod rules;

pub use config::{AlgoBankFile, AlgoConfig};
pub use registry::{Algo, AlgoBank};
pub use rules::{MeanReversionParams, MomentumParams, RandomParams};

use rand::Rng;
use serde::{Deserialize, Serialize};

use aggregator::Bin;
use common::{Decision, OrderSide, Result};

/// A trading rule together with its parameters.
///
/// Evaluation is a pure function of the bins passed in (plus the injected
/// RNG for the random rules): no state survives between calls, so one
/// `StrategySpec` can be shared by any number of per-symbol traders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySpec {
    MeanReversion(MeanReversionParams),
    Momentum(MomentumParams),
    RandomBuy(RandomParams),
    RandomSell(RandomParams),
    AlwaysBuy,
    AlwaysSell,
}

impl StrategySpec {
    pub fn mean_reversion(ma: usize, threshold: f64) -> Self {
        Self::MeanReversion(MeanReversionParams { ma, threshold })
    }

    pub fn momentum(p1: f64, p2: f64, threshold: f64) -> Self {
        Self::Momentum(MomentumParams { p1, p2, threshold })
    }

    pub fn random_buy(p: f64) -> Self {
        Self::RandomBuy(RandomParams { p })
    }

    pub fn random_sell(p: f64) -> Self {
        Self::RandomSell(RandomParams { p })
    }

    /// Type identifier as used in the algo bank file.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MeanReversion(_) => "mean_reversion",
            Self::Momentum(_) => "momentum",
            Self::RandomBuy(_) => "random_buy",
            Self::RandomSell(_) => "random_sell",
            Self::AlwaysBuy => "always_buy",
            Self::AlwaysSell => "always_sell",
        }
    }

    /// Minimum number of bins the rule needs before it can trade.
    pub fn min_bins(&self) -> usize {
        match self {
            Self::MeanReversion(p) => p.ma.max(1),
            Self::Momentum(_) => 2,
            _ => 1,
        }
    }

    /// Reject parameters the rule cannot work with.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::MeanReversion(p) => p.validate(),
            Self::Momentum(p) => p.validate(),
            Self::RandomBuy(p) | Self::RandomSell(p) => p.validate(),
            Self::AlwaysBuy | Self::AlwaysSell => Ok(()),
        }
    }

    /// Decide what to do given the bins so far (oldest first).
    ///
    /// Too few bins, or a newest bin without prices, yields
    /// `Decision::Hold(HoldReason::InsufficientData)`; this never fails.
    pub fn evaluate<R: Rng + ?Sized>(&self, bins: &[Bin], rng: &mut R) -> Decision {
        match self {
            Self::MeanReversion(p) => p.evaluate(bins),
            Self::Momentum(p) => p.evaluate(bins),
            Self::RandomBuy(p) => p.evaluate(bins, OrderSide::Buy, rng),
            Self::RandomSell(p) => p.evaluate(bins, OrderSide::Sell, rng),
            Self::AlwaysBuy => rules::always(bins, OrderSide::Buy),
            Self::AlwaysSell => rules::always(bins, OrderSide::Sell),
        }
    }
}

impl std::fmt::Display for StrategySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MeanReversion(p) => write!(f, "mean_reversion(ma={}, threshold={})", p.ma, p.threshold),
            Self::Momentum(p) => write!(
                f,
                "momentum(p1={}, p2={}, threshold={})",
                p.p1, p.p2, p.threshold
            ),
            Self::RandomBuy(p) => write!(f, "random_buy(p={})", p.p),
            Self::RandomSell(p) => write!(f, "random_sell(p={})", p.p),
            Self::AlwaysBuy => write!(f, "always_buy"),
            Self::AlwaysSell => write!(f, "always_sell"),
        }
    }
}
