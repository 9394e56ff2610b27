use rand::Rng;
use serde::{Deserialize, Serialize};

use aggregator::Bin;
use common::{Decision, Error, HoldReason, OrderSide, Result};

/// Trade on a coin flip with probability `p`, at the last close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomParams {
    pub p: f64,
}

impl RandomParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.p) {
            return Err(Error::InvalidConfiguration(format!(
                "random: p must be within [0, 1], got {}",
                self.p
            )));
        }
        Ok(())
    }

    /// Draw from `[0, 1)` and trade on `side` when the draw is below `p`,
    /// so `p = 0` never trades and `p = 1` always does.
    pub fn evaluate<R: Rng + ?Sized>(&self, bins: &[Bin], side: OrderSide, rng: &mut R) -> Decision {
        let Some(close) = bins.last().and_then(Bin::close) else {
            return Decision::Hold(HoldReason::InsufficientData);
        };
        let draw: f64 = rng.gen();
        if draw < self.p {
            match side {
                OrderSide::Buy => Decision::Buy(close),
                OrderSide::Sell => Decision::Sell(close),
            }
        } else {
            Decision::Hold(HoldReason::NoSignal)
        }
    }
}
