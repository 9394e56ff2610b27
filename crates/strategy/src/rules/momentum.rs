use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use aggregator::Bin;
use common::{Decision, Error, HoldReason, Result};

use crate::indicators::MomentumIndicator;

/// Trade in the direction of the recent weighted rate of change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MomentumParams {
    /// Weight of the newest bin's change.
    pub p1: f64,
    /// Weight of the prior bin's change. Expected `p1 + p2 = 1`.
    pub p2: f64,
    /// Percent score above which to buy (below its negative, sell).
    pub threshold: f64,
}

impl MomentumParams {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("p1", self.p1), ("p2", self.p2), ("threshold", self.threshold)] {
            if !value.is_finite() {
                return Err(Error::InvalidConfiguration(format!(
                    "momentum: {name} must be finite, got {value}"
                )));
            }
        }
        if self.threshold < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "momentum: threshold must be a non-negative percent, got {}",
                self.threshold
            )));
        }
        if (self.p1 + self.p2 - 1.0).abs() > 1e-9 {
            warn!(p1 = self.p1, p2 = self.p2, "momentum weights do not sum to 1");
        }
        Ok(())
    }

    pub fn evaluate(&self, bins: &[Bin]) -> Decision {
        let Some(score) = MomentumIndicator::new(self.p1, self.p2).compute(bins) else {
            return Decision::Hold(HoldReason::InsufficientData);
        };
        let Some(close) = bins.last().and_then(Bin::close) else {
            return Decision::Hold(HoldReason::InsufficientData);
        };
        debug!(momentum_pct = score * 100.0, "momentum score");

        if score >= self.threshold / 100.0 {
            Decision::Buy(close)
        } else if score <= -self.threshold / 100.0 {
            Decision::Sell(close)
        } else {
            Decision::Hold(HoldReason::NoSignal)
        }
    }
}
