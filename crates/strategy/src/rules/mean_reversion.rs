use serde::{Deserialize, Serialize};

use aggregator::Bin;
use common::{Decision, Error, HoldReason, Result};

use crate::indicators::SmaIndicator;

/// Trade against deviations from a moving average of closes.
///
/// Buy when the last close is at least `threshold`% below the SMA of the
/// last `ma` closes; sell when it is at least `threshold`% above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReversionParams {
    /// Number of bins in the moving average.
    pub ma: usize,
    /// Percent band around the moving average.
    pub threshold: f64,
}

impl MeanReversionParams {
    pub fn validate(&self) -> Result<()> {
        if self.ma == 0 {
            return Err(Error::InvalidConfiguration(
                "mean_reversion: ma must be greater than 0".to_string(),
            ));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "mean_reversion: threshold must be a non-negative percent, got {}",
                self.threshold
            )));
        }
        Ok(())
    }

    pub fn evaluate(&self, bins: &[Bin]) -> Decision {
        let Some(ma) = SmaIndicator::new(self.ma).compute(bins) else {
            return Decision::Hold(HoldReason::InsufficientData);
        };
        // SMA defined implies every close in the window is defined
        let Some(close) = bins.last().and_then(Bin::close) else {
            return Decision::Hold(HoldReason::InsufficientData);
        };

        let buy_cutoff = (1.0 - self.threshold / 100.0) * ma;
        let sell_cutoff = (1.0 + self.threshold / 100.0) * ma;

        if close <= buy_cutoff {
            Decision::Buy(close)
        } else if close >= sell_cutoff {
            Decision::Sell(close)
        } else {
            Decision::Hold(HoldReason::NoSignal)
        }
    }
}
