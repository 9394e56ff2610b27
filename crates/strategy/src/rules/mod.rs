//! The decision rules. Each one looks only at the tail of the bins it is
//! given, so evaluating `bins[..i]` reproduces what the rule would have
//! said when bin `i - 1` was the newest.

pub mod mean_reversion;
pub mod momentum;
pub mod random;

pub use mean_reversion::MeanReversionParams;
pub use momentum::MomentumParams;
pub use random::RandomParams;

use aggregator::Bin;
use common::{Decision, HoldReason, OrderSide};

/// Trade `side` at the last close on every call.
pub fn always(bins: &[Bin], side: OrderSide) -> Decision {
    match (bins.last().and_then(Bin::close), side) {
        (Some(close), OrderSide::Buy) => Decision::Buy(close),
        (Some(close), OrderSide::Sell) => Decision::Sell(close),
        (None, _) => Decision::Hold(HoldReason::InsufficientData),
    }
}
