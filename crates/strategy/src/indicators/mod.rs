pub mod momentum;
pub mod sma;

pub use momentum::MomentumIndicator;
pub use sma::SmaIndicator;
