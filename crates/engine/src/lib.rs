pub mod executor;
pub mod lifecycle;
pub mod rng;
pub mod trader;

pub use executor::OrderExecutor;
pub use lifecycle::{CycleReport, Engine, EngineConfig, EngineHandle};
pub use rng::RngSource;
pub use trader::{Trader, TraderConfig, TraderReport};
