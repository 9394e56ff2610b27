use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid trade at index {index}: {reason}")]
    InvalidTrade { index: usize, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
