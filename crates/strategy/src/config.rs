use serde::{Deserialize, Serialize};

use common::Result;

use crate::StrategySpec;

/// Top-level algo bank file (TOML).
///
/// Example `config/algos.toml`:
/// ```toml
/// [[algo]]
/// name = "mr_10_3"
/// strategy = { type = "mean_reversion", ma = 10, threshold = 3.0 }
///
/// [[algo]]
/// name = "rb_10"
/// strategy = { type = "random_buy", p = 0.1 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlgoBankFile {
    #[serde(rename = "algo", default)]
    pub algos: Vec<AlgoConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AlgoConfig {
    /// Unique name shown in logs and rankings.
    pub name: String,
    pub strategy: StrategySpec,
}

impl AlgoBankFile {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
