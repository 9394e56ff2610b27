use std::collections::BTreeMap;

use tracing::info;

use common::{Error, Result};

use crate::config::AlgoBankFile;
use crate::StrategySpec;

/// A named, fully parameterised strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct Algo {
    pub name: String,
    pub strategy: StrategySpec,
}

/// Named table of algos, iterated in name order.
#[derive(Debug, Clone, Default)]
pub struct AlgoBank {
    algos: BTreeMap<String, StrategySpec>,
}

impl AlgoBank {
    /// Build the bank from a parsed file. Duplicate names and invalid
    /// parameters are configuration errors.
    pub fn from_config(file: &AlgoBankFile) -> Result<Self> {
        let mut bank = Self::default();
        for cfg in &file.algos {
            bank.insert(cfg.name.clone(), cfg.strategy.clone())?;
            info!(name = %cfg.name, strategy = %cfg.strategy, "Registered algo");
        }
        Ok(bank)
    }

    /// The stock bank: three mean-reversion bands, four momentum
    /// weightings and four random traders.
    pub fn standard() -> Self {
        let entries = [
            ("mr_10_3", StrategySpec::mean_reversion(10, 3.0)),
            ("mr_10_5", StrategySpec::mean_reversion(10, 5.0)),
            ("mr_10_10", StrategySpec::mean_reversion(10, 10.0)),
            ("mo_5_5_1", StrategySpec::momentum(0.5, 0.5, 1.0)),
            ("mo_5_5_3", StrategySpec::momentum(0.5, 0.5, 3.0)),
            ("mo_8_2_1", StrategySpec::momentum(0.8, 0.2, 1.0)),
            ("mo_8_2_3", StrategySpec::momentum(0.8, 0.2, 3.0)),
            ("rb_10", StrategySpec::random_buy(0.1)),
            ("rb_50", StrategySpec::random_buy(0.5)),
            ("rs_10", StrategySpec::random_sell(0.1)),
            ("rs_50", StrategySpec::random_sell(0.5)),
        ];
        Self {
            algos: entries
                .into_iter()
                .map(|(name, spec)| (name.to_string(), spec))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, strategy: StrategySpec) -> Result<()> {
        let name = name.into();
        strategy.validate()?;
        if self.algos.contains_key(&name) {
            return Err(Error::InvalidConfiguration(format!(
                "duplicate algo name '{name}'"
            )));
        }
        self.algos.insert(name, strategy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Algo> {
        self.algos.get(name).map(|strategy| Algo {
            name: name.to_string(),
            strategy: strategy.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.algos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.algos.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.algos.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = Algo> + '_ {
        self.algos.iter().map(|(name, strategy)| Algo {
            name: name.clone(),
            strategy: strategy.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_bank_is_valid() {
        let bank = AlgoBank::standard();
        assert_eq!(bank.len(), 11);
        for algo in bank.iter() {
            algo.strategy.validate().unwrap();
        }
        assert_eq!(
            bank.get("mo_8_2_3").unwrap().strategy,
            StrategySpec::momentum(0.8, 0.2, 3.0)
        );
    }

    #[test]
    fn iteration_is_in_name_order() {
        let bank = AlgoBank::standard();
        let names: Vec<&str> = bank.names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut bank = AlgoBank::default();
        bank.insert("a", StrategySpec::AlwaysSell).unwrap();
        let err = bank.insert("a", StrategySpec::AlwaysBuy).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn invalid_params_rejected_on_insert() {
        let mut bank = AlgoBank::default();
        assert!(bank.insert("bad", StrategySpec::mean_reversion(0, 1.0)).is_err());
        assert!(bank.insert("bad", StrategySpec::random_buy(2.0)).is_err());
        assert!(bank.is_empty());
    }

    #[test]
    fn from_config_registers_all() {
        let file = AlgoBankFile::parse(
            r#"
            [[algo]]
            name = "sell"
            strategy = { type = "always_sell" }

            [[algo]]
            name = "mr"
            strategy = { type = "mean_reversion", ma = 3, threshold = 1.0 }
            "#,
        )
        .unwrap();
        let bank = AlgoBank::from_config(&file).unwrap();
        assert_eq!(bank.names().collect::<Vec<_>>(), vec!["mr", "sell"]);
        assert!(bank.get("missing").is_none());
    }
}
