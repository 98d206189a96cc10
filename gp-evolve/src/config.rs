//! Run configuration, loaded from TOML the way this codebase loads its other declarative
//! run-time definitions.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::error::EvolutionError;

/// Population size, tree-shape limits, variation rates, run length, and RNG seed for one
/// evolutionary run.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub max_tree_depth: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub num_generations: usize,
    pub seed: u64,
}

/// The ways loading an [`EvolutionConfig`] from disk can fail.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "couldn't read config file: {e}"),
            ConfigError::Toml(e) => write!(f, "couldn't parse config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Toml(e)
    }
}

impl EvolutionConfig {
    /// Loads and parses a config file at `path`.
    pub fn load_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses a config from an in-memory TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Checks the rate/size invariants a [`crate::Population`] relies on.
    pub fn validate(&self) -> Result<(), EvolutionError> {
        if self.population_size == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        if self.population_size < 3 {
            return Err(EvolutionError::PopulationTooSmall {
                population_size: self.population_size,
            });
        }
        let rates_valid = self.mutation_rate >= 0.0
            && self.crossover_rate >= 0.0
            && self.mutation_rate + self.crossover_rate <= 1.0;
        if !rates_valid {
            return Err(EvolutionError::InvalidRates {
                mutation_rate: self.mutation_rate,
                crossover_rate: self.crossover_rate,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_toml() {
        let config = EvolutionConfig::from_toml(
            r#"
            population_size = 100
            max_tree_depth = 6
            mutation_rate = 0.1
            crossover_rate = 0.895
            num_generations = 100
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.population_size, 100);
        assert_eq!(config.seed, 42);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_rates_summing_over_one() {
        let config = EvolutionConfig {
            population_size: 10,
            max_tree_depth: 4,
            mutation_rate: 0.6,
            crossover_rate: 0.6,
            num_generations: 1,
            seed: 0,
        };
        assert_eq!(
            config.validate(),
            Err(EvolutionError::InvalidRates {
                mutation_rate: 0.6,
                crossover_rate: 0.6
            })
        );
    }

    #[test]
    fn rejects_empty_population() {
        let config = EvolutionConfig {
            population_size: 0,
            max_tree_depth: 4,
            mutation_rate: 0.1,
            crossover_rate: 0.1,
            num_generations: 1,
            seed: 0,
        };
        assert_eq!(config.validate(), Err(EvolutionError::EmptyPopulation));
    }
}
