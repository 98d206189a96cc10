//! Error types for tree generation and the evolutionary loop.

use std::fmt;

use gp_grammar::{GrammarError, TreeError, TypeId};

/// The ways random tree generation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationError {
    /// Recursion was forced past a hard depth ceiling while looking for a terminal of `type_id`,
    /// which usually means the grammar has a type with no terminal and no way to shrink toward
    /// one within `max_depth`.
    DepthExhausted { type_id: TypeId, max_depth: usize },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationError::DepthExhausted { type_id, max_depth } => write!(
                f,
                "could not generate a tree of type {type_id:?} within max_depth {max_depth}: \
                 no terminal was reachable before the depth ceiling"
            ),
        }
    }
}

impl std::error::Error for GenerationError {}

/// The ways constructing or advancing a [`crate::Population`] can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum EvolutionError {
    /// `Population::new` was asked to build a population of size zero.
    EmptyPopulation,
    /// `Population::initialize` was asked for fewer than 3 individuals, the minimum the elitism
    /// in `next_generation` needs to preserve population size (two elites seeded into the
    /// variation pass plus one appended untouched).
    PopulationTooSmall { population_size: usize },
    /// `mutation_rate` or `crossover_rate` was negative, or their sum exceeded `1.0`.
    InvalidRates {
        mutation_rate: f64,
        crossover_rate: f64,
    },
    Grammar(GrammarError),
    Tree(TreeError),
    Generation(GenerationError),
}

impl fmt::Display for EvolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvolutionError::EmptyPopulation => {
                write!(f, "population size must be greater than zero")
            }
            EvolutionError::PopulationTooSmall { population_size } => write!(
                f,
                "population size {population_size} is too small: at least 3 individuals are \
                 required to preserve population size across elitism"
            ),
            EvolutionError::InvalidRates {
                mutation_rate,
                crossover_rate,
            } => write!(
                f,
                "invalid rates: mutation_rate={mutation_rate}, crossover_rate={crossover_rate} \
                 (both must be >= 0 and sum to <= 1)"
            ),
            EvolutionError::Grammar(e) => write!(f, "{e}"),
            EvolutionError::Tree(e) => write!(f, "{e}"),
            EvolutionError::Generation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EvolutionError {}

impl From<GrammarError> for EvolutionError {
    fn from(e: GrammarError) -> Self {
        EvolutionError::Grammar(e)
    }
}

impl From<TreeError> for EvolutionError {
    fn from(e: TreeError) -> Self {
        EvolutionError::Tree(e)
    }
}

impl From<GenerationError> for EvolutionError {
    fn from(e: GenerationError) -> Self {
        EvolutionError::Generation(e)
    }
}
