//! The evolutionary loop built on top of `gp_grammar`'s typed grammar and packed tree: random tree
//! generation, ramped half-and-half initialization, tournament selection, subtree mutation and
//! crossover, and the host-facing evaluator scaffold.

mod config;
mod error;
mod evaluator;
mod generator;
mod initializer;
mod population;

pub use config::{ConfigError, EvolutionConfig};
pub use error::{EvolutionError, GenerationError};
pub use evaluator::{evaluate, Evaluator};
pub use generator::{Generator, Strategy};
pub use initializer::{
    initialize, DefaultInitializerDelegate, InitializerOptions, RampedHalfAndHalfInitializerDelegate,
};
pub use population::{EvolvingPopulationDelegate, Population, Stats};
