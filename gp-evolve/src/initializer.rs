//! Ramped half-and-half population initialization.

use rand::rngs::StdRng;

use gp_grammar::{Builder, Tree, TypeId, INVALID_TYPE};

use crate::error::GenerationError;
use crate::generator::Generator;

/// Lets a host override emission of individual genomes during ramped initialization, e.g. to force
/// a particular root function or root type. Returning `true` from either method means the delegate
/// has fully populated `builder` itself and the default generation should be skipped. `rng` and
/// `generator` are handed through so a delegate can force just the root and still generate its
/// children the normal way, e.g. pushing a forced function root then calling
/// `generator.generate_full` once per argument type before popping it.
pub trait RampedHalfAndHalfInitializerDelegate {
    fn generate_full(
        &mut self,
        generator: &Generator<'_>,
        rng: &mut StdRng,
        builder: &mut Builder,
        max_depth: usize,
    ) -> Result<bool, GenerationError> {
        let _ = (generator, rng, builder, max_depth);
        Ok(false)
    }

    fn generate_grow(
        &mut self,
        generator: &Generator<'_>,
        rng: &mut StdRng,
        builder: &mut Builder,
        max_depth: usize,
    ) -> Result<bool, GenerationError> {
        let _ = (generator, rng, builder, max_depth);
        Ok(false)
    }
}

/// The delegate used when no per-individual customisation is needed.
pub struct DefaultInitializerDelegate;

impl RampedHalfAndHalfInitializerDelegate for DefaultInitializerDelegate {}

/// Tunables for [`initialize`].
#[derive(Debug, Clone, Copy)]
pub struct InitializerOptions {
    pub population_size: usize,
    pub max_tree_depth: usize,
    pub root_type: TypeId,
}

impl InitializerOptions {
    pub fn new(population_size: usize, max_tree_depth: usize) -> Self {
        Self {
            population_size,
            max_tree_depth,
            root_type: INVALID_TYPE,
        }
    }
}

/// Emits `options.population_size` genomes to `sink`: the first half built with the Full strategy,
/// the second half with Grow, ramping each half's target depth linearly from `1` up to
/// approximately `options.max_tree_depth`.
pub fn initialize(
    generator: &Generator<'_>,
    rng: &mut StdRng,
    options: InitializerOptions,
    delegate: &mut impl RampedHalfAndHalfInitializerDelegate,
    mut sink: impl FnMut(Tree),
) -> Result<(), GenerationError> {
    let half = options.population_size / 2;

    for k in 0..half {
        let depth = ramped_depth(options.max_tree_depth, half, k);
        let mut builder = Builder::new();
        if !delegate.generate_full(generator, rng, &mut builder, depth)? {
            generator.generate_full(&mut builder, rng, depth, options.root_type)?;
        }
        sink(builder.build());
    }

    for k in 0..(options.population_size - half) {
        let depth = ramped_depth(options.max_tree_depth, half.max(1), k);
        let mut builder = Builder::new();
        if !delegate.generate_grow(generator, rng, &mut builder, depth)? {
            generator.generate_grow(&mut builder, rng, depth, options.root_type)?;
        }
        sink(builder.build());
    }

    Ok(())
}

fn ramped_depth(max_tree_depth: usize, half: usize, k: usize) -> usize {
    if half == 0 {
        return max_tree_depth.max(1);
    }
    let depth = 1.0 + (max_tree_depth as f64 / half as f64) * k as f64;
    (depth.floor() as usize).max(1)
}
