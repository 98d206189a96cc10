//! The evolutionary loop: selection, mutation, crossover, elitism, and per-generation statistics.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use gp_grammar::{print_node, DefaultDelegate, Grammar, Tree, TreeGenomePrinterDelegate, TypeId};

use crate::error::EvolutionError;

/// Host-supplied callbacks the evolutionary loop relies on: fitness evaluation and the source of
/// freshly generated replacement subtrees for mutation.
pub trait EvolvingPopulationDelegate {
    fn compute_fitness(&mut self, individuals: &[Tree], fitnesses: &mut [f64]);
    fn generate_random_tree_of_type(&mut self, type_id: TypeId) -> Tree;
    fn genome_grammar(&self) -> &Grammar;

    /// The printer delegate [`Population::render_individual`] renders dumps through. Defaults to
    /// [`DefaultDelegate`]; a host overrides this to customize how e.g. constant leaves are shown.
    fn printer_delegate(&self) -> &dyn TreeGenomePrinterDelegate {
        &DefaultDelegate
    }
}

/// Per-generation fitness summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub average: f64,
    pub best: f64,
    pub best_index: usize,
}

/// A generation of individuals plus the state needed to advance it: fitnesses, the RNG, and the
/// variation rates.
#[derive(Debug)]
pub struct Population<D: EvolvingPopulationDelegate> {
    delegate: D,
    individuals: Vec<Tree>,
    fitnesses: Vec<f64>,
    generation: usize,
    last_evaluated_generation: Option<usize>,
    best_individual_index: Option<usize>,
    mutation_rate: f64,
    crossover_rate: f64,
    rng: StdRng,
}

impl<D: EvolvingPopulationDelegate> Population<D> {
    /// Builds an empty, uninitialized population. Call [`Population::initialize`] before
    /// evolving it.
    pub fn new(delegate: D, mutation_rate: f64, crossover_rate: f64, seed: u64) -> Result<Self, EvolutionError> {
        if mutation_rate < 0.0 || crossover_rate < 0.0 || mutation_rate + crossover_rate > 1.0 {
            return Err(EvolutionError::InvalidRates {
                mutation_rate,
                crossover_rate,
            });
        }
        Ok(Self {
            delegate,
            individuals: Vec::new(),
            fitnesses: Vec::new(),
            generation: 0,
            last_evaluated_generation: None,
            best_individual_index: None,
            mutation_rate,
            crossover_rate,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Fills this population with `population_size` individuals via ramped half-and-half
    /// initialization against `max_depth`.
    pub fn initialize(&mut self, population_size: usize, max_depth: usize) -> Result<(), EvolutionError> {
        if population_size == 0 {
            return Err(EvolutionError::EmptyPopulation);
        }
        if population_size < 3 {
            return Err(EvolutionError::PopulationTooSmall { population_size });
        }
        let grammar = self.delegate.genome_grammar();
        let generator = crate::generator::Generator::new(grammar);
        let mut individuals = Vec::with_capacity(population_size);
        crate::initializer::initialize(
            &generator,
            &mut self.rng,
            crate::initializer::InitializerOptions::new(population_size, max_depth),
            &mut crate::initializer::DefaultInitializerDelegate,
            |tree| individuals.push(tree),
        )?;
        self.individuals = individuals;
        self.fitnesses = vec![0.0; population_size];
        self.generation = 0;
        self.last_evaluated_generation = None;
        self.best_individual_index = None;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn individual(&self, index: usize) -> &Tree {
        &self.individuals[index]
    }

    pub fn fitness(&self, index: usize) -> f64 {
        self.fitnesses[index]
    }

    /// Renders an individual as a canonical S-expression, for diagnostics.
    pub fn render_individual(&self, index: usize) -> String {
        print_node(
            self.delegate.genome_grammar(),
            self.individuals[index].root(),
            self.delegate.printer_delegate(),
        )
    }

    /// Ensures fitnesses have been computed for the current generation (memoized), and returns the
    /// index of the best individual.
    pub fn evaluate_generation(&mut self) -> usize {
        if self.last_evaluated_generation != Some(self.generation) {
            self.delegate
                .compute_fitness(&self.individuals, &mut self.fitnesses);
            self.last_evaluated_generation = Some(self.generation);

            let mut best = 0;
            for i in 1..self.fitnesses.len() {
                if self.fitnesses[i] > self.fitnesses[best] {
                    best = i;
                }
            }
            self.best_individual_index = Some(best);

            let average = self.fitnesses.iter().sum::<f64>() / self.fitnesses.len() as f64;
            log::debug!(
                "generation {} evaluated: average={:.4}, best={:.4} (index {})",
                self.generation,
                average,
                self.fitnesses[best],
                best,
            );
        }
        self.best_individual_index.unwrap()
    }

    /// Fitness statistics for the current generation (evaluating it first, if needed).
    pub fn get_stats(&mut self) -> Stats {
        let best_index = self.evaluate_generation();
        let average = self.fitnesses.iter().sum::<f64>() / self.fitnesses.len() as f64;
        Stats {
            average,
            best: self.fitnesses[best_index],
            best_index,
        }
    }

    /// Advances to the next generation: evaluate, select (tournament-3 + elitism), then mutate or
    /// crossover each non-elite slot according to `mutation_rate`/`crossover_rate`.
    pub fn next_generation(&mut self) -> Result<(), EvolutionError> {
        let best = self.evaluate_generation();
        let n = self.individuals.len();
        log::info!("generation {}: advancing population of size {}", self.generation, n);

        let mut new_gen = Vec::with_capacity(n);
        new_gen.push(self.individuals[best].clone());
        new_gen.push(self.individuals[best].clone());

        for _ in 0..n.saturating_sub(3) {
            let candidates = [
                self.rng.gen_range(0..n),
                self.rng.gen_range(0..n),
                self.rng.gen_range(0..n),
            ];
            let mut winner = candidates[0];
            for &c in &candidates[1..] {
                if self.fitnesses[c] > self.fitnesses[winner] {
                    winner = c;
                }
            }
            new_gen.push(self.individuals[winner].clone());
        }

        let mut slot = 0;
        while slot < new_gen.len() {
            let p: f64 = self.rng.gen();
            if p <= self.mutation_rate {
                self.mutate_individual(slot, &mut new_gen)?;
                slot += 1;
            } else if p <= self.mutation_rate + self.crossover_rate {
                let partner = if slot + 1 < new_gen.len() {
                    slot + 1
                } else {
                    let j = self.rng.gen_range(0..new_gen.len());
                    if j == slot {
                        slot.saturating_sub(1)
                    } else {
                        j
                    }
                };
                self.crossover_pair(slot, partner, &mut new_gen);
                slot += 2;
            } else {
                slot += 1;
            }
        }

        new_gen.push(self.individuals[best].clone());

        self.individuals = new_gen;
        self.generation += 1;
        self.last_evaluated_generation = None;
        self.best_individual_index = None;
        Ok(())
    }

    fn mutate_individual(&mut self, slot: usize, new_gen: &mut [Tree]) -> Result<(), EvolutionError> {
        let len = new_gen[slot].len();
        let node_index = self.rng.gen_range(0..len);
        let node_value = new_gen[slot].node(node_index).unwrap().value();
        let type_id = self
            .delegate
            .genome_grammar()
            .definition_for_node_value(node_value)
            .result_type();
        let replacement = self.delegate.generate_random_tree_of_type(type_id);
        new_gen[slot].replace(node_index, &replacement)?;
        Ok(())
    }

    /// Type-aware subtree crossover between `new_gen[slot_a]` and `new_gen[slot_b]`. If no subtree
    /// of the right type exists in the partner, the pair is left unchanged and a warning is logged
    /// (per this module's `CrossoverTypeMismatch` recovery policy).
    fn crossover_pair(&mut self, slot_a: usize, slot_b: usize, new_gen: &mut [Tree]) {
        let len_a = new_gen[slot_a].len();
        let node_i = self.rng.gen_range(0..len_a);
        let grammar = self.delegate.genome_grammar();
        let type_i = grammar
            .definition_for_node_value(new_gen[slot_a].node(node_i).unwrap().value())
            .result_type();

        let matching: Vec<usize> = (0..new_gen[slot_b].len())
            .filter(|&j| {
                grammar
                    .definition_for_node_value(new_gen[slot_b].node(j).unwrap().value())
                    .result_type()
                    == type_i
            })
            .collect();

        if matching.is_empty() {
            log::warn!(
                "crossover type mismatch at generation {}: no subtree of the required type in parent \
                 (slots {slot_a}, {slot_b})",
                self.generation,
            );
            return;
        }

        let node_j = matching[self.rng.gen_range(0..matching.len())];
        let sub_a = new_gen[slot_a].get_subtree(node_i).unwrap();
        let sub_b = new_gen[slot_b].get_subtree(node_j).unwrap();
        new_gen[slot_a].replace(node_i, &sub_b).unwrap();
        new_gen[slot_b].replace(node_j, &sub_a).unwrap();
    }
}
