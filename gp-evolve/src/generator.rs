//! Typed random tree generation: the Full and Grow strategies.

use rand::rngs::StdRng;
use rand::Rng;

use gp_grammar::{Builder, Grammar, Kind, TypeId};

use crate::error::GenerationError;

/// Which of the two classic GP tree-generation strategies to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every branch reaches exactly `max_depth`; only the last layer is terminals.
    Full,
    /// Internal nodes may be any node; the branch stops early if a terminal is drawn.
    Grow,
}

/// Produces random trees under a [`Grammar`]'s type constraints.
pub struct Generator<'g> {
    grammar: &'g Grammar,
    /// `min_depth_to_terminal[t]` is the fewest recursive descents needed to be sure a terminal of
    /// type `t` is reachable, or `None` if no terminal is known to be reachable at all (a
    /// malformed grammar with a type that is functions-only all the way down).
    min_depth_to_terminal: Vec<Option<usize>>,
}

impl<'g> Generator<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            min_depth_to_terminal: compute_min_depth_to_terminal(grammar),
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// Generates a tree whose every branch reaches exactly `max_depth`, appending it to `builder`.
    pub fn generate_full(
        &self,
        builder: &mut Builder,
        rng: &mut StdRng,
        max_depth: usize,
        type_id: TypeId,
    ) -> Result<(), GenerationError> {
        let mut budget = self.forced_descent_budget(type_id, max_depth);
        self.generate(builder, rng, max_depth, type_id, Strategy::Full, &mut budget)
    }

    /// Generates a tree that may terminate before `max_depth`, appending it to `builder`.
    pub fn generate_grow(
        &self,
        builder: &mut Builder,
        rng: &mut StdRng,
        max_depth: usize,
        type_id: TypeId,
    ) -> Result<(), GenerationError> {
        let mut budget = self.forced_descent_budget(type_id, max_depth);
        self.generate(builder, rng, max_depth, type_id, Strategy::Grow, &mut budget)
    }

    fn forced_descent_budget(&self, type_id: TypeId, max_depth: usize) -> usize {
        let known = if type_id.is_valid() {
            self.min_depth_to_terminal[type_id.index()]
        } else {
            Some(0)
        };
        known.unwrap_or(self.grammar.num_types() + 1) + max_depth + 1
    }

    fn generate(
        &self,
        builder: &mut Builder,
        rng: &mut StdRng,
        max_depth: usize,
        type_id: TypeId,
        strategy: Strategy,
        budget: &mut usize,
    ) -> Result<(), GenerationError> {
        if *budget == 0 {
            return Err(GenerationError::DepthExhausted { type_id, max_depth });
        }
        *budget -= 1;

        let set = self.grammar.definition_set_for_type(type_id);

        if max_depth <= 1 && set.has_terminals() {
            let v = rng.gen_range(0..set.type_constrained_terminal_limit());
            let id = set.resolve_constrained(v);
            builder.add(self.grammar.definition(id).node_value());
            return Ok(());
        }

        let draw_range = match strategy {
            Strategy::Full => set.function_range(),
            Strategy::Grow => set.full_range(),
        };
        if draw_range.is_empty() {
            return Err(GenerationError::DepthExhausted { type_id, max_depth });
        }
        let v = rng.gen_range(draw_range);
        let definition_id = set.resolve_constrained(v);
        let definition = self.grammar.definition(definition_id);

        match definition.kind() {
            Kind::Terminal => {
                builder.add(definition.node_value());
            }
            Kind::Function => {
                builder.push(definition.node_value());
                for &argument_type in definition.argument_types() {
                    self.generate(
                        builder,
                        rng,
                        max_depth.saturating_sub(1),
                        argument_type,
                        strategy,
                        budget,
                    )?;
                }
                builder.pop();
            }
        }
        Ok(())
    }
}

/// For every type, the fewest function-descents needed before a terminal is guaranteed reachable.
/// Computed once per grammar by relaxing `dist[t] = 0` if `t` has terminals, else
/// `1 + min over functions f of t of (max over f's argument types of dist[arg])`, iterated to a
/// fixed point.
fn compute_min_depth_to_terminal(grammar: &Grammar) -> Vec<Option<usize>> {
    let num_types = grammar.num_types();
    let mut dist: Vec<Option<usize>> = (0..num_types)
        .map(|t| {
            if grammar.definition_set_for_type(TypeId::new(t)).has_terminals() {
                Some(0)
            } else {
                None
            }
        })
        .collect();

    for _ in 0..=num_types {
        let mut changed = false;
        for t in 0..num_types {
            if dist[t].is_some() {
                continue;
            }
            let set = grammar.definition_set_for_type(TypeId::new(t));
            let best = set
                .functions()
                .iter()
                .filter_map(|&id| {
                    let def = grammar.definition(id);
                    def.argument_types()
                        .iter()
                        .map(|arg| dist[arg.index()])
                        .max()
                        .flatten()
                })
                .min();
            if let Some(best) = best {
                dist[t] = Some(best + 1);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use gp_grammar::{DefinitionSpec, INVALID_TYPE};
    use rand::SeedableRng;

    fn small_grammar() -> Grammar {
        let ty = TypeId::new(0);
        Grammar::new(
            vec!["int".to_owned()],
            vec![
                DefinitionSpec::terminal("x", ty, 10),
                DefinitionSpec::terminal("1", ty, 10),
                DefinitionSpec::binary("+", ty, [ty, ty], 10),
                DefinitionSpec::binary("*", ty, [ty, ty], 10),
            ],
        )
        .unwrap()
    }

    #[test]
    fn full_strategy_reaches_exact_depth() {
        let grammar = small_grammar();
        let generator = Generator::new(&grammar);
        let mut rng = StdRng::seed_from_u64(42);
        let mut builder = Builder::new();
        generator
            .generate_full(&mut builder, &mut rng, 3, INVALID_TYPE)
            .unwrap();
        let tree = builder.build();

        fn depth(node: gp_grammar::Node<'_>) -> usize {
            1 + node.children().map(depth).max().unwrap_or(0)
        }
        assert_eq!(depth(tree.root()), 3);
    }

    #[test]
    fn grow_strategy_never_exceeds_max_depth() {
        let grammar = small_grammar();
        let generator = Generator::new(&grammar);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut builder = Builder::new();
            generator
                .generate_grow(&mut builder, &mut rng, 4, INVALID_TYPE)
                .unwrap();
            let tree = builder.build();
            fn depth(node: gp_grammar::Node<'_>) -> usize {
                1 + node.children().map(depth).max().unwrap_or(0)
            }
            assert!(depth(tree.root()) <= 4);
        }
    }

    #[test]
    fn depth_one_always_picks_terminal_when_available() {
        let grammar = small_grammar();
        let generator = Generator::new(&grammar);
        let mut rng = StdRng::seed_from_u64(1);
        let mut builder = Builder::new();
        generator
            .generate_full(&mut builder, &mut rng, 1, INVALID_TYPE)
            .unwrap();
        let tree = builder.build();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn type_with_no_terminal_fails_cleanly_instead_of_overflowing_stack() {
        let ty = TypeId::new(0);
        let grammar = Grammar::new(
            vec!["void".to_owned()],
            vec![DefinitionSpec::unary("wrap", ty, ty, 1)],
        )
        .unwrap();
        let generator = Generator::new(&grammar);
        let mut rng = StdRng::seed_from_u64(1);
        let mut builder = Builder::new();
        let result = generator.generate_full(&mut builder, &mut rng, 1, ty);
        assert!(matches!(
            result,
            Err(GenerationError::DepthExhausted { .. })
        ));
    }
}
