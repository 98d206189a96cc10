//! A reusable post-order walker that dispatches to host-supplied callbacks by arity.

use gp_grammar::{DefinitionId, Grammar, Node};

/// Host-implemented value computation for a genome of result type `T`.
///
/// Default bodies return `T::default()`, so a host only needs to override the callbacks its
/// grammar actually exercises (e.g. a grammar with no ternary-or-higher functions never needs
/// `evaluate_function`).
pub trait Evaluator<T: Default> {
    fn evaluate_terminal(&mut self, definition_id: DefinitionId, node: Node<'_>) -> T {
        let _ = (definition_id, node);
        T::default()
    }

    fn evaluate_unary(&mut self, definition_id: DefinitionId, node: Node<'_>, x: T) -> T {
        let _ = (definition_id, node, x);
        T::default()
    }

    fn evaluate_binary(&mut self, definition_id: DefinitionId, node: Node<'_>, x: T, y: T) -> T {
        let _ = (definition_id, node, x, y);
        T::default()
    }

    fn evaluate_function(&mut self, definition_id: DefinitionId, node: Node<'_>, args: Vec<T>) -> T {
        let _ = (definition_id, node, args);
        T::default()
    }
}

/// Recursively evaluates `node`, dispatching to `evaluator` post-order: children are evaluated
/// before the node that contains them, and the callback chosen depends only on how many children
/// the node has.
pub fn evaluate<T: Default>(
    grammar: &Grammar,
    evaluator: &mut impl Evaluator<T>,
    node: Node<'_>,
) -> T {
    let definition_id = grammar.definition_id_for_node_value(node.value());
    match node.child_count() {
        0 => evaluator.evaluate_terminal(definition_id, node),
        1 => {
            let x = evaluate(grammar, evaluator, node.child(0).unwrap());
            evaluator.evaluate_unary(definition_id, node, x)
        }
        2 => {
            let x = evaluate(grammar, evaluator, node.child(0).unwrap());
            let y = evaluate(grammar, evaluator, node.child(1).unwrap());
            evaluator.evaluate_binary(definition_id, node, x, y)
        }
        _ => {
            let args = node
                .children()
                .map(|child| evaluate(grammar, evaluator, child))
                .collect();
            evaluator.evaluate_function(definition_id, node, args)
        }
    }
}
