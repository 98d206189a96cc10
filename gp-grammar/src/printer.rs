//! Canonical S-expression rendering of a [`crate::Tree`] genome.

use crate::{Grammar, Node};

/// Lets a host override the text printed for an individual node, e.g. to show a constant's
/// numeric payload instead of its bare definition name.
///
/// The default delegate ([`DefaultDelegate`]) always defers to the grammar's definition name.
pub trait TreeGenomePrinterDelegate {
    /// Returns the text to print for `node`, or `None` to fall back to the definition's name.
    fn node_text(&self, grammar: &Grammar, node: Node<'_>) -> Option<String> {
        let _ = (grammar, node);
        None
    }
}

/// The delegate used when no customisation is needed.
pub struct DefaultDelegate;

impl TreeGenomePrinterDelegate for DefaultDelegate {}

/// Renders `node` and its descendants as a canonical S-expression: a function node renders as
/// `"(" name child … ")"`, a terminal renders as its bare name.
pub fn print_node(grammar: &Grammar, node: Node<'_>, delegate: &dyn TreeGenomePrinterDelegate) -> String {
    let mut out = String::new();
    write_node(grammar, node, delegate, &mut out);
    out
}

fn write_node(
    grammar: &Grammar,
    node: Node<'_>,
    delegate: &dyn TreeGenomePrinterDelegate,
    out: &mut String,
) {
    if let Some(text) = delegate.node_text(grammar, node) {
        out.push_str(&text);
        return;
    }
    let definition = grammar.definition_for_node_value(node.value());
    if node.child_count() == 0 {
        out.push_str(definition.name());
        return;
    }
    out.push('(');
    out.push_str(definition.name());
    for child in node.children() {
        out.push(' ');
        write_node(grammar, child, delegate, out);
    }
    out.push(')');
}
