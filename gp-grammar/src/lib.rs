//! Grammar and packed-tree representation shared by every genetic-programming genome.
//!
//! This includes:
//! - The typed [`Grammar`] (definitions, node codes, per-type definition sets) in the
//!   [`grammar`] module.
//! - The packed preorder [`Tree`] genome representation in the [`tree`] module.
//! - A canonical S-expression renderer in the [`printer`] module.

mod grammar;
mod printer;
mod tree;

pub use grammar::{
    DefinitionId, DefinitionSpec, Grammar, GrammarError, Kind, NodeValue, TypeDefinitionSet,
    TypeId, INVALID_TYPE,
};
pub use grammar::Definition;
pub use printer::{print_node, DefaultDelegate, TreeGenomePrinterDelegate};
pub use tree::{Builder, Children, Node, Tree, TreeError};
