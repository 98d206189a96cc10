//! The typed grammar: the set of terminals and functions a [`crate::Tree`] genome is built from.
//!
//! A [`Grammar`] is constructed once from a list of type names and a list of [`DefinitionSpec`]s,
//! and is immutable thereafter. Construction reorders definitions into a canonical layout and
//! assigns each one a dense [`NodeValue`] range, so that picking a uniformly random integer in the
//! right range is the same thing as picking a definition with probability proportional to its
//! `weight`.

use std::fmt;
use std::ops::Range;

use bimap::BiMap;
use itertools::Itertools;

index_vec::define_index_type! {
    /// A dense index into a [`Grammar`]'s definition table, assigned in canonical
    /// (kind, type)-bucketed order. See [`Grammar`] for the exact layout.
    pub struct DefinitionId = usize;
}

/// A dense index into a [`Grammar`]'s type table, assigned in type-registration order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

/// The sentinel type meaning "any type" — used to request the grammar's global definition set
/// rather than one scoped to a single type.
pub const INVALID_TYPE: TypeId = TypeId(usize::MAX);

impl TypeId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        TypeId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != usize::MAX
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == INVALID_TYPE {
            write!(f, "TypeId(INVALID)")
        } else {
            write!(f, "TypeId({})", self.0)
        }
    }
}

/// The integer code assigned to a single grammar node. Every [`Definition`] owns a contiguous
/// range `[code, code + weight)` of these; any value in that range resolves back to the
/// definition that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeValue(u32);

impl NodeValue {
    #[inline]
    pub fn from_raw(v: u32) -> Self {
        NodeValue(v)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Whether a [`Definition`] is a leaf producer or an internal-node producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// A leaf: zero arguments.
    Terminal,
    /// An internal node: one or more arguments.
    Function,
}

/// One entry in a grammar, as supplied by the host before canonicalization.
#[derive(Debug, Clone)]
pub struct DefinitionSpec {
    pub name: String,
    pub result_type: TypeId,
    pub argument_types: Vec<TypeId>,
    pub weight: u32,
}

impl DefinitionSpec {
    /// A leaf producer with no arguments.
    pub fn terminal(name: impl Into<String>, result_type: TypeId, weight: u32) -> Self {
        Self {
            name: name.into(),
            result_type,
            argument_types: Vec::new(),
            weight,
        }
    }

    /// A function taking exactly one argument.
    pub fn unary(
        name: impl Into<String>,
        result_type: TypeId,
        argument_type: TypeId,
        weight: u32,
    ) -> Self {
        Self::function(name, result_type, vec![argument_type], weight)
    }

    /// A function taking exactly two arguments.
    pub fn binary(
        name: impl Into<String>,
        result_type: TypeId,
        argument_types: [TypeId; 2],
        weight: u32,
    ) -> Self {
        Self::function(name, result_type, argument_types.to_vec(), weight)
    }

    /// A function taking exactly three arguments.
    pub fn ternary(
        name: impl Into<String>,
        result_type: TypeId,
        argument_types: [TypeId; 3],
        weight: u32,
    ) -> Self {
        Self::function(name, result_type, argument_types.to_vec(), weight)
    }

    /// A function taking any non-zero number of arguments.
    pub fn function(
        name: impl Into<String>,
        result_type: TypeId,
        argument_types: Vec<TypeId>,
        weight: u32,
    ) -> Self {
        Self {
            name: name.into(),
            result_type,
            argument_types,
            weight,
        }
    }

    fn kind(&self) -> Kind {
        if self.argument_types.is_empty() {
            Kind::Terminal
        } else {
            Kind::Function
        }
    }
}

/// A single canonicalized grammar entry: either a terminal or a function.
#[derive(Debug, Clone)]
pub struct Definition {
    name: String,
    definition_id: DefinitionId,
    node_value: NodeValue,
    weight: u32,
    kind: Kind,
    result_type: TypeId,
    argument_types: Vec<TypeId>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> DefinitionId {
        self.definition_id
    }

    pub fn node_value(&self) -> NodeValue {
        self.node_value
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn result_type(&self) -> TypeId {
        self.result_type
    }

    pub fn argument_types(&self) -> &[TypeId] {
        &self.argument_types
    }

    pub fn num_arguments(&self) -> usize {
        self.argument_types.len()
    }

    /// `true` iff `v` falls inside this definition's `[node_value, node_value + weight)` range.
    pub fn contains(&self, v: NodeValue) -> bool {
        v.0 >= self.node_value.0 && v.0 < self.node_value.0 + self.weight
    }
}

/// One entry in a [`TypeDefinitionSet`]'s constrained code space: a definition's range,
/// re-expressed starting from `0` within the set rather than within the whole grammar.
#[derive(Debug, Clone, Copy)]
struct RangeEntry {
    constrained_start: u32,
    definition_id: DefinitionId,
}

/// A view over the subset of a [`Grammar`]'s definitions whose `result_type` is a given type (or,
/// for [`INVALID_TYPE`], the whole grammar).
///
/// Exposes a second, densely-packed "constrained" code space scoped to just this subset, laid out
/// as `[terminals | functions]` exactly like the grammar's global code space.
#[derive(Debug, Clone)]
pub struct TypeDefinitionSet {
    terminal_ids: Vec<DefinitionId>,
    function_ids: Vec<DefinitionId>,
    /// Terminal entries' constrained ranges, in the same order as `terminal_ids`.
    terminal_ranges: Vec<RangeEntry>,
    /// Function entries' constrained ranges, in the same order as `function_ids`.
    function_ranges: Vec<RangeEntry>,
    type_constrained_terminal_limit: u32,
    type_constrained_function_limit: u32,
}

impl TypeDefinitionSet {
    fn build(definitions: &[Definition], ids: impl Iterator<Item = DefinitionId>) -> Self {
        let mut terminal_ids = Vec::new();
        let mut function_ids = Vec::new();
        for id in ids {
            match definitions[id.index()].kind {
                Kind::Terminal => terminal_ids.push(id),
                Kind::Function => function_ids.push(id),
            }
        }

        let mut cursor = 0u32;
        let terminal_ranges = terminal_ids
            .iter()
            .map(|&id| {
                let entry = RangeEntry {
                    constrained_start: cursor,
                    definition_id: id,
                };
                cursor += definitions[id.index()].weight;
                entry
            })
            .collect();
        let type_constrained_terminal_limit = cursor;

        cursor = 0;
        let function_ranges = function_ids
            .iter()
            .map(|&id| {
                let entry = RangeEntry {
                    constrained_start: cursor,
                    definition_id: id,
                };
                cursor += definitions[id.index()].weight;
                entry
            })
            .collect();
        let type_constrained_function_limit = cursor;

        Self {
            terminal_ids,
            function_ids,
            terminal_ranges,
            function_ranges,
            type_constrained_terminal_limit,
            type_constrained_function_limit,
        }
    }

    pub fn terminals(&self) -> &[DefinitionId] {
        &self.terminal_ids
    }

    pub fn functions(&self) -> &[DefinitionId] {
        &self.function_ids
    }

    pub fn has_terminals(&self) -> bool {
        !self.terminal_ids.is_empty()
    }

    pub fn has_functions(&self) -> bool {
        !self.function_ids.is_empty()
    }

    pub fn type_constrained_terminal_limit(&self) -> u32 {
        self.type_constrained_terminal_limit
    }

    pub fn type_constrained_function_limit(&self) -> u32 {
        self.type_constrained_function_limit
    }

    /// The exclusive upper bound of this set's constrained code space (terminals and functions).
    pub fn type_constrained_node_limit(&self) -> u32 {
        self.type_constrained_terminal_limit + self.type_constrained_function_limit
    }

    /// The constrained-coordinate range a uniform draw should cover to pick a function of this
    /// type (used by the Full strategy).
    pub fn function_range(&self) -> Range<u32> {
        self.type_constrained_terminal_limit..self.type_constrained_node_limit()
    }

    /// The constrained-coordinate range a uniform draw should cover to pick any node (terminal or
    /// function) of this type (used by the Grow strategy).
    pub fn full_range(&self) -> Range<u32> {
        0..self.type_constrained_node_limit()
    }

    /// Maps a value drawn from this set's constrained code space back to the global
    /// [`DefinitionId`] it names.
    pub fn resolve_constrained(&self, v: u32) -> DefinitionId {
        let (ranges, local) = if v < self.type_constrained_terminal_limit {
            (&self.terminal_ranges, v)
        } else {
            (&self.function_ranges, v - self.type_constrained_terminal_limit)
        };
        let idx = ranges.partition_point(|e| e.constrained_start <= local) - 1;
        ranges[idx].definition_id
    }
}

/// The typed grammar a population of genomes is drawn from and evaluated against.
///
/// Immutable after construction; safe to share by reference across multiple populations.
#[derive(Debug)]
pub struct Grammar {
    type_names: Vec<String>,
    definitions: Vec<Definition>,
    name_to_id: BiMap<String, DefinitionId>,
    type_sets: Vec<TypeDefinitionSet>,
    global_set: TypeDefinitionSet,
    terminal_limit: u32,
    function_limit: u32,
}

/// The ways grammar construction can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    DuplicateName(String),
    ZeroWeight(String),
    FunctionWithNoArguments(String),
    UnknownArgumentType { definition: String, type_name: String },
    UnknownResultType { definition: String, type_name: String },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::DuplicateName(name) => write!(f, "duplicate definition name {name:?}"),
            GrammarError::ZeroWeight(name) => {
                write!(f, "definition {name:?} has a weight of zero")
            }
            GrammarError::FunctionWithNoArguments(name) => write!(
                f,
                "function {name:?} has no arguments; use a terminal instead"
            ),
            GrammarError::UnknownArgumentType {
                definition,
                type_name,
            } => write!(
                f,
                "definition {definition:?} references unknown argument type {type_name:?}"
            ),
            GrammarError::UnknownResultType {
                definition,
                type_name,
            } => write!(
                f,
                "definition {definition:?} references unknown result type {type_name:?}"
            ),
        }
    }
}

impl std::error::Error for GrammarError {}

impl Grammar {
    /// Builds a [`Grammar`] from a list of type names (in registration order) and a list of
    /// definitions, reordering and code-assigning them as described in this module's docs.
    pub fn new(type_names: Vec<String>, specs: Vec<DefinitionSpec>) -> Result<Self, GrammarError> {
        let mut seen_names = std::collections::HashSet::new();
        for spec in &specs {
            if spec.weight == 0 {
                return Err(GrammarError::ZeroWeight(spec.name.clone()));
            }
            if matches!(spec.kind(), Kind::Function) && spec.argument_types.is_empty() {
                return Err(GrammarError::FunctionWithNoArguments(spec.name.clone()));
            }
            if !seen_names.insert(spec.name.clone()) {
                return Err(GrammarError::DuplicateName(spec.name.clone()));
            }
            if spec.result_type.index() >= type_names.len() {
                return Err(GrammarError::UnknownResultType {
                    definition: spec.name.clone(),
                    type_name: format!("<type #{}>", spec.result_type.index()),
                });
            }
            for arg in &spec.argument_types {
                if arg.index() >= type_names.len() {
                    return Err(GrammarError::UnknownArgumentType {
                        definition: spec.name.clone(),
                        type_name: format!("<type #{}>", arg.index()),
                    });
                }
            }
        }

        // Canonical order: for each type (in registration order), all its terminals; then for
        // each type (in registration order), all its functions. Within a bucket, registration
        // order is preserved because we scan `specs` once per type.
        let canonical: Vec<&DefinitionSpec> = (0..type_names.len())
            .flat_map(|t| {
                specs
                    .iter()
                    .filter(move |s| s.kind() == Kind::Terminal && s.result_type.index() == t)
            })
            .chain((0..type_names.len()).flat_map(|t| {
                specs
                    .iter()
                    .filter(move |s| s.kind() == Kind::Function && s.result_type.index() == t)
            }))
            .collect_vec();

        let mut definitions = Vec::with_capacity(canonical.len());
        let mut node_value = 0u32;
        for (i, spec) in canonical.into_iter().enumerate() {
            definitions.push(Definition {
                name: spec.name.clone(),
                definition_id: DefinitionId::new(i),
                node_value: NodeValue(node_value),
                weight: spec.weight,
                kind: spec.kind(),
                result_type: spec.result_type,
                argument_types: spec.argument_types.clone(),
            });
            node_value += spec.weight;
        }

        let terminal_limit = definitions
            .iter()
            .filter(|d| d.kind == Kind::Terminal)
            .map(|d| d.weight)
            .sum();
        let function_limit = definitions
            .iter()
            .filter(|d| d.kind == Kind::Function)
            .map(|d| d.weight)
            .sum();

        let mut name_to_id = BiMap::with_capacity(definitions.len());
        for d in &definitions {
            // Uniqueness was already checked above, so this can't collide.
            name_to_id.insert(d.name.clone(), d.definition_id);
        }

        let type_sets = (0..type_names.len())
            .map(|t| {
                let ids = definitions
                    .iter()
                    .filter(|d| d.result_type.index() == t)
                    .map(|d| d.definition_id);
                TypeDefinitionSet::build(&definitions, ids)
            })
            .collect();
        let global_set =
            TypeDefinitionSet::build(&definitions, (0..definitions.len()).map(DefinitionId::new));

        log::debug!(
            "built grammar with {} types, {} definitions ({} node codes)",
            type_names.len(),
            definitions.len(),
            terminal_limit + function_limit,
        );

        Ok(Self {
            type_names,
            definitions,
            name_to_id,
            type_sets,
            global_set,
            terminal_limit,
            function_limit,
        })
    }

    pub fn num_types(&self) -> usize {
        self.type_names.len()
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self.type_names[id.index()]
    }

    pub fn num_definitions(&self) -> usize {
        self.definitions.len()
    }

    pub fn definition(&self, id: DefinitionId) -> &Definition {
        &self.definitions[id.index()]
    }

    pub fn definition_id_by_name(&self, name: &str) -> Option<DefinitionId> {
        self.name_to_id.get_by_left(name).copied()
    }

    pub fn terminal_limit(&self) -> u32 {
        self.terminal_limit
    }

    pub fn function_limit(&self) -> u32 {
        self.function_limit
    }

    pub fn node_limit(&self) -> u32 {
        self.terminal_limit + self.function_limit
    }

    /// Finds the definition whose `[node_value, node_value + weight)` range contains `v`, via
    /// binary search over the (strictly increasing, by construction) `node_value` array.
    pub fn definition_id_for_node_value(&self, v: NodeValue) -> DefinitionId {
        let idx = self.definitions.partition_point(|d| d.node_value.0 <= v.0) - 1;
        DefinitionId::new(idx)
    }

    pub fn definition_for_node_value(&self, v: NodeValue) -> &Definition {
        self.definition(self.definition_id_for_node_value(v))
    }

    /// Returns the set of definitions usable where a node of type `type_id` is required, or the
    /// whole grammar's definitions if `type_id` is [`INVALID_TYPE`].
    pub fn definition_set_for_type(&self, type_id: TypeId) -> &TypeDefinitionSet {
        if type_id == INVALID_TYPE {
            &self.global_set
        } else {
            &self.type_sets[type_id.index()]
        }
    }

    pub fn terminals_for_type(&self, type_id: TypeId) -> &[DefinitionId] {
        self.definition_set_for_type(type_id).terminals()
    }

    pub fn functions_for_type(&self, type_id: TypeId) -> &[DefinitionId] {
        self.definition_set_for_type(type_id).functions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(i: usize) -> TypeId {
        TypeId::new(i)
    }

    #[test]
    fn simple_grammar_codes() {
        // Single type "int": terminal(x,10), terminal(y,10), binary(+,5), binary(*,11), unary(sin,3)
        let grammar = Grammar::new(
            vec!["int".to_owned()],
            vec![
                DefinitionSpec::terminal("x", ty(0), 10),
                DefinitionSpec::terminal("y", ty(0), 10),
                DefinitionSpec::binary("+", ty(0), [ty(0), ty(0)], 5),
                DefinitionSpec::binary("*", ty(0), [ty(0), ty(0)], 11),
                DefinitionSpec::unary("sin", ty(0), ty(0), 3),
            ],
        )
        .unwrap();

        let nv = |name: &str| {
            grammar
                .definition(grammar.definition_id_by_name(name).unwrap())
                .node_value()
                .raw()
        };
        assert_eq!(nv("x"), 0);
        assert_eq!(nv("y"), 10);
        assert_eq!(nv("+"), 20);
        assert_eq!(nv("*"), 25);
        assert_eq!(nv("sin"), 36);

        assert_eq!(grammar.terminal_limit(), 20);
        assert_eq!(grammar.function_limit(), 19);
        assert_eq!(grammar.node_limit(), 39);
    }

    #[test]
    fn node_value_resolution_covers_whole_range() {
        let grammar = Grammar::new(
            vec!["int".to_owned()],
            vec![
                DefinitionSpec::terminal("x", ty(0), 10),
                DefinitionSpec::binary("+", ty(0), [ty(0), ty(0)], 5),
            ],
        )
        .unwrap();

        for v in 0..10 {
            let d = grammar.definition_for_node_value(NodeValue::from_raw(v));
            assert_eq!(d.name(), "x");
        }
        for v in 10..15 {
            let d = grammar.definition_for_node_value(NodeValue::from_raw(v));
            assert_eq!(d.name(), "+");
        }
    }

    #[test]
    fn typed_grammar_partition() {
        let float = ty(0);
        let float3 = ty(1);
        let grammar = Grammar::new(
            vec!["float".to_owned(), "float3".to_owned()],
            vec![
                DefinitionSpec::terminal("x", float, 10),
                DefinitionSpec::terminal("y", float, 10),
                DefinitionSpec::terminal("randomColor", float3, 5),
                DefinitionSpec::terminal("orange", float3, 1),
                DefinitionSpec::binary("+", float, [float, float], 10),
                DefinitionSpec::binary("*", float, [float, float], 10),
                DefinitionSpec::unary("sin", float, float, 5),
                DefinitionSpec::unary("cos", float, float, 5),
                DefinitionSpec::ternary("rgb", float3, [float, float, float], 10),
                DefinitionSpec::unary("darker", float3, float3, 10),
                DefinitionSpec::unary("lighter", float3, float3, 10),
                DefinitionSpec::unary("grayscale", float3, float3, 8),
            ],
        )
        .unwrap();

        let names: Vec<&str> = (0..grammar.num_definitions())
            .map(|i| grammar.definition(DefinitionId::new(i)).name())
            .collect();
        assert_eq!(
            names,
            vec![
                "x",
                "y",
                "randomColor",
                "orange",
                "+",
                "*",
                "sin",
                "cos",
                "rgb",
                "darker",
                "lighter",
                "grayscale",
            ]
        );
        assert_eq!(grammar.terminal_limit(), 26);
        assert_eq!(grammar.function_limit(), 68);
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = Grammar::new(
            vec!["int".to_owned()],
            vec![
                DefinitionSpec::terminal("x", ty(0), 1),
                DefinitionSpec::terminal("x", ty(0), 1),
            ],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::DuplicateName("x".to_owned()));
    }

    #[test]
    fn zero_weight_rejected() {
        let err = Grammar::new(
            vec!["int".to_owned()],
            vec![DefinitionSpec::terminal("x", ty(0), 0)],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::ZeroWeight("x".to_owned()));
    }

    #[test]
    fn function_with_no_arguments_rejected() {
        let err = Grammar::new(
            vec!["int".to_owned()],
            vec![DefinitionSpec::function("f", ty(0), vec![], 1)],
        )
        .unwrap_err();
        assert_eq!(err, GrammarError::FunctionWithNoArguments("f".to_owned()));
    }

    #[test]
    fn type_definition_set_resolve_covers_whole_range() {
        let grammar = Grammar::new(
            vec!["int".to_owned()],
            vec![
                DefinitionSpec::terminal("x", ty(0), 10),
                DefinitionSpec::terminal("y", ty(0), 7),
                DefinitionSpec::binary("+", ty(0), [ty(0), ty(0)], 5),
            ],
        )
        .unwrap();
        let set = grammar.definition_set_for_type(ty(0));
        assert_eq!(set.type_constrained_terminal_limit(), 17);
        assert_eq!(set.type_constrained_function_limit(), 5);
        for v in 0..set.type_constrained_node_limit() {
            // must resolve without panicking, and terminals/functions must not cross over
            let id = set.resolve_constrained(v);
            let def = grammar.definition(id);
            if v < 17 {
                assert_eq!(def.kind(), Kind::Terminal);
            } else {
                assert_eq!(def.kind(), Kind::Function);
            }
        }
        assert_eq!(set.function_range(), 17..22);
        assert_eq!(set.full_range(), 0..22);
    }
}
