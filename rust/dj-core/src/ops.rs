//! Operation classification, the built-in signature table, and the
//! interface external leaf operations plug into.

use crate::config::ConfigTable;
use crate::literal::Literal;
use crate::values::Applied;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Every operation is classified once; the class decides its return
/// contract and which modifiers are legal on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpClass {
    /// Produces 0..n derived entries; N/A iff the output would equal the
    /// input verbatim.
    Transformer,
    /// Produces its matches; N/A when nothing matched.
    Extractor,
    /// Passes the unmodified input or rejects with N/A.
    Filter,
    /// Composes sub-chains and folds their ilists per its own contract.
    Meta,
    /// Side-effecting pass-through (`report`, `write`, `classify`, `result`).
    Emitter,
}

impl OpClass {
    pub fn describe(self) -> &'static str {
        match self {
            OpClass::Transformer => "transformer",
            OpClass::Extractor => "extractor",
            OpClass::Filter => "filter",
            OpClass::Meta => "meta-operation",
            OpClass::Emitter => "emitter",
        }
    }
}

/// Static description of one built-in leaf operation.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub name: &'static str,
    pub class: OpClass,
    /// Minimum and maximum number of literal arguments.
    pub arity: (u8, u8),
    /// Parameter names accepted from `config` directives.
    pub params: &'static [&'static str],
    /// Human-readable argument shape, used in error messages.
    pub usage: &'static str,
}

const SIGNATURES: &[Signature] = &[
    // Transformers
    sig("lower", OpClass::Transformer, (0, 0), &[], "lower"),
    sig("upper", OpClass::Transformer, (0, 0), &[], "upper"),
    sig("capitalize", OpClass::Transformer, (0, 0), &[], "capitalize"),
    sig("title", OpClass::Transformer, (0, 0), &[], "title"),
    sig("reverse", OpClass::Transformer, (0, 0), &[], "reverse"),
    sig("remove", OpClass::Transformer, (1, 1), &[], "remove \"chars\""),
    sig("remove_ws", OpClass::Transformer, (0, 0), &[], "remove_ws"),
    sig("fold_ws", OpClass::Transformer, (0, 0), &[], "fold_ws"),
    sig("strip", OpClass::Transformer, (0, 1), &[], "strip [\"chars\"]"),
    sig("split", OpClass::Transformer, (1, 1), &[], "split \"sep\""),
    sig(
        "map",
        OpClass::Transformer,
        (2, 2),
        &[],
        "map \"chars\" \"targets\"",
    ),
    sig(
        "replace",
        OpClass::Transformer,
        (1, 1),
        &[],
        "replace \"table-file\"",
    ),
    sig(
        "append",
        OpClass::Transformer,
        (1, 2),
        &[],
        "append [each] \"suffix\"",
    ),
    sig(
        "prepend",
        OpClass::Transformer,
        (1, 2),
        &[],
        "prepend [each] \"prefix\"",
    ),
    sig("deduplicate", OpClass::Transformer, (0, 0), &[], "deduplicate"),
    sig("rotate", OpClass::Transformer, (0, 0), &[], "rotate"),
    // Extractors
    sig(
        "find_all",
        OpClass::Extractor,
        (1, 1),
        &[],
        "find_all \"regex\"",
    ),
    sig("get_no", OpClass::Extractor, (0, 0), &[], "get_no"),
    sig("get_sc", OpClass::Extractor, (0, 0), &[], "get_sc"),
    sig("segments", OpClass::Extractor, (0, 0), &[], "segments"),
    // Filters
    sig("min", OpClass::Filter, (2, 2), &[], "min <metric> N"),
    sig("max", OpClass::Filter, (2, 2), &[], "max <metric> N"),
    sig("has", OpClass::Filter, (1, 1), &[], "has \"chars\""),
    sig("matches", OpClass::Filter, (1, 1), &[], "matches \"regex\""),
    sig("is_lower", OpClass::Filter, (0, 0), &[], "is_lower"),
    sig("is_upper", OpClass::Filter, (0, 0), &[], "is_upper"),
    sig("is_no", OpClass::Filter, (0, 0), &[], "is_no"),
    sig("is_sc", OpClass::Filter, (0, 0), &[], "is_sc"),
    sig(
        "is_pattern",
        OpClass::Filter,
        (0, 1),
        &[],
        "is_pattern [\"classes\"]",
    ),
    // Whole-ilist meta leaves
    sig(
        "ilist_concat",
        OpClass::Meta,
        (0, 1),
        &[],
        "ilist_concat [\"sep\"]",
    ),
    sig("ilist_unique", OpClass::Meta, (0, 0), &[], "ilist_unique"),
    sig(
        "ilist_max",
        OpClass::Meta,
        (2, 3),
        &[],
        "ilist_max length [<] N",
    ),
    // Emitters
    sig("report", OpClass::Emitter, (0, 0), &[], "report"),
    sig("write", OpClass::Emitter, (1, 1), &[], "write \"path\""),
    sig("classify", OpClass::Emitter, (1, 1), &[], "classify \"tag\""),
    sig("result", OpClass::Emitter, (0, 0), &[], "result"),
];

const fn sig(
    name: &'static str,
    class: OpClass,
    arity: (u8, u8),
    params: &'static [&'static str],
    usage: &'static str,
) -> Signature {
    Signature {
        name,
        class,
        arity,
        params,
        usage,
    }
}

static BY_NAME: Lazy<HashMap<&'static str, &'static Signature>> =
    Lazy::new(|| SIGNATURES.iter().map(|s| (s.name, s)).collect());

/// Look up a built-in operation by name.
pub fn builtin(name: &str) -> Option<&'static Signature> {
    BY_NAME.get(name).copied()
}

/// The contract every external leaf operation implements: one input
/// string, the literal arguments bound at parse time, and this
/// operation's slice of the configuration table, producing `Applied`.
pub trait LeafOp: Send + Sync {
    fn class(&self) -> OpClass;

    /// Parameter names this operation accepts via `config`.
    fn params(&self) -> &[&'static str] {
        &[]
    }

    /// Minimum and maximum literal argument count.
    fn arity(&self) -> (u8, u8) {
        (0, 0)
    }

    fn apply(&self, entry: &str, args: &[Literal], config: &ConfigTable) -> Applied;
}

/// Runtime registry of external leaf operations, keyed by operation name.
/// `related`, `is_regular_word`, `is_popular_word`, `mangle_dates`,
/// `correct_spelling`, and `deleetify` are conventionally provided this way.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    ops: HashMap<String, Arc<dyn LeafOp>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, op: Arc<dyn LeafOp>) {
        self.ops.insert(name.to_string(), op);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn LeafOp>> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("ops", &self.ops.keys().collect::<Vec<_>>())
            .finish()
    }
}
