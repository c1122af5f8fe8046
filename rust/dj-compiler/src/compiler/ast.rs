use crate::compiler::tokens::Span;
use dj_core::literal::Literal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A complete DJ script: directives followed by chain statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub directives: Vec<Directive>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// Header directives, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Directive {
    /// `ignore "path"`: entries listed in the file never reach a chain
    Ignore { path: String, span: Span },
    /// `create "path"`: truncate the file at script start
    Create { path: String, span: Span },
    /// `list NAME`: per-entry ordered list, duplicates retained
    DeclareList { name: String, span: Span },
    /// `set NAME`: per-entry list, duplicates collapsed on insert
    DeclareSet { name: String, span: Span },
    /// `global_list NAME "path" ( ops )?`
    GlobalList {
        name: String,
        path: String,
        filter: Option<Chain>,
        span: Span,
    },
    /// `global_set NAME "path" ( ops )?`
    GlobalSet {
        name: String,
        path: String,
        filter: Option<Chain>,
        span: Span,
    },
    /// `config op_name PARAM literal`
    Config {
        op: String,
        param: String,
        value: Literal,
        span: Span,
    },
    /// `def NAME ops`: a named macro
    Def { name: String, body: Chain, span: Span },
}

/// One body statement: an optional `use NAME+` prefix and a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Named lists whose concatenation seeds the chain; empty for plain
    /// statements fed by the input entry.
    pub uses: Vec<String>,
    pub chain: Chain,
    pub span: Span,
}

/// An ordered chain of operations (a `ComplexOperation`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub ops: Vec<Op>,
}

impl Chain {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }
}

/// The four modifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    /// `+` keeps the originals alongside the produced entries
    KeepOriginal,
    /// `*` replaces the original with the produced entries; the original
    /// survives only on N/A
    ReplaceOnApply,
    /// `!` negates a filter
    Negate,
    /// `~` passes the input through on N/A or empty
    PassThrough,
}

impl Modifier {
    pub fn symbol(self) -> char {
        match self {
            Modifier::KeepOriginal => '+',
            Modifier::ReplaceOnApply => '*',
            Modifier::Negate => '!',
            Modifier::PassThrough => '~',
        }
    }
}

/// One operation in a chain, with its optional modifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Op {
    pub modifier: Option<Modifier>,
    pub kind: OpKind,
    pub span: Span,
}

/// Sinks terminating a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinkMode {
    /// `> L`: append the produced ilist
    Append,
    /// `[]> L`: append the original input entry when the block survived
    OriginalOnly,
    /// `/> L`: append the produced ilist and keep flowing downstream
    Tee,
    /// `/[]> L`: append the original and keep flowing downstream
    OriginalTee,
}

impl SinkMode {
    /// Whether the produced ilist continues to the next operation.
    pub fn flows_downstream(self) -> bool {
        matches!(self, SinkMode::Tee | SinkMode::OriginalTee)
    }

    /// Whether the sink stores the block's input entry rather than its output.
    pub fn stores_original(self) -> bool {
        matches!(self, SinkMode::OriginalOnly | SinkMode::OriginalTee)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sink {
    pub mode: SinkMode,
    pub target: String,
    pub span: Span,
}

/// The operation variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OpKind {
    /// A leaf operation: built-in or plugin. `config` holds the global
    /// configuration entries bound to this instance by the resolver.
    Leaf {
        name: String,
        args: Vec<Literal>,
        config: BTreeMap<String, Literal>,
    },
    /// `{ ops }` with an optional sink.
    Block { body: Chain, sink: Option<Sink> },
    /// `or(chain, chain, ...)`: the first productive branch wins.
    Or { branches: Vec<Chain> },
    /// `ilist_if_all( clauses?, ops )`
    IlistIfAll {
        chain: Chain,
        na_passes: bool,
        empty_passes: bool,
    },
    /// `ilist_if_any( clauses?, ops )`
    IlistIfAny {
        chain: Chain,
        na_passes: bool,
        empty_passes: bool,
    },
    /// `ilist_foreach( ops )`
    IlistForeach { chain: Chain },
    /// `ilist_ratio joined? < r ( A, B )`
    IlistRatio {
        joined: bool,
        bound: f64,
        numerator: Chain,
        denominator: Chain,
    },
    /// `restart N? ( gate, body )`
    Restart {
        bound: usize,
        gate: Chain,
        body: Chain,
    },
    /// `do NAME`, erased by the resolver.
    MacroCall { name: String },
}

impl OpKind {
    pub fn describe(&self) -> String {
        match self {
            OpKind::Leaf { name, .. } => name.clone(),
            OpKind::Block { .. } => "block".to_string(),
            OpKind::Or { .. } => "or".to_string(),
            OpKind::IlistIfAll { .. } => "ilist_if_all".to_string(),
            OpKind::IlistIfAny { .. } => "ilist_if_any".to_string(),
            OpKind::IlistForeach { .. } => "ilist_foreach".to_string(),
            OpKind::IlistRatio { .. } => "ilist_ratio".to_string(),
            OpKind::Restart { .. } => "restart".to_string(),
            OpKind::MacroCall { name } => format!("do {}", name),
        }
    }
}
