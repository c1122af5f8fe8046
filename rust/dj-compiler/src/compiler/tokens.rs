use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location in the script file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the start in the source
    pub start: usize,
    /// Byte offset of the end (exclusive) in the source
    pub end: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, col: usize) -> Self {
        Self {
            start,
            end,
            line,
            col,
        }
    }

    pub fn dummy() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 0,
            col: 0,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line.min(other.line),
            col: if self.line <= other.line {
                self.col
            } else {
                other.col
            },
        }
    }
}

/// Token types for the DJ operations language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    StringLit(String),
    IntLit(i64),
    FloatLit(f64),

    /// Lowercase operation name or bare word: `[a-z_][a-z0-9_]*`
    Name(String),
    /// Uppercase list/macro name: `[A-Z][A-Z0-9_]*`
    UpperName(String),

    // Directive and structural keywords
    Ignore,
    Create,
    List,
    Set,
    GlobalList,
    GlobalSet,
    Config,
    Def,
    Use,
    Do,
    Or,
    Restart,
    IlistIfAll,
    IlistIfAny,
    IlistForeach,
    IlistRatio,

    /// The `N/A` sentinel in quantifier clauses
    NaLit,
    True,
    False,

    // Modifiers
    Plus,  // +
    Star,  // *
    Bang,  // !
    Tilde, // ~

    // Sinks
    SinkAppend,      // >
    SinkOriginal,    // []>
    SinkTee,         // />
    SinkOriginalTee, // /[]>

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Lt,     // <
    Assign, // =

    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::StringLit(s) => write!(f, "\"{}\"", s),
            TokenKind::IntLit(n) => write!(f, "{}", n),
            TokenKind::FloatLit(x) => write!(f, "{}", x),
            TokenKind::Name(s) => write!(f, "{}", s),
            TokenKind::UpperName(s) => write!(f, "{}", s),
            TokenKind::Ignore => write!(f, "ignore"),
            TokenKind::Create => write!(f, "create"),
            TokenKind::List => write!(f, "list"),
            TokenKind::Set => write!(f, "set"),
            TokenKind::GlobalList => write!(f, "global_list"),
            TokenKind::GlobalSet => write!(f, "global_set"),
            TokenKind::Config => write!(f, "config"),
            TokenKind::Def => write!(f, "def"),
            TokenKind::Use => write!(f, "use"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::Restart => write!(f, "restart"),
            TokenKind::IlistIfAll => write!(f, "ilist_if_all"),
            TokenKind::IlistIfAny => write!(f, "ilist_if_any"),
            TokenKind::IlistForeach => write!(f, "ilist_foreach"),
            TokenKind::IlistRatio => write!(f, "ilist_ratio"),
            TokenKind::NaLit => write!(f, "N/A"),
            TokenKind::True => write!(f, "True"),
            TokenKind::False => write!(f, "False"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::SinkAppend => write!(f, ">"),
            TokenKind::SinkOriginal => write!(f, "[]>"),
            TokenKind::SinkTee => write!(f, "/>"),
            TokenKind::SinkOriginalTee => write!(f, "/[]>"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Assign => write!(f, "="),
            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::Eof => write!(f, "EOF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}
