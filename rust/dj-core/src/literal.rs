//! Literal argument values bound into operation instances at parse time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal script value: a string, a number, a bare word such as
/// `length` or `each`, or a bracketed list of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Word(String),
    List(Vec<String>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Literal::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_word(&self) -> Option<&str> {
        match self {
            Literal::Word(w) => Some(w),
            _ => None,
        }
    }

    /// Short shape name used in argument-mismatch messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Int(_) => "integer",
            Literal::Float(_) => "number",
            Literal::Word(_) => "word",
            Literal::List(_) => "list",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "\"{}\"", s),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Word(w) => write!(f, "{}", w),
            Literal::List(items) => {
                write!(f, "[ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\"", item)?;
                }
                write!(f, " ]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Literal::Str("a".into()).to_string(), "\"a\"");
        assert_eq!(Literal::Int(3).to_string(), "3");
        assert_eq!(
            Literal::List(vec!["en".into(), "de".into()]).to_string(),
            "[ \"en\", \"de\" ]"
        );
    }
}
