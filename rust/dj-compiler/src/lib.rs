//! DJ Compiler
//!
//! Lexer, parser, AST, and resolver for the DJ operations language.

pub mod compiler {
    pub mod ast;
    pub mod lexer;
    pub mod parser;
    pub mod resolve;
    pub mod tokens;
}

pub mod diagnostics;

use compiler::lexer::{LexError, Lexer};
use compiler::parser::{ParseError, Parser};
use compiler::resolve::{resolve, Resolved, ResolveError};
use dj_core::ops::PluginRegistry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Runs the full front end: tokenize, parse, resolve.
pub fn compile_source(source: &str, plugins: &PluginRegistry) -> Result<Resolved, CompileError> {
    let tokens = Lexer::new(source).tokenize()?;
    let script = Parser::new(tokens).parse_script()?;
    Ok(resolve(script, plugins)?)
}
