//! Recursive descent parser for the DJ operations language.

use crate::compiler::ast::*;
use crate::compiler::tokens::{Span, Token, TokenKind};
use dj_core::literal::Literal;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error("unexpected token {found} at line {line}, col {col}; expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        line: usize,
        col: usize,
    },
    #[error("unexpected end of input; expected {expected}")]
    UnexpectedEof { expected: String },
}

impl ParseError {
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::Unexpected { line, col, .. } => Some((*line, *col)),
            ParseError::UnexpectedEof { .. } => None,
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.peek();
        if matches!(tok.kind, TokenKind::Eof) {
            ParseError::UnexpectedEof {
                expected: expected.to_string(),
            }
        } else {
            ParseError::Unexpected {
                found: tok.kind.to_string(),
                expected: expected.to_string(),
                line: tok.span.line,
                col: tok.span.col,
            }
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_string(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::StringLit(s) => {
                let tok = self.advance();
                Ok((s, tok.span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn expect_upper(&mut self, expected: &str) -> Result<(String, Span), ParseError> {
        match self.peek_kind().clone() {
            TokenKind::UpperName(s) => {
                let tok = self.advance();
                Ok((s, tok.span))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline) {
            self.advance();
        }
    }

    // ── Entry point ──

    pub fn parse_script(&mut self) -> Result<Script, ParseError> {
        let start = self.peek().span;
        let mut directives = Vec::new();
        self.skip_newlines();
        while self.is_directive_start() {
            directives.push(self.parse_directive()?);
            self.end_of_line()?;
            self.skip_newlines();
        }
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        let end = self.peek().span;
        Ok(Script {
            directives,
            body,
            span: start.merge(end),
        })
    }

    fn end_of_line(&mut self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn is_directive_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Ignore
                | TokenKind::Create
                | TokenKind::List
                | TokenKind::Set
                | TokenKind::GlobalList
                | TokenKind::GlobalSet
                | TokenKind::Config
                | TokenKind::Def
        )
    }

    // ── Directives ──

    fn parse_directive(&mut self) -> Result<Directive, ParseError> {
        let start = self.peek().span;
        match self.peek_kind().clone() {
            TokenKind::Ignore => {
                self.advance();
                let (path, span) = self.expect_string("a quoted file path after 'ignore'")?;
                Ok(Directive::Ignore {
                    path,
                    span: start.merge(span),
                })
            }
            TokenKind::Create => {
                self.advance();
                let (path, span) = self.expect_string("a quoted file path after 'create'")?;
                Ok(Directive::Create {
                    path,
                    span: start.merge(span),
                })
            }
            TokenKind::List => {
                self.advance();
                let (name, span) = self.expect_upper("an uppercase list name after 'list'")?;
                Ok(Directive::DeclareList {
                    name,
                    span: start.merge(span),
                })
            }
            TokenKind::Set => {
                self.advance();
                let (name, span) = self.expect_upper("an uppercase set name after 'set'")?;
                Ok(Directive::DeclareSet {
                    name,
                    span: start.merge(span),
                })
            }
            TokenKind::GlobalList | TokenKind::GlobalSet => {
                let is_set = matches!(self.peek_kind(), TokenKind::GlobalSet);
                self.advance();
                let (name, _) = self.expect_upper("an uppercase name")?;
                let (path, mut span) = self.expect_string("a quoted file path")?;
                let filter = if matches!(self.peek_kind(), TokenKind::LParen) {
                    self.advance();
                    let chain = self.parse_chain(true)?;
                    let close = self.expect(&TokenKind::RParen, "')'")?;
                    span = close.span;
                    Some(chain)
                } else {
                    None
                };
                let span = start.merge(span);
                Ok(if is_set {
                    Directive::GlobalSet {
                        name,
                        path,
                        filter,
                        span,
                    }
                } else {
                    Directive::GlobalList {
                        name,
                        path,
                        filter,
                        span,
                    }
                })
            }
            TokenKind::Config => {
                self.advance();
                let op = match self.peek_kind().clone() {
                    TokenKind::Name(n) => {
                        self.advance();
                        n
                    }
                    _ => return Err(self.unexpected("an operation name after 'config'")),
                };
                let param = match self.peek_kind().clone() {
                    TokenKind::UpperName(p) => {
                        self.advance();
                        p
                    }
                    TokenKind::Name(p) => {
                        self.advance();
                        p
                    }
                    _ => return Err(self.unexpected("a parameter name")),
                };
                let value = self.parse_literal("a literal configuration value")?;
                let span = start.merge(self.tokens[self.pos - 1].span);
                Ok(Directive::Config {
                    op,
                    param,
                    value,
                    span,
                })
            }
            TokenKind::Def => {
                self.advance();
                let (name, _) = self.expect_upper("an uppercase macro name after 'def'")?;
                let body = self.parse_chain(false)?;
                let span = start.merge(self.tokens[self.pos - 1].span);
                Ok(Directive::Def { name, body, span })
            }
            _ => Err(self.unexpected("a directive")),
        }
    }

    // ── Statements and chains ──

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let start = self.peek().span;
        let mut uses = Vec::new();
        if matches!(self.peek_kind(), TokenKind::Use) {
            self.advance();
            while let TokenKind::UpperName(name) = self.peek_kind().clone() {
                uses.push(name);
                self.advance();
            }
            if uses.is_empty() {
                return Err(self.unexpected("at least one list name after 'use'"));
            }
        }
        let chain = self.parse_chain(false)?;
        self.end_of_line()?;
        let span = start.merge(self.tokens[self.pos - 1].span);
        Ok(Statement { uses, chain, span })
    }

    /// Parses a sequence of operations. Inside a parenthesized or braced
    /// group newlines are insignificant; at statement level they terminate
    /// the chain.
    fn parse_chain(&mut self, in_group: bool) -> Result<Chain, ParseError> {
        let mut ops = Vec::new();
        loop {
            if in_group {
                self.skip_newlines();
            }
            if !self.op_can_start() {
                break;
            }
            ops.push(self.parse_operation()?);
        }
        if ops.is_empty() {
            return Err(self.unexpected("an operation"));
        }
        Ok(Chain::new(ops))
    }

    fn op_can_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Plus
                | TokenKind::Star
                | TokenKind::Bang
                | TokenKind::Tilde
                | TokenKind::Name(_)
                | TokenKind::LBrace
                | TokenKind::Or
                | TokenKind::Restart
                | TokenKind::Do
                | TokenKind::IlistIfAll
                | TokenKind::IlistIfAny
                | TokenKind::IlistForeach
                | TokenKind::IlistRatio
        )
    }

    fn parse_operation(&mut self) -> Result<Op, ParseError> {
        let start = self.peek().span;
        let modifier = match self.peek_kind() {
            TokenKind::Plus => {
                self.advance();
                Some(Modifier::KeepOriginal)
            }
            TokenKind::Star => {
                self.advance();
                Some(Modifier::ReplaceOnApply)
            }
            TokenKind::Bang => {
                self.advance();
                Some(Modifier::Negate)
            }
            TokenKind::Tilde => {
                self.advance();
                Some(Modifier::PassThrough)
            }
            _ => None,
        };
        let kind = match self.peek_kind().clone() {
            TokenKind::Name(name) => {
                self.advance();
                self.parse_leaf(name)?
            }
            TokenKind::LBrace => self.parse_block()?,
            TokenKind::Or => self.parse_or()?,
            TokenKind::Restart => self.parse_restart()?,
            TokenKind::Do => {
                self.advance();
                let (name, _) = self.expect_upper("a macro name after 'do'")?;
                OpKind::MacroCall { name }
            }
            TokenKind::IlistIfAll => {
                self.advance();
                let (chain, na, empty) = self.parse_quantifier_body()?;
                OpKind::IlistIfAll {
                    chain,
                    na_passes: na,
                    empty_passes: empty,
                }
            }
            TokenKind::IlistIfAny => {
                self.advance();
                let (chain, na, empty) = self.parse_quantifier_body()?;
                OpKind::IlistIfAny {
                    chain,
                    na_passes: na,
                    empty_passes: empty,
                }
            }
            TokenKind::IlistForeach => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after 'ilist_foreach'")?;
                let chain = self.parse_chain(true)?;
                self.expect(&TokenKind::RParen, "')'")?;
                OpKind::IlistForeach { chain }
            }
            TokenKind::IlistRatio => {
                self.advance();
                self.parse_ratio()?
            }
            _ => return Err(self.unexpected("an operation")),
        };
        let span = start.merge(self.tokens[self.pos - 1].span);
        Ok(Op {
            modifier,
            kind,
            span,
        })
    }

    /// Leaf arguments. Most leaves take plain literals; a few take bare
    /// words (`min length 3`, `append each "s"`, `ilist_max length < 10`).
    fn parse_leaf(&mut self, name: String) -> Result<OpKind, ParseError> {
        let mut args = Vec::new();
        match name.as_str() {
            "min" | "max" => {
                match self.peek_kind().clone() {
                    TokenKind::Name(w) => {
                        self.advance();
                        args.push(Literal::Word(w));
                    }
                    _ => return Err(self.unexpected("a metric word (e.g. 'length')")),
                }
                match self.peek_kind().clone() {
                    TokenKind::IntLit(n) => {
                        self.advance();
                        args.push(Literal::Int(n));
                    }
                    _ => return Err(self.unexpected("an integer bound")),
                }
            }
            "ilist_max" => {
                match self.peek_kind().clone() {
                    TokenKind::Name(w) => {
                        self.advance();
                        args.push(Literal::Word(w));
                    }
                    _ => return Err(self.unexpected("'length'")),
                }
                if matches!(self.peek_kind(), TokenKind::Lt) {
                    self.advance();
                    args.push(Literal::Word("<".to_string()));
                }
                match self.peek_kind().clone() {
                    TokenKind::IntLit(n) => {
                        self.advance();
                        args.push(Literal::Int(n));
                    }
                    _ => return Err(self.unexpected("an integer bound")),
                }
            }
            "append" | "prepend" => {
                if matches!(self.peek_kind(), TokenKind::Name(w) if w == "each") {
                    self.advance();
                    args.push(Literal::Word("each".to_string()));
                }
                let (s, _) = self.expect_string("a quoted string")?;
                args.push(Literal::Str(s));
            }
            _ => {
                while let Some(lit) = self.try_parse_literal()? {
                    args.push(lit);
                }
            }
        }
        Ok(OpKind::Leaf {
            name,
            args,
            config: BTreeMap::new(),
        })
    }

    fn try_parse_literal(&mut self) -> Result<Option<Literal>, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::StringLit(s) => {
                self.advance();
                Ok(Some(Literal::Str(s)))
            }
            TokenKind::IntLit(n) => {
                self.advance();
                Ok(Some(Literal::Int(n)))
            }
            TokenKind::FloatLit(x) => {
                self.advance();
                Ok(Some(Literal::Float(x)))
            }
            TokenKind::LBracket => {
                self.advance();
                Ok(Some(self.finish_list_literal()?))
            }
            _ => Ok(None),
        }
    }

    fn parse_literal(&mut self, expected: &str) -> Result<Literal, ParseError> {
        match self.try_parse_literal()? {
            Some(lit) => Ok(lit),
            None => Err(self.unexpected(expected)),
        }
    }

    /// The opening bracket has been consumed.
    fn finish_list_literal(&mut self) -> Result<Literal, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek_kind().clone() {
                TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                TokenKind::StringLit(s) => {
                    self.advance();
                    items.push(s);
                    if matches!(self.peek_kind(), TokenKind::Comma) {
                        self.advance();
                    }
                }
                _ => return Err(self.unexpected("a quoted string or ']'")),
            }
        }
        Ok(Literal::List(items))
    }

    fn parse_block(&mut self) -> Result<OpKind, ParseError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let body = self.parse_chain(true)?;
        self.expect(&TokenKind::RBrace, "'}'")?;
        let mode = match self.peek_kind() {
            TokenKind::SinkAppend => Some(SinkMode::Append),
            TokenKind::SinkOriginal => Some(SinkMode::OriginalOnly),
            TokenKind::SinkTee => Some(SinkMode::Tee),
            TokenKind::SinkOriginalTee => Some(SinkMode::OriginalTee),
            _ => None,
        };
        let sink = match mode {
            Some(mode) => {
                let arrow = self.advance();
                let (target, span) = self.expect_upper("a list name after the sink arrow")?;
                Some(Sink {
                    mode,
                    target,
                    span: arrow.span.merge(span),
                })
            }
            None => None,
        };
        Ok(OpKind::Block { body, sink })
    }

    fn parse_or(&mut self) -> Result<OpKind, ParseError> {
        self.advance(); // 'or'
        self.expect(&TokenKind::LParen, "'(' after 'or'")?;
        let mut branches = vec![self.parse_chain(true)?];
        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.advance();
            branches.push(self.parse_chain(true)?);
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(OpKind::Or { branches })
    }

    /// `( clause*, ops )` where clause is `N/A = Bool` or `[] = Bool`.
    fn parse_quantifier_body(&mut self) -> Result<(Chain, bool, bool), ParseError> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut na_passes = false;
        let mut empty_passes = false;
        loop {
            self.skip_newlines();
            match self.peek_kind() {
                TokenKind::NaLit => {
                    self.advance();
                    self.expect(&TokenKind::Assign, "'=' after N/A")?;
                    na_passes = self.parse_bool()?;
                    self.expect(&TokenKind::Comma, "',' after the clause")?;
                }
                TokenKind::LBracket => {
                    self.advance();
                    self.expect(&TokenKind::RBracket, "']' after '['")?;
                    self.expect(&TokenKind::Assign, "'=' after []")?;
                    empty_passes = self.parse_bool()?;
                    self.expect(&TokenKind::Comma, "',' after the clause")?;
                }
                _ => break,
            }
        }
        let chain = self.parse_chain(true)?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok((chain, na_passes, empty_passes))
    }

    fn parse_bool(&mut self) -> Result<bool, ParseError> {
        match self.peek_kind() {
            TokenKind::True => {
                self.advance();
                Ok(true)
            }
            TokenKind::False => {
                self.advance();
                Ok(false)
            }
            _ => Err(self.unexpected("'True' or 'False'")),
        }
    }

    fn parse_ratio(&mut self) -> Result<OpKind, ParseError> {
        let joined = if matches!(self.peek_kind(), TokenKind::Name(w) if w == "joined") {
            self.advance();
            true
        } else {
            false
        };
        self.expect(&TokenKind::Lt, "'<' in ilist_ratio")?;
        let bound = match self.peek_kind().clone() {
            TokenKind::FloatLit(x) => {
                self.advance();
                x
            }
            TokenKind::IntLit(n) => {
                self.advance();
                n as f64
            }
            _ => return Err(self.unexpected("a numeric ratio bound")),
        };
        self.expect(&TokenKind::LParen, "'(' after the ratio bound")?;
        let numerator = self.parse_chain(true)?;
        self.expect(&TokenKind::Comma, "',' between the ratio chains")?;
        let denominator = self.parse_chain(true)?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(OpKind::IlistRatio {
            joined,
            bound,
            numerator,
            denominator,
        })
    }

    fn parse_restart(&mut self) -> Result<OpKind, ParseError> {
        self.advance(); // 'restart'
        let bound = match self.peek_kind().clone() {
            TokenKind::IntLit(n) if n >= 0 => {
                self.advance();
                n as usize
            }
            _ => 1,
        };
        self.expect(&TokenKind::LParen, "'(' after 'restart'")?;
        let gate = self.parse_chain(true)?;
        self.expect(&TokenKind::Comma, "',' between the restart gate and body")?;
        let body = self.parse_chain(true)?;
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(OpKind::Restart { bound, gate, body })
    }
}
