//! Line-oriented lexer for DJ scripts.

use crate::compiler::tokens::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LexError {
    #[error("unexpected character '{ch}' at line {line}, col {col}")]
    UnexpectedChar { ch: char, line: usize, col: usize },
    #[error("unterminated string at line {line}, col {col}")]
    UnterminatedString { line: usize, col: usize },
    #[error("invalid number at line {line}, col {col}")]
    InvalidNumber { line: usize, col: usize },
}

impl LexError {
    pub fn location(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedChar { line, col, .. }
            | LexError::UnterminatedString { line, col }
            | LexError::InvalidNumber { line, col } => (*line, *col),
        }
    }
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    byte_offset: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            byte_offset: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }
    fn peek2(&self) -> Option<char> {
        self.source.get(self.pos + 2).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        self.byte_offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn span_here(&self) -> Span {
        Span::new(self.byte_offset, self.byte_offset, self.line, self.col)
    }

    fn span_from(&self, so: usize, sl: usize, sc: usize) -> Span {
        Span::new(so, self.byte_offset, sl, sc)
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let (so, sl, sc) = (self.byte_offset, self.line, self.col);
        self.advance(); // opening quote
        let mut buf = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(LexError::UnterminatedString { line: sl, col: sc })
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        Some('n') => {
                            buf.push('\n');
                            self.advance();
                        }
                        Some('t') => {
                            buf.push('\t');
                            self.advance();
                        }
                        Some('r') => {
                            buf.push('\r');
                            self.advance();
                        }
                        Some('\\') => {
                            buf.push('\\');
                            self.advance();
                        }
                        Some('"') => {
                            buf.push('"');
                            self.advance();
                        }
                        Some(c) => {
                            buf.push('\\');
                            buf.push(c);
                            self.advance();
                        }
                        None => {
                            return Err(LexError::UnterminatedString { line: sl, col: sc })
                        }
                    }
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    buf.push(c);
                    self.advance();
                }
            }
        }
        Ok(Token::new(
            TokenKind::StringLit(buf),
            self.span_from(so, sl, sc),
        ))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let (so, sl, sc) = (self.byte_offset, self.line, self.col);
        let mut ns = String::new();
        let mut is_float = false;
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                ns.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && matches!(self.peek(), Some(d) if d.is_ascii_digit())
            {
                is_float = true;
                ns.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let span = self.span_from(so, sl, sc);
        if is_float {
            ns.parse::<f64>()
                .map(|x| Token::new(TokenKind::FloatLit(x), span))
                .map_err(|_| LexError::InvalidNumber { line: sl, col: sc })
        } else {
            ns.parse::<i64>()
                .map(|n| Token::new(TokenKind::IntLit(n), span))
                .map_err(|_| LexError::InvalidNumber { line: sl, col: sc })
        }
    }

    fn read_name(&mut self) -> Token {
        let (so, sl, sc) = (self.byte_offset, self.line, self.col);
        let mut id = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
                id.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        let span = self.span_from(so, sl, sc);
        let kind = match id.as_str() {
            "ignore" => TokenKind::Ignore,
            "create" => TokenKind::Create,
            "list" => TokenKind::List,
            "set" => TokenKind::Set,
            "global_list" => TokenKind::GlobalList,
            "global_set" => TokenKind::GlobalSet,
            "config" => TokenKind::Config,
            "def" => TokenKind::Def,
            "use" => TokenKind::Use,
            "do" => TokenKind::Do,
            "or" => TokenKind::Or,
            "restart" => TokenKind::Restart,
            "ilist_if_all" => TokenKind::IlistIfAll,
            "ilist_if_any" => TokenKind::IlistIfAny,
            "ilist_foreach" => TokenKind::IlistForeach,
            "ilist_ratio" => TokenKind::IlistRatio,
            _ => TokenKind::Name(id),
        };
        Token::new(kind, span)
    }

    /// Reads an uppercase-initial name. `N/A`, `True`, and `False` are
    /// special-cased.
    fn read_upper(&mut self) -> Token {
        let (so, sl, sc) = (self.byte_offset, self.line, self.col);
        let mut id = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                id.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if id == "N" && self.current() == Some('/') && self.peek() == Some('A') {
            self.advance();
            self.advance();
            return Token::new(TokenKind::NaLit, self.span_from(so, sl, sc));
        }
        let span = self.span_from(so, sl, sc);
        let kind = match id.as_str() {
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => TokenKind::UpperName(id),
        };
        Token::new(kind, span)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let span = self.span_here();
        self.advance();
        Token::new(kind, span)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while self.pos < self.source.len() {
            let ch = match self.current() {
                Some(c) => c,
                None => break,
            };
            match ch {
                '\n' => {
                    let span = self.span_here();
                    self.advance();
                    if !matches!(
                        tokens.last().map(|t: &Token| &t.kind),
                        Some(TokenKind::Newline) | None
                    ) {
                        tokens.push(Token::new(TokenKind::Newline, span));
                    }
                }
                ' ' | '\t' | '\r' => {
                    while matches!(self.current(), Some(' ' | '\t' | '\r')) {
                        self.advance();
                    }
                }
                '#' => {
                    while matches!(self.current(), Some(c) if c != '\n') {
                        self.advance();
                    }
                }
                '\\' if matches!(self.peek(), Some('\n'))
                    || (self.peek() == Some('\r') && self.peek2() == Some('\n')) =>
                {
                    // Line continuation: splice the next line without a Newline token
                    self.advance(); // backslash
                    if self.current() == Some('\r') {
                        self.advance();
                    }
                    self.advance(); // newline
                    while matches!(self.current(), Some(' ' | '\t')) {
                        self.advance();
                    }
                }
                '"' => tokens.push(self.read_string()?),
                '0'..='9' => tokens.push(self.read_number()?),
                'a'..='z' | '_' => tokens.push(self.read_name()),
                'A'..='Z' => tokens.push(self.read_upper()),
                '+' => tokens.push(self.single(TokenKind::Plus)),
                '*' => tokens.push(self.single(TokenKind::Star)),
                '!' => tokens.push(self.single(TokenKind::Bang)),
                '~' => tokens.push(self.single(TokenKind::Tilde)),
                '>' => tokens.push(self.single(TokenKind::SinkAppend)),
                '<' => tokens.push(self.single(TokenKind::Lt)),
                '=' => tokens.push(self.single(TokenKind::Assign)),
                '(' => tokens.push(self.single(TokenKind::LParen)),
                ')' => tokens.push(self.single(TokenKind::RParen)),
                '{' => tokens.push(self.single(TokenKind::LBrace)),
                '}' => tokens.push(self.single(TokenKind::RBrace)),
                ',' => tokens.push(self.single(TokenKind::Comma)),
                '[' => {
                    if self.peek() == Some(']') && self.peek2() == Some('>') {
                        let (so, sl, sc) = (self.byte_offset, self.line, self.col);
                        self.advance();
                        self.advance();
                        self.advance();
                        tokens.push(Token::new(
                            TokenKind::SinkOriginal,
                            self.span_from(so, sl, sc),
                        ));
                    } else {
                        tokens.push(self.single(TokenKind::LBracket));
                    }
                }
                ']' => tokens.push(self.single(TokenKind::RBracket)),
                '/' => {
                    let (so, sl, sc) = (self.byte_offset, self.line, self.col);
                    self.advance();
                    match self.current() {
                        Some('>') => {
                            self.advance();
                            tokens.push(Token::new(TokenKind::SinkTee, self.span_from(so, sl, sc)));
                        }
                        Some('[') if self.peek() == Some(']') && self.peek2() == Some('>') => {
                            self.advance();
                            self.advance();
                            self.advance();
                            tokens.push(Token::new(
                                TokenKind::SinkOriginalTee,
                                self.span_from(so, sl, sc),
                            ));
                        }
                        other => {
                            return Err(LexError::UnexpectedChar {
                                ch: other.unwrap_or('/'),
                                line: sl,
                                col: sc,
                            })
                        }
                    }
                }
                c => {
                    return Err(LexError::UnexpectedChar {
                        ch: c,
                        line: self.line,
                        col: self.col,
                    })
                }
            }
        }
        tokens.push(Token::new(TokenKind::Eof, self.span_here()));
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_lex_leaf_chain() {
        let kinds = lex("split \" \" report");
        assert!(matches!(&kinds[0], TokenKind::Name(s) if s == "split"));
        assert!(matches!(&kinds[1], TokenKind::StringLit(s) if s == " "));
        assert!(matches!(&kinds[2], TokenKind::Name(s) if s == "report"));
        assert!(matches!(&kinds[3], TokenKind::Eof));
    }

    #[test]
    fn test_lex_modifiers() {
        let kinds = lex("+split \" \" *map !min ~is_lower");
        assert!(matches!(kinds[0], TokenKind::Plus));
        assert!(matches!(kinds[3], TokenKind::Star));
        assert!(matches!(kinds[5], TokenKind::Bang));
        assert!(matches!(kinds[7], TokenKind::Tilde));
    }

    #[test]
    fn test_lex_sinks() {
        let kinds = lex("{ lower }> L { lower }[]> L { lower }/> L { lower }/[]> L");
        assert!(kinds.contains(&TokenKind::SinkAppend));
        assert!(kinds.contains(&TokenKind::SinkOriginal));
        assert!(kinds.contains(&TokenKind::SinkTee));
        assert!(kinds.contains(&TokenKind::SinkOriginalTee));
    }

    #[test]
    fn test_lex_keywords() {
        let kinds = lex("ignore create list set global_list global_set config def use do or restart");
        assert_eq!(
            kinds[..12],
            [
                TokenKind::Ignore,
                TokenKind::Create,
                TokenKind::List,
                TokenKind::Set,
                TokenKind::GlobalList,
                TokenKind::GlobalSet,
                TokenKind::Config,
                TokenKind::Def,
                TokenKind::Use,
                TokenKind::Do,
                TokenKind::Or,
                TokenKind::Restart,
            ]
        );
    }

    #[test]
    fn test_lex_na_sentinel() {
        let kinds = lex("ilist_if_all( N/A = False, [] = False, lower )");
        assert!(kinds.contains(&TokenKind::NaLit));
        assert!(kinds.contains(&TokenKind::False));
        assert!(kinds.contains(&TokenKind::LBracket));
        assert!(kinds.contains(&TokenKind::RBracket));
    }

    #[test]
    fn test_lex_upper_name() {
        let kinds = lex("use TOKENS_1");
        assert!(matches!(&kinds[1], TokenKind::UpperName(s) if s == "TOKENS_1"));
    }

    #[test]
    fn test_lex_comment() {
        let kinds = lex("lower # to lowercase\nreport");
        assert!(matches!(&kinds[0], TokenKind::Name(s) if s == "lower"));
        assert!(matches!(kinds[1], TokenKind::Newline));
        assert!(matches!(&kinds[2], TokenKind::Name(s) if s == "report"));
    }

    #[test]
    fn test_lex_line_continuation() {
        let kinds = lex("lower \\\n  report");
        assert!(!kinds.contains(&TokenKind::Newline));
        assert!(matches!(&kinds[1], TokenKind::Name(s) if s == "report"));
    }

    #[test]
    fn test_lex_string_escapes() {
        let kinds = lex(r#""a\tb\n\"q\"""#);
        assert!(matches!(&kinds[0], TokenKind::StringLit(s) if s == "a\tb\n\"q\""));
    }

    #[test]
    fn test_lex_numbers() {
        let kinds = lex("min length 3 ilist_ratio < 0.5");
        assert!(matches!(kinds[2], TokenKind::IntLit(3)));
        assert!(matches!(kinds[5], TokenKind::FloatLit(x) if x == 0.5));
    }

    #[test]
    fn test_lex_unterminated_string() {
        let err = Lexer::new("remove \"abc").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_lex_rejects_stray_slash() {
        let err = Lexer::new("lower / report").tokenize().unwrap_err();
        assert!(matches!(err, LexError::UnexpectedChar { .. }));
    }
}
