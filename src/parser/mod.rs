//! Bracket matching: tokens in, the value tree the interpreter runs out.
//!
//! `[ ... ]` becomes a list, quoted text a string, and a bare word a number
//! when it looks like one. `'name` is shorthand for the string `"name"`, the
//! usual way to hand a name to `define`. Everything else is a symbol.

use crate::image;
use crate::lexer::{self, LexError, Token};
use crate::source::Span;
use crate::value::Value;

/// Deepest bracket nesting a program may use. A quotation defined inside a
/// word sits two levels further down in a saved image, so anything that
/// parses can also be saved.
pub const MAX_NESTING: usize = image::MAX_DEPTH - 2;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
}

/// Either front-end failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

type Result<T> = std::result::Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let next = self.tokens.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    /// Parses the whole token stream as one top-level sequence.
    pub fn parse_program(&mut self) -> Result<Vec<Value>> {
        // open brackets still waiting for their `]`: (token index, span, items so far)
        let mut open: Vec<(usize, Span, Vec<Value>)> = Vec::new();
        let mut current = Vec::new();
        while let Some((token, span)) = self.advance() {
            match token {
                Token::Open => {
                    if open.len() == MAX_NESTING {
                        return Err(ParseError {
                            code: "BRF-P003",
                            position: self.pos - 1,
                            span,
                            message: format!("brackets nested deeper than {MAX_NESTING}"),
                        });
                    }
                    open.push((self.pos - 1, span, std::mem::take(&mut current)));
                }
                Token::Close => {
                    let Some((_, _, outer)) = open.pop() else {
                        return Err(ParseError {
                            code: "BRF-P002",
                            position: self.pos - 1,
                            span,
                            message: "']' without a matching '['".to_string(),
                        });
                    };
                    let list = Value::list(std::mem::replace(&mut current, outer));
                    current.push(list);
                }
                Token::Text(text) => current.push(Value::string(&text)),
                Token::Word(word) => current.push(atom(&word)),
            }
        }
        match open.pop() {
            Some((position, span, _)) => Err(ParseError {
                code: "BRF-P001",
                position,
                span,
                message: "'[' is never closed".to_string(),
            }),
            None => Ok(current),
        }
    }
}

/// Number, `'name` string shorthand, or symbol.
fn atom(word: &str) -> Value {
    if looks_numeric(word) {
        if let Ok(n) = word.parse::<f64>() {
            return Value::Number(n);
        }
    }
    match word.strip_prefix('\'') {
        Some(name) if !name.is_empty() => Value::string(name),
        _ => Value::symbol(word),
    }
}

/// A digit first, or a sign or dot directly followed by one. Keeps words
/// like `inf`, `nan` and `-` symbols even though `f64` would accept some.
fn looks_numeric(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('-' | '+' | '.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Vec<Value>> {
    Parser::new(tokens).parse_program()
}

/// Source text to the value tree.
pub fn read(source: &str) -> std::result::Result<Vec<Value>, ReadError> {
    let tokens = lexer::lex(source)?;
    Ok(parse(tokens)?)
}
