//! Formula rewriting: column references in a formula expression are replaced
//! with `{column_id}` placeholders.

use std::iter::Peekable;
use std::str::Chars;

use metaport_db::models::Column;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormulaError {
    #[error("Empty formula")]
    Empty,

    #[error("Unknown column reference: {0}")]
    UnknownColumn(String),

    #[error("Unterminated string literal at offset {0}")]
    UnterminatedString(usize),

    #[error("Unterminated column reference at offset {0}")]
    UnterminatedReference(usize),
}

/// Rewrites a formula against the columns of its table.
pub trait FormulaRewriter: Send + Sync {
    fn rewrite(&self, expression: &str, columns: &[Column]) -> Result<String, FormulaError>;
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    /// `{name}` reference.
    Ref(String),
    Literal(String),
    Space(String),
    Punct(char),
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    offset: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            offset: 0,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    fn take_while(&mut self, first: char, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn string(&mut self, quote: char, start: usize) -> Result<Token, FormulaError> {
        let mut out = String::from(quote);
        loop {
            match self.bump() {
                None => return Err(FormulaError::UnterminatedString(start)),
                Some('\\') => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c);
                    }
                }
                Some(c) => {
                    out.push(c);
                    if c == quote {
                        return Ok(Token::Literal(out));
                    }
                }
            }
        }
    }

    fn reference(&mut self, start: usize) -> Result<Token, FormulaError> {
        let mut name = String::new();
        loop {
            match self.bump() {
                None => return Err(FormulaError::UnterminatedReference(start)),
                Some('}') => return Ok(Token::Ref(name.trim().to_string())),
                Some(c) => name.push(c),
            }
        }
    }

    fn tokens(mut self) -> Result<Vec<Token>, FormulaError> {
        let mut out = Vec::new();
        loop {
            let start = self.offset;
            let Some(c) = self.bump() else { break };
            let token = match c {
                c if c.is_whitespace() => Token::Space(self.take_while(c, char::is_whitespace)),
                '"' | '\'' => self.string(c, start)?,
                '{' => self.reference(start)?,
                c if c.is_ascii_digit() => {
                    Token::Literal(self.take_while(c, |c| c.is_ascii_digit() || c == '.'))
                }
                c if c.is_alphabetic() || c == '_' || c == '$' => {
                    Token::Ident(self.take_while(c, |c| c.is_alphanumeric() || c == '_' || c == '$'))
                }
                c => Token::Punct(c),
            };
            out.push(token);
        }
        Ok(out)
    }
}

/// Default rewriter. Bare identifiers and `{alias}` references resolve by
/// column title, canonical name, or id; identifiers followed by `(` are
/// function names and stay as written.
#[derive(Debug, Clone, Copy, Default)]
pub struct AliasSubstitution;

impl AliasSubstitution {
    fn column_id<'c>(name: &str, columns: &'c [Column]) -> Result<&'c str, FormulaError> {
        columns
            .iter()
            .find(|c| c.title == name)
            .or_else(|| columns.iter().find(|c| c.column_name.as_deref() == Some(name)))
            .or_else(|| columns.iter().find(|c| c.id == name))
            .map(|c| c.id.as_str())
            .ok_or_else(|| FormulaError::UnknownColumn(name.to_string()))
    }
}

impl FormulaRewriter for AliasSubstitution {
    fn rewrite(&self, expression: &str, columns: &[Column]) -> Result<String, FormulaError> {
        if expression.trim().is_empty() {
            return Err(FormulaError::Empty);
        }
        let tokens = Lexer::new(expression).tokens()?;
        let mut out = String::with_capacity(expression.len());
        for (i, token) in tokens.iter().enumerate() {
            match token {
                Token::Ident(name) => {
                    let is_call = tokens[i + 1..]
                        .iter()
                        .find(|t| !matches!(t, Token::Space(_)))
                        .is_some_and(|t| *t == Token::Punct('('));
                    if is_call {
                        out.push_str(name);
                    } else {
                        out.push('{');
                        out.push_str(Self::column_id(name, columns)?);
                        out.push('}');
                    }
                }
                Token::Ref(name) => {
                    out.push('{');
                    out.push_str(Self::column_id(name, columns)?);
                    out.push('}');
                }
                Token::Literal(s) | Token::Space(s) => out.push_str(s),
                Token::Punct(c) => out.push(*c),
            }
        }
        Ok(out)
    }
}
