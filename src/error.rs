use crate::token::Token;
use core::fmt;
use thiserror::Error;

/// The kinds of pattern syntax errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnmatchedBracket,
    InvalidQuantifier,
    DanglingQuantifier,
    InvalidEscape,
    InvalidGroup,
    InvalidCharRange,
    InvalidPropertyEscape,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SyntaxErrorKind::UnmatchedBracket => "unmatched bracket",
            SyntaxErrorKind::InvalidQuantifier => "invalid quantifier",
            SyntaxErrorKind::DanglingQuantifier => "dangling quantifier",
            SyntaxErrorKind::InvalidEscape => "invalid escape",
            SyntaxErrorKind::InvalidGroup => "invalid group",
            SyntaxErrorKind::InvalidCharRange => "invalid character range",
            SyntaxErrorKind::InvalidPropertyEscape => "invalid property escape",
        };
        f.write_str(s)
    }
}

/// Errors returned while parsing, compiling, or tokenizing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A pattern could not be parsed.
    #[error("{message} at offset {offset}")]
    Syntax {
        kind: SyntaxErrorKind,
        offset: usize,
        message: String,
    },

    /// A `{name}` reference named neither a variable nor a rule.
    #[error("Cannot find expression: {0}")]
    UnresolvedReference(String),

    /// A `{name}` reference expands to itself.
    #[error("Recursive reference to expression: {0}")]
    RecursiveReference(String),

    /// The pattern uses a construct the compiler does not support.
    #[error("{0} are not supported")]
    Unsupported(&'static str),

    /// No rule matches the input at `offset`.
    #[error("Unexpected character {ch:?} at line {line}, column {column}")]
    UnexpectedCharacter {
        offset: usize,
        line: usize,
        column: usize,
        ch: char,
    },

    /// A token buffer found a token of the wrong kind.
    #[error("Unexpected token {}, expected one of {expected:?}", describe(.found))]
    UnexpectedToken {
        found: Box<Token>,
        expected: Vec<String>,
    },

    /// A token buffer ran out of tokens.
    #[error("Unexpected end of input")]
    UnexpectedEndOfInput,
}

fn describe(token: &Token) -> String {
    format!("{} ({:?} at {})", token.tag, token.value, token.start)
}

impl Error {
    /// \return the syntax error kind, if this is a syntax error.
    pub fn syntax_kind(&self) -> Option<SyntaxErrorKind> {
        match self {
            Error::Syntax { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
