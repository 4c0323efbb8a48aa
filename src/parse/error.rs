use thiserror::Error;

use super::token::Position;

/// What went wrong while lexing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("number '{0}' is out of range")]
    NumberOutOfRange(String),

    #[error("input is {size} bytes, exceeding the limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },
}

/// Errors produced when converting rule text into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lex error at {position}: {kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

impl LexError {
    pub(crate) fn new(kind: LexErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

/// Errors produced when a token stream does not form a valid rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at {position}: {message}")]
pub struct ParseError {
    message: String,
    position: Position,
    expected: Vec<String>,
    found: String,
}

impl ParseError {
    pub(crate) fn new(
        message: impl Into<String>,
        position: Position,
        expected: Vec<String>,
        found: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            position,
            expected,
            found: found.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Descriptions of what the parser would have accepted at the failure point.
    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    /// Description of the token the parser stopped at.
    #[must_use]
    pub fn found(&self) -> &str {
        &self.found
    }
}

/// Either stage of turning rule text into a [`Rule`](crate::Rule).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CompileError {
    /// Where in the source the failure was detected.
    #[must_use]
    pub fn position(&self) -> Position {
        match self {
            CompileError::Lex(e) => e.position,
            CompileError::Parse(e) => e.position,
        }
    }
}
