use thiserror::Error;

use crate::engine::EngineError;
use crate::parse::{CompileError, LexError, ParseError};
use crate::{EvalError, SemanticError};

/// Unified error type covering every stage from reading rule text to
/// evaluating it.
///
/// Returned by convenience methods like [`Rule::from_file()`](crate::Rule::from_file);
/// each stage's own error converts into it with `?`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
