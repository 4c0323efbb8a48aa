use thiserror::Error;

use super::expr::CompareOp;

/// A rule that parsed but cannot be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("rule must have at least one of 'always' or 'never'")]
    MissingConstraint,
}

/// Runtime evaluation failures. These are never folded into a
/// "no violation" verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: CompareOp,
        lhs: String,
        rhs: String,
    },

    #[error("invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    #[error("unsupported expression: {construct}")]
    Unsupported { construct: String },
}

impl EvalError {
    pub(crate) fn unsupported(construct: impl Into<String>) -> Self {
        EvalError::Unsupported {
            construct: construct.into(),
        }
    }
}
