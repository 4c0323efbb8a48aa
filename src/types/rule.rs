use std::fmt;

use super::condition::Condition;
use super::error::SemanticError;

/// A compiled rule: when `when` holds for a trace, `always` must hold and
/// `never` must not.
///
/// Rules are produced by [`parse`](crate::parse::parse) or assembled with the
/// builder methods, and are immutable afterwards. A rule with neither
/// `always` nor `never` parses, but is rejected at evaluation time.
///
/// # Example
///
/// ```
/// use trace_invariants::{Rule, attr, span};
///
/// let rule = Rule::when(span("payment").filter(attr("amount").gt(1000_i64)))
///     .always(span("fraud_check"));
/// assert_eq!(
///     rule.to_string(),
///     "when { payment.where(amount > 1000) }\nalways { fraud_check }"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub when: Condition,
    pub always: Option<Condition>,
    pub never: Option<Condition>,
}

impl Rule {
    #[must_use]
    pub fn when(condition: impl Into<Condition>) -> Self {
        Self {
            when: condition.into(),
            always: None,
            never: None,
        }
    }

    #[must_use]
    pub fn always(mut self, condition: impl Into<Condition>) -> Self {
        self.always = Some(condition.into());
        self
    }

    #[must_use]
    pub fn never(mut self, condition: impl Into<Condition>) -> Self {
        self.never = Some(condition.into());
        self
    }

    /// Read and parse a rule file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read,
    /// otherwise the [`CompileError`](crate::parse::CompileError) from
    /// parsing it.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::Error> {
        let source = std::fs::read_to_string(path)?;
        Ok(crate::parse::parse(&source)?)
    }

    /// Check the constraints the grammar does not enforce.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticError::MissingConstraint`] when both `always` and
    /// `never` are absent.
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.always.is_none() && self.never.is_none() {
            return Err(SemanticError::MissingConstraint);
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "when {{ {} }}", self.when)?;
        if let Some(always) = &self.always {
            write!(f, "\nalways {{ {always} }}")?;
        }
        if let Some(never) = &self.never {
            write!(f, "\nnever {{ {never} }}")?;
        }
        Ok(())
    }
}
