use std::fmt;
use std::time::Duration;

/// Detailed outcome of evaluating one rule against one trace, returned by
/// [`Evaluator::evaluate_detailed()`](crate::Evaluator::evaluate_detailed).
///
/// `always_held` and `never_matched` are `None` when the clause is absent or
/// was not evaluated because `when` did not match.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct EvaluationReport {
    violated: bool,
    when_matched: bool,
    always_held: Option<bool>,
    never_matched: Option<bool>,
    duration: Duration,
}

impl EvaluationReport {
    pub(crate) fn new(
        when_matched: bool,
        always_held: Option<bool>,
        never_matched: Option<bool>,
        duration: Duration,
    ) -> Self {
        let violated = always_held == Some(false) || never_matched == Some(true);
        Self {
            violated,
            when_matched,
            always_held,
            never_matched,
            duration,
        }
    }

    /// The verdict, same as [`Evaluator::evaluate()`](crate::Evaluator::evaluate).
    #[must_use]
    pub fn violated(&self) -> bool {
        self.violated
    }

    /// Whether the rule applied to the trace at all.
    #[must_use]
    pub fn when_matched(&self) -> bool {
        self.when_matched
    }

    #[must_use]
    pub fn always_held(&self) -> Option<bool> {
        self.always_held
    }

    #[must_use]
    pub fn never_matched(&self) -> Option<bool> {
        self.never_matched
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

fn clause(f: &mut fmt::Formatter<'_>, name: &str, outcome: Option<bool>) -> fmt::Result {
    match outcome {
        Some(v) => write!(f, ", {name}: {v}"),
        None => write!(f, ", {name}: -"),
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "violated: {}, when: {}",
            self.violated, self.when_matched
        )?;
        clause(f, "always", self.always_held)?;
        clause(f, "never", self.never_matched)?;
        write!(f, ", duration: {:?}", self.duration)
    }
}
