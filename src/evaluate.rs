use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Instant;

use crate::regex_cache::RegexCache;
use crate::types::parse_number;
use crate::{
    CompareOp, Condition, Disjunction, EvalError, EvaluationReport, Expression, Limits, Rule,
    Span, SpanCheck, Term, Trace, Value, WhereCondition, WhereFilter, WhereTerm,
};

/// Evaluates compiled rules against traces.
///
/// An `Evaluator` is `Send + Sync` and meant to be shared: the only state
/// it holds is a cache of compiled `matches` patterns, safe for concurrent
/// use. Rules and traces are only ever read.
///
/// # Example
///
/// ```
/// use trace_invariants::{Evaluator, Span, Trace};
///
/// let rule = "when { payment.where(amount > 1000) } always { fraud_check }"
///     .parse()
///     .unwrap();
/// let trace = Trace::new().with_span(Span::new("payment").with_attribute("amount", 5000));
///
/// let evaluator = Evaluator::new();
/// assert!(evaluator.evaluate(&rule, &trace).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct Evaluator {
    limits: Limits,
    regexes: RegexCache,
}

static DEFAULT_EVALUATOR: LazyLock<Evaluator> = LazyLock::new(Evaluator::new);

/// Evaluate `rule` against `trace` with a shared default [`Evaluator`].
///
/// Returns `Ok(true)` when the rule is violated.
///
/// # Errors
///
/// See [`Evaluator::evaluate`].
pub fn evaluate(rule: &Rule, trace: &Trace) -> Result<bool, EvalError> {
    DEFAULT_EVALUATOR.evaluate(rule, trace)
}

/// Outcome of the three clauses: whether `when` matched, and the results of
/// `always` and `never` when present and reached.
type ClauseOutcome = (bool, Option<bool>, Option<bool>);

impl Evaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            limits,
            regexes: RegexCache::default(),
        }
    }

    /// Check that `rule` can be evaluated and compile its patterns into the
    /// cache. Failures here do not depend on any trace.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Semantic`] when the rule has neither `always`
    /// nor `never`, [`EvalError::Unsupported`] for reserved expression
    /// shapes, and [`EvalError::InvalidRegex`] or
    /// [`EvalError::TypeMismatch`] for unusable `matches` patterns.
    pub fn prepare(&self, rule: &Rule) -> Result<(), EvalError> {
        rule.validate()?;
        self.check_condition(&rule.when)?;
        for clause in [&rule.always, &rule.never].into_iter().flatten() {
            self.check_condition(clause)?;
        }
        Ok(())
    }

    /// Evaluate `rule` against `trace`, returning `Ok(true)` when the rule is
    /// violated: `when` holds and either `always` does not hold or `never`
    /// does. Both clauses are checked whenever `when` holds.
    ///
    /// # Errors
    ///
    /// Everything [`prepare`](Self::prepare) reports, plus
    /// [`EvalError::TypeMismatch`] when an ordering, `in` or `contains`
    /// comparison meets operands it cannot compare.
    pub fn evaluate(&self, rule: &Rule, trace: &Trace) -> Result<bool, EvalError> {
        self.prepare(rule)?;
        self.evaluate_prepared(rule, trace)
    }

    /// Evaluate a rule that has already passed [`prepare`](Self::prepare)
    /// on this evaluator, skipping the static checks.
    ///
    /// An unprepared rule still fails loudly, but only on the errors the
    /// trace actually reaches.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn evaluate_prepared(&self, rule: &Rule, trace: &Trace) -> Result<bool, EvalError> {
        let (_, always, never) = self.run(rule, trace)?;
        Ok(always == Some(false) || never == Some(true))
    }

    /// Like [`evaluate`](Self::evaluate), but reports each clause and the
    /// time taken.
    ///
    /// # Errors
    ///
    /// See [`evaluate`](Self::evaluate).
    pub fn evaluate_detailed(
        &self,
        rule: &Rule,
        trace: &Trace,
    ) -> Result<EvaluationReport, EvalError> {
        let start = Instant::now();
        self.prepare(rule)?;
        let (when, always, never) = self.run(rule, trace)?;
        Ok(EvaluationReport::new(when, always, never, start.elapsed()))
    }

    /// Number of distinct patterns compiled so far.
    #[must_use]
    pub fn cached_patterns(&self) -> usize {
        self.regexes.len()
    }

    fn run(&self, rule: &Rule, trace: &Trace) -> Result<ClauseOutcome, EvalError> {
        if !self.condition(&rule.when, trace)? {
            return Ok((false, None, None));
        }
        let always = match &rule.always {
            Some(cond) => Some(self.condition(cond, trace)?),
            None => None,
        };
        let never = match &rule.never {
            Some(cond) => Some(self.condition(cond, trace)?),
            None => None,
        };
        Ok((true, always, never))
    }

    // -- Static checks ------------------------------------------------------

    fn check_condition(&self, cond: &Condition) -> Result<(), EvalError> {
        for term in cond.groups.iter().flat_map(|g| &g.terms) {
            self.check_term(term)?;
        }
        Ok(())
    }

    fn check_term(&self, term: &Term) -> Result<(), EvalError> {
        match term {
            Term::Not(inner) => self.check_term(inner),
            Term::Grouped(cond) => self.check_condition(cond),
            Term::Check(SpanCheck::Exists { filters, .. }) => {
                for filter in filters {
                    self.check_where(filter)?;
                }
                Ok(())
            }
            Term::Check(SpanCheck::Count { operation, op, rhs }) => {
                check_expression(rhs)?;
                if *op == CompareOp::Matches {
                    self.pattern(format_args!("count({operation})"), rhs)?;
                }
                Ok(())
            }
            Term::Check(check @ SpanCheck::Compare { .. }) => Err(EvalError::unsupported(
                format!("direct attribute comparison '{check}'"),
            )),
        }
    }

    fn check_where(&self, cond: &WhereCondition) -> Result<(), EvalError> {
        for term in cond.groups.iter().flat_map(|g| &g.terms) {
            self.check_where_term(term)?;
        }
        Ok(())
    }

    fn check_where_term(&self, term: &WhereTerm) -> Result<(), EvalError> {
        match term {
            WhereTerm::Not(inner) => self.check_where_term(inner),
            WhereTerm::Grouped(cond) => self.check_where(cond),
            WhereTerm::Filter(WhereFilter::Flag(_)) => Ok(()),
            WhereTerm::Filter(WhereFilter::Compare { attribute, op, rhs }) => {
                check_expression(rhs)?;
                if *op == CompareOp::Matches {
                    self.pattern(format_args!("attribute '{attribute}'"), rhs)?;
                }
                Ok(())
            }
        }
    }

    fn pattern(
        &self,
        lhs: fmt::Arguments<'_>,
        rhs: &Expression,
    ) -> Result<Arc<regex::Regex>, EvalError> {
        match rhs {
            Expression::Value(Value::String(p) | Value::Ident(p)) => {
                self.regexes.get_or_compile(p, self.limits.max_regex_bytes)
            }
            other => Err(EvalError::TypeMismatch {
                op: CompareOp::Matches,
                lhs: lhs.to_string(),
                rhs: other.to_string(),
            }),
        }
    }

    // -- Trace-level conditions ---------------------------------------------

    fn condition(&self, cond: &Condition, trace: &Trace) -> Result<bool, EvalError> {
        any_group(cond, |term| self.term(term, trace))
    }

    fn term(&self, term: &Term, trace: &Trace) -> Result<bool, EvalError> {
        match term {
            Term::Not(inner) => Ok(!self.term(inner, trace)?),
            Term::Grouped(cond) => self.condition(cond, trace),
            Term::Check(check) => self.span_check(check, trace),
        }
    }

    fn span_check(&self, check: &SpanCheck, trace: &Trace) -> Result<bool, EvalError> {
        match check {
            SpanCheck::Exists { operation, filters } => {
                let mut deferred = None;
                for span in trace.spans_named(operation) {
                    match self.span_matches(span, filters, trace) {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(e) => {
                            deferred.get_or_insert(e);
                        }
                    }
                }
                deferred.map_or(Ok(false), Err)
            }
            SpanCheck::Count { operation, op, rhs } => {
                let count = trace.count(operation);
                let subject = Subject::count(operation, count);
                let rhs = resolve(rhs, trace)?;
                compare(&self.regexes, &self.limits, &subject, *op, &rhs)
            }
            check @ SpanCheck::Compare { .. } => Err(EvalError::unsupported(format!(
                "direct attribute comparison '{check}'"
            ))),
        }
    }

    // -- Span-level conditions ----------------------------------------------

    fn span_matches(
        &self,
        span: &Span,
        filters: &[WhereCondition],
        trace: &Trace,
    ) -> Result<bool, EvalError> {
        for filter in filters {
            if !self.where_condition(filter, span, trace)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn where_condition(
        &self,
        cond: &WhereCondition,
        span: &Span,
        trace: &Trace,
    ) -> Result<bool, EvalError> {
        any_group(cond, |term| self.where_term(term, span, trace))
    }

    fn where_term(&self, term: &WhereTerm, span: &Span, trace: &Trace) -> Result<bool, EvalError> {
        match term {
            WhereTerm::Not(inner) => Ok(!self.where_term(inner, span, trace)?),
            WhereTerm::Grouped(cond) => self.where_condition(cond, span, trace),
            WhereTerm::Filter(WhereFilter::Flag(name)) => {
                Ok(span.field(name).is_some_and(|value| is_truthy(&value)))
            }
            WhereTerm::Filter(WhereFilter::Compare { attribute, op, rhs }) => {
                let Some(value) = span.field(attribute) else {
                    return Ok(false);
                };
                let subject = Subject::attribute(attribute, &value);
                let rhs = resolve(rhs, trace)?;
                compare(&self.regexes, &self.limits, &subject, *op, &rhs)
            }
        }
    }
}

/// OR over AND-groups, short-circuiting left to right.
fn any_group<T>(
    cond: &Disjunction<T>,
    mut eval: impl FnMut(&T) -> Result<bool, EvalError>,
) -> Result<bool, EvalError> {
    for group in &cond.groups {
        let mut all = true;
        for term in &group.terms {
            if !eval(term)? {
                all = false;
                break;
            }
        }
        if all {
            return Ok(true);
        }
    }
    Ok(false)
}

fn check_expression(expr: &Expression) -> Result<(), EvalError> {
    match expr {
        Expression::Path(path) => Err(EvalError::unsupported(format!(
            "cross-span reference '{path}'"
        ))),
        Expression::Value(_) | Expression::Count(_) => Ok(()),
    }
}

#[allow(clippy::cast_possible_wrap)]
fn resolve<'e>(expr: &'e Expression, trace: &Trace) -> Result<Cow<'e, Value>, EvalError> {
    match expr {
        Expression::Value(v) => Ok(Cow::Borrowed(v)),
        Expression::Count(op) => Ok(Cow::Owned(Value::Int(trace.count(op) as i64))),
        Expression::Path(path) => Err(EvalError::unsupported(format!(
            "cross-span reference '{path}'"
        ))),
    }
}

// -- Comparison semantics -----------------------------------------------------

/// The left-hand side of a comparison: where it came from, its text, and
/// its numeric value when the text is a finite number.
struct Subject<'s> {
    source: Source<'s>,
    text: Cow<'s, str>,
    number: Option<f64>,
}

enum Source<'s> {
    Attribute(&'s str),
    Count(&'s str),
}

impl<'s> Subject<'s> {
    fn attribute(name: &'s str, value: &'s str) -> Self {
        Self {
            source: Source::Attribute(name),
            text: Cow::Borrowed(value),
            number: parse_number(value),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn count(operation: &'s str, count: usize) -> Self {
        Self {
            source: Source::Count(operation),
            text: Cow::Owned(count.to_string()),
            number: Some(count as f64),
        }
    }

    fn mismatch(&self, op: CompareOp, rhs: &Value) -> EvalError {
        let lhs = match self.source {
            Source::Attribute(name) => format!("attribute '{name}' = \"{}\"", self.text),
            Source::Count(operation) => format!("count({operation}) = {}", self.text),
        };
        EvalError::TypeMismatch {
            op,
            lhs,
            rhs: rhs.to_string(),
        }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Truth value of a bare attribute flag. Empty, `false` and zero are false;
/// any other present value is true.
fn is_truthy(text: &str) -> bool {
    if let Some(b) = parse_bool(text) {
        return b;
    }
    if let Some(n) = parse_number(text) {
        return n != 0.0;
    }
    !text.trim().is_empty()
}

#[allow(clippy::float_cmp)]
fn equals(subject: &Subject<'_>, op: CompareOp, rhs: &Value) -> Result<bool, EvalError> {
    match rhs {
        Value::List(_) => Err(subject.mismatch(op, rhs)),
        Value::Bool(b) => Ok(parse_bool(&subject.text) == Some(*b)),
        _ => {
            if let (Some(a), Some(b)) = (subject.number, rhs.as_number()) {
                return Ok(a == b);
            }
            Ok(rhs.as_text().is_some_and(|t| subject.text == t))
        }
    }
}

fn compare(
    regexes: &RegexCache,
    limits: &Limits,
    subject: &Subject<'_>,
    op: CompareOp,
    rhs: &Value,
) -> Result<bool, EvalError> {
    match op {
        CompareOp::Eq => equals(subject, op, rhs),
        CompareOp::Neq => Ok(!equals(subject, op, rhs)?),
        CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
            let (Some(a), Some(b)) = (subject.number, rhs.as_number()) else {
                return Err(subject.mismatch(op, rhs));
            };
            Ok(match op {
                CompareOp::Lt => a < b,
                CompareOp::Lte => a <= b,
                CompareOp::Gt => a > b,
                _ => a >= b,
            })
        }
        CompareOp::In => match rhs {
            Value::List(items) => {
                for item in items {
                    if equals(subject, CompareOp::Eq, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            _ => Err(subject.mismatch(op, rhs)),
        },
        CompareOp::Matches => match rhs {
            Value::String(pattern) | Value::Ident(pattern) => {
                let regex = regexes.get_or_compile(pattern, limits.max_regex_bytes)?;
                Ok(regex.is_match(&subject.text))
            }
            _ => Err(subject.mismatch(op, rhs)),
        },
        CompareOp::Contains => match rhs.as_text() {
            Some(needle) => Ok(subject.text.contains(needle.as_ref())),
            None => Err(subject.mismatch(op, rhs)),
        },
    }
}
