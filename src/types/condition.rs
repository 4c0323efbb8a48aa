use std::fmt;
use std::ops::Not;

use super::expr::{CompareOp, Expression, WhereFilter};

/// An OR of AND-groups. Precedence lives in this shape: `and` always binds
/// tighter than `or`, and explicit parentheses become a grouped term.
#[derive(Debug, Clone, PartialEq)]
pub struct Disjunction<T> {
    pub groups: Vec<Conjunction<T>>,
}

/// An AND of terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Conjunction<T> {
    pub terms: Vec<T>,
}

/// A trace-level boolean condition, the body of `when`/`always`/`never`.
pub type Condition = Disjunction<Term>;
pub type AndGroup = Conjunction<Term>;

/// A span-level boolean condition, the body of `.where(...)`.
pub type WhereCondition = Disjunction<WhereTerm>;
pub type WhereAndGroup = Conjunction<WhereTerm>;

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Not(Box<Term>),
    Grouped(Condition),
    Check(SpanCheck),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WhereTerm {
    Not(Box<WhereTerm>),
    Grouped(WhereCondition),
    Filter(WhereFilter),
}

/// An atomic trace-level check.
#[derive(Debug, Clone, PartialEq)]
pub enum SpanCheck {
    /// Some span named `operation` satisfies every filter in `filters`.
    Exists {
        operation: String,
        filters: Vec<WhereCondition>,
    },
    /// `count(operation) <op> rhs`.
    Count {
        operation: String,
        op: CompareOp,
        rhs: Expression,
    },
    /// `operation.attribute <op> rhs` without a `where` clause. Reserved:
    /// parsed, but evaluating it is unsupported.
    Compare {
        path: String,
        op: CompareOp,
        rhs: Expression,
    },
}

impl SpanCheck {
    /// Add a chained `.where(...)` filter to an existence check. Other
    /// checks are returned unchanged.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<WhereCondition>) -> Self {
        if let SpanCheck::Exists { filters, .. } = &mut self {
            filters.push(condition.into());
        }
        self
    }
}

/// Terms that can wrap a whole condition in parentheses or negate themselves.
pub trait Grouping: Sized {
    fn group(condition: Disjunction<Self>) -> Self;
    fn negate(self) -> Self;
}

impl Grouping for Term {
    fn group(condition: Condition) -> Self {
        Term::Grouped(condition)
    }

    fn negate(self) -> Self {
        Term::Not(Box::new(self))
    }
}

impl Grouping for WhereTerm {
    fn group(condition: WhereCondition) -> Self {
        WhereTerm::Grouped(condition)
    }

    fn negate(self) -> Self {
        WhereTerm::Not(Box::new(self))
    }
}

impl<T: Grouping> Disjunction<T> {
    /// A condition holding exactly one term.
    #[must_use]
    pub fn single(term: T) -> Self {
        Self {
            groups: vec![Conjunction { terms: vec![term] }],
        }
    }

    /// Collapse to a single term, grouping with parentheses when needed.
    fn into_term(mut self) -> T {
        if self.groups.len() == 1 && self.groups[0].terms.len() == 1 {
            if let Some(term) = self.groups.pop().and_then(|mut g| g.terms.pop()) {
                return term;
            }
        }
        T::group(self)
    }

    #[must_use]
    pub fn and(self, other: impl Into<Self>) -> Self {
        let other = other.into();
        let mut terms = Vec::new();
        for side in [self, other] {
            if side.groups.len() == 1 {
                terms.extend(side.groups.into_iter().flat_map(|g| g.terms));
            } else {
                terms.push(side.into_term());
            }
        }
        Self {
            groups: vec![Conjunction { terms }],
        }
    }

    #[must_use]
    pub fn or(mut self, other: impl Into<Self>) -> Self {
        self.groups.extend(other.into().groups);
        self
    }
}

impl<T: Grouping> Not for Disjunction<T> {
    type Output = Self;

    fn not(self) -> Self {
        Self::single(self.into_term().negate())
    }
}

impl From<Term> for Condition {
    fn from(term: Term) -> Self {
        Self::single(term)
    }
}

impl From<SpanCheck> for Condition {
    fn from(check: SpanCheck) -> Self {
        Self::single(Term::Check(check))
    }
}

impl From<WhereTerm> for WhereCondition {
    fn from(term: WhereTerm) -> Self {
        Self::single(term)
    }
}

impl From<WhereFilter> for WhereCondition {
    fn from(filter: WhereFilter) -> Self {
        Self::single(WhereTerm::Filter(filter))
    }
}

/// An existence check for spans named `operation`.
#[must_use]
pub fn span(operation: &str) -> SpanCheck {
    SpanCheck::Exists {
        operation: operation.to_owned(),
        filters: Vec::new(),
    }
}

/// Intermediate builder for count checks. Created by [`count()`].
#[derive(Debug, Clone)]
pub struct CountExpr {
    operation: String,
}

impl CountExpr {
    fn compare(self, op: CompareOp, rhs: impl Into<Expression>) -> SpanCheck {
        SpanCheck::Count {
            operation: self.operation,
            op,
            rhs: rhs.into(),
        }
    }

    #[must_use]
    pub fn eq(self, rhs: impl Into<Expression>) -> SpanCheck {
        self.compare(CompareOp::Eq, rhs)
    }

    #[must_use]
    pub fn neq(self, rhs: impl Into<Expression>) -> SpanCheck {
        self.compare(CompareOp::Neq, rhs)
    }

    #[must_use]
    pub fn lt(self, rhs: impl Into<Expression>) -> SpanCheck {
        self.compare(CompareOp::Lt, rhs)
    }

    #[must_use]
    pub fn lte(self, rhs: impl Into<Expression>) -> SpanCheck {
        self.compare(CompareOp::Lte, rhs)
    }

    #[must_use]
    pub fn gt(self, rhs: impl Into<Expression>) -> SpanCheck {
        self.compare(CompareOp::Gt, rhs)
    }

    #[must_use]
    pub fn gte(self, rhs: impl Into<Expression>) -> SpanCheck {
        self.compare(CompareOp::Gte, rhs)
    }
}

#[must_use]
pub fn count(operation: &str) -> CountExpr {
    CountExpr {
        operation: operation.to_owned(),
    }
}

impl From<CountExpr> for Expression {
    fn from(c: CountExpr) -> Self {
        Expression::Count(c.operation)
    }
}

// -- Rendering --------------------------------------------------------------

impl<T: fmt::Display> fmt::Display for Conjunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

impl<T: fmt::Display> fmt::Display for Disjunction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.groups.iter().enumerate() {
            if i > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `not not x` is not accepted by the grammar
            Term::Not(inner) if matches!(**inner, Term::Not(_)) => write!(f, "not ({inner})"),
            Term::Not(inner) => write!(f, "not {inner}"),
            Term::Grouped(cond) => write!(f, "({cond})"),
            Term::Check(check) => write!(f, "{check}"),
        }
    }
}

impl fmt::Display for WhereTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereTerm::Not(inner) if matches!(**inner, WhereTerm::Not(_)) => {
                write!(f, "not ({inner})")
            }
            WhereTerm::Not(inner) => write!(f, "not {inner}"),
            WhereTerm::Grouped(cond) => write!(f, "({cond})"),
            WhereTerm::Filter(filter) => write!(f, "{filter}"),
        }
    }
}

impl fmt::Display for SpanCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanCheck::Exists { operation, filters } => {
                f.write_str(operation)?;
                for filter in filters {
                    write!(f, ".where({filter})")?;
                }
                Ok(())
            }
            SpanCheck::Count { operation, op, rhs } => {
                write!(f, "count({operation}) {op} {rhs}")
            }
            SpanCheck::Compare { path, op, rhs } => write!(f, "{path} {op} {rhs}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{attr, flag};

    #[test]
    fn span_with_filters() {
        let check = span("payment")
            .filter(attr("amount").gt(1000_i64))
            .filter(flag("verified"));
        match &check {
            SpanCheck::Exists { operation, filters } => {
                assert_eq!(operation, "payment");
                assert_eq!(filters.len(), 2);
            }
            other => panic!("expected Exists, got {other:?}"),
        }
        assert_eq!(check.to_string(), "payment.where(amount > 1000).where(verified)");
    }

    #[test]
    fn filter_ignored_on_count() {
        let check = count("retry").gt(3_i64).filter(flag("x"));
        assert_eq!(check, count("retry").gt(3_i64));
    }

    #[test]
    fn and_flattens_single_groups() {
        let cond = Condition::from(span("a")).and(span("b")).and(span("c"));
        assert_eq!(cond.groups.len(), 1);
        assert_eq!(cond.groups[0].terms.len(), 3);
        assert_eq!(cond.to_string(), "a and b and c");
    }

    #[test]
    fn or_appends_groups() {
        let cond = Condition::from(span("a")).or(span("b"));
        assert_eq!(cond.groups.len(), 2);
        assert_eq!(cond.to_string(), "a or b");
    }

    #[test]
    fn and_groups_a_disjunction() {
        let cond = Condition::from(span("a"))
            .or(span("b"))
            .and(span("c"));
        assert_eq!(cond.to_string(), "(a or b) and c");
    }

    #[test]
    fn negation() {
        let cond = !Condition::from(span("bypass"));
        assert_eq!(cond, Condition::single(Term::Not(Box::new(Term::Check(span("bypass"))))));
        assert_eq!(cond.to_string(), "not bypass");

        let grouped = !Condition::from(span("a")).or(span("b"));
        assert_eq!(grouped.to_string(), "not (a or b)");
    }

    #[test]
    fn double_negation_renders_parenthesized() {
        let cond = !!Condition::from(span("a"));
        assert_eq!(cond.to_string(), "not (not a)");
    }

    #[test]
    fn where_condition_combinators() {
        let cond = WhereCondition::from(attr("amount").gt(100_i64))
            .or(flag("vip"))
            .and(!WhereCondition::from(flag("test")));
        assert_eq!(cond.to_string(), "(amount > 100 or vip) and not test");
    }

    #[test]
    fn count_builders() {
        assert_eq!(
            count("http_request").neq(count("http_response")).to_string(),
            "count(http_request) != count(http_response)"
        );
        assert_eq!(count("retry").gte(3_i64).to_string(), "count(retry) >= 3");
    }
}
