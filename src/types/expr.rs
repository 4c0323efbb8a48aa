use std::fmt;

use super::value::Value;

/// Comparison operators supported in `where` filters and count checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Matches,
    Contains,
}

impl CompareOp {
    /// The operator that gives the same answer with its operands swapped.
    /// Only ordering and equality operators have one.
    #[must_use]
    pub fn mirrored(self) -> Option<CompareOp> {
        Some(match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Neq => CompareOp::Neq,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
            CompareOp::In | CompareOp::Matches | CompareOp::Contains => return None,
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "==",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::In => "in",
            CompareOp::Matches => "matches",
            CompareOp::Contains => "contains",
        })
    }
}

/// The right-hand side of any comparison: something that produces a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Value(Value),
    /// `count(operation)`, the number of spans with that operation name.
    Count(String),
    /// A dotted reference such as `payment.currency`. Parsed so rules can be
    /// written against it, but it has no evaluation semantics yet.
    Path(String),
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Expression::Value(value)
    }
}

impl From<i64> for Expression {
    fn from(v: i64) -> Self {
        Expression::Value(Value::Int(v))
    }
}

impl From<f64> for Expression {
    fn from(v: f64) -> Self {
        Expression::Value(Value::Float(v))
    }
}

impl From<bool> for Expression {
    fn from(v: bool) -> Self {
        Expression::Value(Value::Bool(v))
    }
}

impl From<&str> for Expression {
    fn from(v: &str) -> Self {
        Expression::Value(Value::String(v.to_owned()))
    }
}

impl From<String> for Expression {
    fn from(v: String) -> Self {
        Expression::Value(Value::String(v))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value(v) => write!(f, "{v}"),
            Expression::Count(op) => write!(f, "count({op})"),
            Expression::Path(path) => f.write_str(path),
        }
    }
}

/// An attribute-level predicate applied to a single span.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereFilter {
    Compare {
        attribute: String,
        op: CompareOp,
        rhs: Expression,
    },
    /// A bare attribute name, true when the attribute is present and truthy.
    Flag(String),
}

impl WhereFilter {
    #[must_use]
    pub fn attribute(&self) -> &str {
        match self {
            WhereFilter::Compare { attribute, .. } | WhereFilter::Flag(attribute) => attribute,
        }
    }
}

/// Attribute names that would not lex back as a single identifier are
/// rendered quoted.
fn write_attribute(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if crate::parse::is_plain_identifier(name) {
        f.write_str(name)
    } else {
        write!(f, "\"{name}\"")
    }
}

impl fmt::Display for WhereFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WhereFilter::Compare { attribute, op, rhs } => {
                write_attribute(f, attribute)?;
                write!(f, " {op} {rhs}")
            }
            WhereFilter::Flag(attribute) => write_attribute(f, attribute),
        }
    }
}

/// Intermediate builder for attribute comparisons.
/// Created by [`attr()`]; a comparison method produces the [`WhereFilter`].
#[derive(Debug, Clone)]
pub struct AttrExpr {
    name: String,
}

impl AttrExpr {
    fn compare(self, op: CompareOp, rhs: impl Into<Expression>) -> WhereFilter {
        WhereFilter::Compare {
            attribute: self.name,
            op,
            rhs: rhs.into(),
        }
    }

    #[must_use]
    pub fn eq(self, rhs: impl Into<Expression>) -> WhereFilter {
        self.compare(CompareOp::Eq, rhs)
    }

    #[must_use]
    pub fn neq(self, rhs: impl Into<Expression>) -> WhereFilter {
        self.compare(CompareOp::Neq, rhs)
    }

    #[must_use]
    pub fn lt(self, rhs: impl Into<Expression>) -> WhereFilter {
        self.compare(CompareOp::Lt, rhs)
    }

    #[must_use]
    pub fn lte(self, rhs: impl Into<Expression>) -> WhereFilter {
        self.compare(CompareOp::Lte, rhs)
    }

    #[must_use]
    pub fn gt(self, rhs: impl Into<Expression>) -> WhereFilter {
        self.compare(CompareOp::Gt, rhs)
    }

    #[must_use]
    pub fn gte(self, rhs: impl Into<Expression>) -> WhereFilter {
        self.compare(CompareOp::Gte, rhs)
    }

    #[must_use]
    pub fn is_in(self, items: impl Into<Value>) -> WhereFilter {
        self.compare(CompareOp::In, Expression::Value(items.into()))
    }

    #[must_use]
    pub fn matches(self, pattern: &str) -> WhereFilter {
        self.compare(CompareOp::Matches, pattern)
    }

    #[must_use]
    pub fn contains(self, needle: &str) -> WhereFilter {
        self.compare(CompareOp::Contains, needle)
    }
}

#[must_use]
pub fn attr(name: &str) -> AttrExpr {
    AttrExpr {
        name: name.to_owned(),
    }
}

#[must_use]
pub fn flag(name: &str) -> WhereFilter {
    WhereFilter::Flag(name.to_owned())
}

/// An enum-like identifier literal (`USD`, `premium`).
#[must_use]
pub fn ident(name: &str) -> Value {
    Value::Ident(name.to_owned())
}
