mod condition;
mod error;
mod evaluation_report;
mod expr;
mod limits;
mod rule;
mod trace;
mod value;

pub use condition::{
    AndGroup, Condition, Conjunction, CountExpr, Disjunction, Grouping, SpanCheck, Term,
    WhereAndGroup, WhereCondition, WhereTerm, count, span,
};
pub use error::{EvalError, SemanticError};
pub use evaluation_report::EvaluationReport;
pub use expr::{AttrExpr, CompareOp, Expression, WhereFilter, attr, flag, ident};
pub use limits::Limits;
pub use rule::Rule;
pub use trace::{Span, SpanStatus, Trace};
pub use value::Value;

pub(crate) use value::parse_number;
