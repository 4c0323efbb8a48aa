//! A small rule language for invariants over distributed traces.
//!
//! A rule names the traces it applies to (`when`) and what those traces
//! must (`always`) or must not (`never`) contain:
//!
//! ```text
//! when   { payment.where(amount > 1000) }
//! always { fraud_check }
//! never  { bypass_validation }
//! ```
//!
//! Rules are parsed once with [`parse::parse`] (or [`str::parse`]) and then
//! evaluated any number of times, from any number of threads, with
//! [`evaluate`] or an [`Evaluator`]. Evaluation returns `Ok(true)` when the
//! trace violates the rule.
//!
//! ```
//! use trace_invariants::{Rule, Span, Trace, evaluate};
//!
//! let rule: Rule = "when { payment.where(amount > 1000) } always { fraud_check }"
//!     .parse()
//!     .unwrap();
//!
//! let trace = Trace::new()
//!     .with_span(Span::new("payment").with_attribute("amount", 5000))
//!     .with_span(Span::new("fraud_check"));
//! assert!(!evaluate(&rule, &trace).unwrap());
//! ```
//!
//! [`RuleEngine`] keeps a registry of named rules for hosts that evaluate a
//! whole rule set per trace.

mod engine;
mod error;
mod evaluate;
pub mod parse;
mod regex_cache;
mod types;

pub use engine::{
    CompiledRule, EngineError, EngineStats, Fingerprint, RuleDefinition, RuleEngine, RuleFailure,
    RuleOutcome, TraceReport,
};
pub use error::Error;
pub use evaluate::{Evaluator, evaluate};
pub use types::{
    AndGroup, AttrExpr, CompareOp, Condition, Conjunction, CountExpr, Disjunction, EvalError,
    EvaluationReport, Expression, Grouping, Limits, Rule, SemanticError, Span, SpanCheck,
    SpanStatus, Term, Trace, Value, WhereAndGroup, WhereCondition, WhereFilter, WhereTerm, attr,
    count, flag, ident, span,
};
