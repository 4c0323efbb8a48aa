
use proptest::prelude::*;
use strategies::{
    OPERATIONS, arb_condition, arb_ordering, arb_rule, arb_trace, arb_where_condition,
};
use trace_invariants::{
    CompareOp, Condition, EvalError, Evaluator, Rule, SemanticError, SpanCheck, Trace,
    WhereCondition, count, evaluate, flag, span,
};

/// A rule that is violated exactly when `cond` holds for the trace.
fn holds(cond: impl Into<Condition>, trace: &Trace) -> bool {
    let cond = cond.into();
    evaluate(&Rule::when(cond.clone()).never(cond), trace).unwrap()
}

// ---------------------------------------------------------------------------
// Invariant 1: Round-trip
//
// Rendering a rule and parsing it back is idempotent, and never changes the
// verdict.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn render_parse_is_idempotent(rule in arb_rule()) {
        let first: Rule = rule.to_string().parse().unwrap();
        let second: Rule = first.to_string().parse().unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn reparsed_rule_has_same_verdict(rule in arb_rule(), trace in arb_trace()) {
        let reparsed: Rule = rule.to_string().parse().unwrap();
        prop_assert_eq!(evaluate(&rule, &trace), evaluate(&reparsed, &trace));
    }
}

// ---------------------------------------------------------------------------
// Invariant 2: Applicability gating
//
// When `when` does not hold, the rule is never violated.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn inapplicable_rules_never_violate(rule in arb_rule(), trace in arb_trace()) {
        let report = Evaluator::new().evaluate_detailed(&rule, &trace).unwrap();
        prop_assert_eq!(report.when_matched(), holds(rule.when.clone(), &trace));
        if !report.when_matched() {
            prop_assert!(!report.violated());
            prop_assert_eq!(report.always_held(), None);
            prop_assert_eq!(report.never_matched(), None);
        }
        prop_assert_eq!(evaluate(&rule, &trace), Ok(report.violated()));
    }
}

// ---------------------------------------------------------------------------
// Invariant 3: Always/never independence
//
// A rule with both clauses is violated exactly when the always-only or the
// never-only rule is; a rule with neither fails with a semantic error.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn clauses_are_independent(
        when in arb_condition(),
        always in arb_condition(),
        never in arb_condition(),
        trace in arb_trace(),
    ) {
        let both = Rule::when(when.clone()).always(always.clone()).never(never.clone());
        let always_only = Rule::when(when.clone()).always(always);
        let never_only = Rule::when(when.clone()).never(never);

        let expected = evaluate(&always_only, &trace).unwrap() || evaluate(&never_only, &trace).unwrap();
        prop_assert_eq!(evaluate(&both, &trace), Ok(expected));

        prop_assert_eq!(
            evaluate(&Rule::when(when), &trace),
            Err(EvalError::Semantic(SemanticError::MissingConstraint))
        );
    }
}

// ---------------------------------------------------------------------------
// Invariant 4: Count symmetry
//
// `count(a) OP count(b)` agrees with `count(b) MIRROR(OP) count(a)`.
// ---------------------------------------------------------------------------

fn count_check(a: &str, op: CompareOp, b: &str) -> SpanCheck {
    let lhs = count(a);
    match op {
        CompareOp::Eq => lhs.eq(count(b)),
        CompareOp::Neq => lhs.neq(count(b)),
        CompareOp::Lt => lhs.lt(count(b)),
        CompareOp::Lte => lhs.lte(count(b)),
        CompareOp::Gt => lhs.gt(count(b)),
        _ => lhs.gte(count(b)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn count_comparisons_are_symmetric(
        a in prop::sample::select(OPERATIONS),
        b in prop::sample::select(OPERATIONS),
        op in prop_oneof![arb_ordering(), Just(CompareOp::Eq), Just(CompareOp::Neq)],
        trace in arb_trace(),
    ) {
        let mirrored = op.mirrored().unwrap();
        prop_assert_eq!(
            holds(count_check(a, op, b), &trace),
            holds(count_check(b, mirrored, a), &trace)
        );
    }
}

// ---------------------------------------------------------------------------
// Invariant 5: Chained-where conjunction
//
// `op.where(x).where(y)` is the same check as `op.where(x and y)`.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn chained_where_is_conjunction(
        op in prop::sample::select(OPERATIONS),
        x in arb_where_condition(),
        y in arb_where_condition(),
        trace in arb_trace(),
    ) {
        let chained = span(op).filter(x.clone()).filter(y.clone());
        let combined = span(op).filter(x.and(y));
        prop_assert_eq!(holds(chained, &trace), holds(combined, &trace));
    }
}

// ---------------------------------------------------------------------------
// Invariant 6: Absent attributes
//
// A flag that no span carries is false, and its negation is true for every
// span of the operation.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn absent_flag_negation(op in prop::sample::select(OPERATIONS), trace in arb_trace()) {
        let present = trace.count(op) > 0;
        prop_assert!(!holds(span(op).filter(flag("ghost")), &trace));
        prop_assert_eq!(
            holds(span(op).filter(!WhereCondition::from(flag("ghost"))), &trace),
            present
        );
    }
}

// ---------------------------------------------------------------------------
// Invariant 7: Determinism
//
// Repeated evaluation, on shared or fresh evaluators, gives the same result.
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn evaluation_is_deterministic(rule in arb_rule(), trace in arb_trace()) {
        let first = evaluate(&rule, &trace);
        prop_assert!(first.is_ok());
        let evaluator = Evaluator::new();
        for _ in 0..3 {
            prop_assert_eq!(&evaluate(&rule, &trace), &first);
            prop_assert_eq!(&evaluator.evaluate(&rule, &trace), &first);
        }
    }
}
