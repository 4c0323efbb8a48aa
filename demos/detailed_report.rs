use trace_invariants::{Evaluator, Rule, Span, SpanStatus, Trace};

fn main() {
    let rule: Rule = r#"
        // large unverified payments need review, and are never auto-approved
        when { payment.where(amount > 10000 and customer_verified == false) }
        always { fraud_check and manual_review }
        never { auto_approve }
    "#
    .parse()
    .expect("failed to parse rule");

    let trace = Trace::new()
        .with_span(
            Span::new("payment")
                .with_service("checkout")
                .with_attribute("amount", 25_000)
                .with_attribute("customer_verified", false),
        )
        .with_span(Span::new("fraud_check").with_service("risk"))
        .with_span(
            Span::new("auto_approve")
                .with_service("checkout")
                .with_status(SpanStatus::Ok),
        );

    let evaluator = Evaluator::new();
    let report = evaluator
        .evaluate_detailed(&rule, &trace)
        .expect("failed to evaluate rule");

    println!("{report}");
    println!();
    println!("When matched: {}", report.when_matched());
    println!("Always held: {:?}", report.always_held());
    println!("Never matched: {:?}", report.never_matched());
    println!("Duration: {:?}", report.duration());
}
