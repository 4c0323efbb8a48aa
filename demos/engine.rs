use trace_invariants::{RuleDefinition, RuleEngine, Span, Trace};

fn main() {
    let engine = RuleEngine::new();

    let definitions = [
        RuleDefinition::new(
            "fraud",
            "Large payments are fraud checked",
            "when { payment.where(amount > 1000) } always { fraud_check }",
        ),
        RuleDefinition::new(
            "orphans",
            "Requests get responses",
            "when { count(http_request) != count(http_response) } never { orphaned_request }",
        ),
        RuleDefinition::new("broken", "Missing brace", "when { payment "),
        RuleDefinition::new(
            "currency",
            "Amounts are numeric",
            "when { payment.where(amount < minimum) } always { review }",
        ),
    ];

    for definition in definitions {
        if let Err(e) = engine.load_rule(definition) {
            println!("load failed: {e}");
        }
    }

    println!("{:?}", engine.stats());
    for (id, error) in engine.parse_errors() {
        println!("parse error in {id}: {error}");
    }

    let trace = Trace::new()
        .with_span(Span::new("payment").with_attribute("amount", 5000))
        .with_span(Span::new("http_request"))
        .with_span(Span::new("http_request"))
        .with_span(Span::new("http_response"))
        .with_span(Span::new("orphaned_request"));

    let report = engine.evaluate_trace(&trace);
    println!("Violations: {:?}", report.violations);
    for failure in &report.errors {
        println!("Error in {}: {}", failure.rule_id, failure.error);
    }
}
