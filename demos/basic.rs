use trace_invariants::{Rule, Span, Trace, attr, evaluate, span};

fn main() {
    // Parse a rule from text...
    let parsed: Rule = "when { payment.where(amount > 1000) } always { fraud_check }"
        .parse()
        .expect("failed to parse rule");

    // ...or build the same rule in code
    let built = Rule::when(span("payment").filter(attr("amount").gt(1000_i64)))
        .always(span("fraud_check"));
    assert_eq!(parsed, built);

    println!("{parsed}");

    let trace = Trace::new()
        .with_span(Span::new("payment").with_attribute("amount", 5000))
        .with_span(Span::new("checkout"));

    match evaluate(&parsed, &trace) {
        Ok(true) => println!("Result: violated"),
        Ok(false) => println!("Result: satisfied"),
        Err(e) => println!("Result: error: {e}"),
    }
}
