use std::sync::Arc;
use std::thread;

use trace_invariants::{Evaluator, Rule, Span, Trace};

fn main() {
    let rule: Arc<Rule> = Arc::new(
        "when { payment.where(amount > 1000) } always { fraud_check }"
            .parse()
            .expect("failed to parse rule"),
    );
    let evaluator = Arc::new(Evaluator::new());

    let handles: Vec<_> = (0..4_i64)
        .map(|i| {
            let rule = Arc::clone(&rule);
            let evaluator = Arc::clone(&evaluator);
            thread::spawn(move || {
                let mut trace = Trace::new().with_span(Span::new("payment").with_attribute("amount", i * 600));
                if i % 2 == 0 {
                    trace.push(Span::new("fraud_check"));
                }
                let verdict = evaluator.evaluate(&rule, &trace);
                (i, verdict)
            })
        })
        .collect();

    for handle in handles {
        let (i, verdict) = handle.join().expect("thread panicked");
        println!("Thread {i}: {verdict:?}");
    }
}
