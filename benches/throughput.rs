use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use trace_invariants::{Evaluator, Rule, Span, Trace};

fn build_shared() -> (Arc<Rule>, Arc<Trace>) {
    let rule: Rule = r#"when { payment.where(amount > 1000 and currency in [USD, EUR]) and count(retry) < 3 }
always { fraud_check }
never { bypass.where(reason matches "^manual") }"#
        .parse()
        .unwrap();

    let mut trace = Trace::new();
    for i in 0..200 {
        trace.push(
            Span::new("payment")
                .with_attribute("amount", i * 10)
                .with_attribute("currency", if i % 2 == 0 { "USD" } else { "GBP" }),
        );
    }
    trace.push(Span::new("fraud_check"));
    trace.push(Span::new("bypass").with_attribute("reason", "automatic"));

    (Arc::new(rule), Arc::new(trace))
}

fn bench_throughput(c: &mut Criterion) {
    let thread_counts = [1, 2, 4, 8];

    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(5));

    for &threads in &thread_counts {
        let (rule, trace) = build_shared();
        let evaluator = Arc::new(Evaluator::new());

        group.bench_function(format!("{threads}_threads"), |b| {
            b.iter_custom(|iters| {
                let per_thread = iters / threads as u64;
                let handles: Vec<_> = (0..threads)
                    .map(|_| {
                        let (r, t, e) = (Arc::clone(&rule), Arc::clone(&trace), Arc::clone(&evaluator));
                        thread::spawn(move || {
                            let start = Instant::now();
                            for _ in 0..per_thread {
                                let _ = e.evaluate(&r, &t);
                            }
                            start.elapsed()
                        })
                    })
                    .collect();

                let mut max_elapsed = Duration::ZERO;
                for h in handles {
                    let elapsed = h.join().unwrap();
                    if elapsed > max_elapsed {
                        max_elapsed = elapsed;
                    }
                }
                max_elapsed
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_throughput);
criterion_main!(benches);
