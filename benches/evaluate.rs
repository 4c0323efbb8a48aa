use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trace_invariants::parse::parse;
use trace_invariants::{Evaluator, Rule, RuleDefinition, RuleEngine, Span, Trace};

const FRAUD: &str = "when { payment.where(amount > 1000) } always { fraud_check }";

const COMPLEX: &str = r#"when {
    payment.where(amount > 10000 and customer_verified == false)
    and (count(http_request) != count(http_response) or api_request.where(endpoint matches "^/api/v[0-9]+/admin"))
}
always { fraud_check and manual_review and risk_assessment }
never { auto_approve or skip_verification.where(tier in [gold, platinum]) }"#;

/// A trace of `n` spans, mostly noise, with one large unverified payment.
fn build_trace(n: usize) -> Trace {
    let mut trace = Trace::new().with_span(
        Span::new("payment")
            .with_attribute("amount", 25_000)
            .with_attribute("customer_verified", false),
    );
    for i in 0..n.saturating_sub(1) {
        let span = match i % 4 {
            0 => Span::new("http_request").with_attribute("endpoint", format!("/api/v1/items/{i}")),
            1 => Span::new("http_response").with_attribute("status", 200),
            2 => Span::new("db_query").with_attribute("duration_ms", i % 100),
            _ => Span::new("cache_lookup").with_attribute("hit", i % 3 == 0),
        };
        trace.push(span);
    }
    trace.push(Span::new("fraud_check"));
    trace
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_eval");
    let evaluator = Evaluator::new();

    for (name, source) in [("simple", FRAUD), ("complex", COMPLEX)] {
        let rule = parse(source).unwrap();
        for &n in &[10, 100, 1_000] {
            let trace = build_trace(n);
            group.bench_function(format!("{name}_{n}_spans"), |b| {
                b.iter(|| evaluator.evaluate(black_box(&rule), black_box(&trace)));
            });
        }
    }

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for (name, source) in [("simple", FRAUD), ("complex", COMPLEX)] {
        group.bench_function(name, |b| b.iter(|| parse(black_box(source)).unwrap()));
    }

    // parse-then-evaluate against evaluating a cached rule
    let trace = build_trace(100);
    let cached: Rule = COMPLEX.parse().unwrap();
    let evaluator = Evaluator::new();
    group.bench_function("parse_and_evaluate", |b| {
        b.iter(|| {
            let rule = parse(black_box(COMPLEX)).unwrap();
            evaluator.evaluate(&rule, &trace)
        });
    });
    group.bench_function("evaluate_cached", |b| {
        b.iter(|| evaluator.evaluate(black_box(&cached), &trace));
    });

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for &n in &[10, 100] {
        let engine = RuleEngine::new();
        for i in 0..n {
            let id = format!("rule-{i}");
            let source = if i % 2 == 0 { FRAUD } else { COMPLEX };
            engine
                .load_rule(RuleDefinition::new(&id, &id, source))
                .unwrap();
        }
        let trace = build_trace(100);
        group.bench_function(format!("{n}_rules"), |b| {
            b.iter(|| engine.evaluate_trace(black_box(&trace)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_parse, bench_engine);
criterion_main!(benches);
