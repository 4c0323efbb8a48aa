//! Seeded rule generator: well-formed, malformed and adversarial rule text.
//! The same seed always yields the same sequence of rules.

use proptest::prelude::{Rng as _, RngCore as _};
use proptest::test_runner::{RngAlgorithm, TestRng};
use trace_invariants::parse::{CompileError, parse};
use trace_invariants::{Span, Trace, evaluate};

const OPERATIONS: &[&str] = &[
    "payment",
    "fraud_check",
    "approved",
    "customer",
    "transaction",
    "auth",
    "db_query",
    "cache_lookup",
    "api_call",
    "validation",
    "audit_log",
    "encryption",
    "session",
    "order",
    "invoice",
    "http.request",
];

const ATTRIBUTES: &[&str] = &[
    "amount",
    "currency",
    "status",
    "verified",
    "user_id",
    "duration_ms",
    "region",
    "tier",
    "http.status_code",
    "retries",
];

const COMPARISONS: &[&str] = &["==", "!=", "<", "<=", ">", ">="];

const BAD_RULES: &[&str] = &[
    "when payment always fraud_check",
    "always { fraud_check }",
    "when { payment.amount >> 1000 } always { fraud_check }",
    "when { payment always { fraud_check }",
    "when { payment.where } always { fraud_check }",
    "when { payment.amount > } always { fraud_check }",
    "when { payment.123invalid } always { fraud_check }",
    "when { not not payment } always { fraud_check }",
    "when { } always { fraud_check }",
    "when { count() > 5 } always { fraud_check }",
    "when { count(payment > 5 } always { fraud_check }",
    "when { payment && fraud_check } always { approved }",
    "when { payment.where(currency == U S D) } always { fraud_check }",
    "when { payment and } always { fraud_check }",
    "when { (payment } always { fraud_check }",
    "when { payment) } always { fraud_check }",
    "when { payment.where(amount > 1000 } always { fraud_check }",
    "when { payment.where amount > 1000) } always { fraud_check }",
    "when { payment } always { a } always { b }",
    "when { payment.where(tier in [gold,]) } always { a }",
    "when { payment.where(note == \"unterminated) } always { a }",
    "when { count(a) > 5",
    "",
];

struct RuleFuzzer {
    rng: TestRng,
}

impl RuleFuzzer {
    fn new(seed: u8) -> Self {
        Self {
            rng: TestRng::from_seed(RngAlgorithm::ChaCha, &[seed; 32]),
        }
    }

    fn below(&mut self, n: usize) -> usize {
        (self.rng.next_u64() % n as u64) as usize
    }

    fn chance(&mut self, percent: usize) -> bool {
        self.below(100) < percent
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }

    fn operation(&mut self) -> &'static str {
        self.pick(OPERATIONS)
    }

    fn attribute(&mut self) -> String {
        let name = self.pick(ATTRIBUTES);
        if self.chance(10) {
            format!("\"{name}\"")
        } else {
            name.to_owned()
        }
    }

    fn value(&mut self) -> String {
        match self.below(6) {
            0 => self.below(100_000).to_string(),
            1 => format!("{}.{}", self.below(1000), self.below(100)),
            2 => format!("\"{}\"", self.pick(&["USD", "active", "", "O'Brien", "; DROP TABLE x"])),
            3 => self.pick(&["true", "false"]).to_owned(),
            4 => self.pick(&["USD", "EUR", "gold", "premium"]).to_owned(),
            _ => format!("[{}, {}]", self.below(10), self.pick(&["gold", "\"silver\""])),
        }
    }

    fn filter(&mut self) -> String {
        match self.below(6) {
            0 => self.attribute(),
            1 => format!("not {}", self.attribute()),
            2 => format!("{} matches \"^{}\"", self.attribute(), self.pick(&["/api", "[a-z]+", "v[0-9]"])),
            3 => format!("{} contains \"{}\"", self.attribute(), self.pick(&["err", "admin"])),
            4 => format!("{} in [{}, {}]", self.attribute(), self.value(), self.value()),
            _ => {
                let op = self.pick(COMPARISONS);
                format!("{} {op} {}", self.attribute(), self.value())
            }
        }
    }

    fn where_condition(&mut self) -> String {
        match self.below(4) {
            0 => format!("{} and {}", self.filter(), self.filter()),
            1 => format!("{} or {}", self.filter(), self.filter()),
            2 => format!("({} or {}) and not ({})", self.filter(), self.filter(), self.filter()),
            _ => self.filter(),
        }
    }

    fn count_operand(&mut self) -> String {
        match self.below(3) {
            0 => format!("count({})", self.operation()),
            1 => format!("trace.count({})", self.operation()),
            _ => self.below(10).to_string(),
        }
    }

    fn span_check(&mut self) -> String {
        match self.below(7) {
            0 => self.operation().to_owned(),
            1 => format!("{}.where({})", self.operation(), self.where_condition()),
            2 => format!(
                "{}.where({}).where({})",
                self.operation(),
                self.filter(),
                self.filter()
            ),
            3 => format!("trace.has({})", self.operation()),
            4 => {
                let op = self.pick(COMPARISONS);
                format!("count({}) {op} {}", self.operation(), self.count_operand())
            }
            5 => {
                let op = self.pick(COMPARISONS);
                format!("trace.count({}) {op} {}", self.operation(), self.count_operand())
            }
            _ => {
                let op = self.pick(COMPARISONS);
                format!("{}.{} {op} {}", self.operation(), self.pick(ATTRIBUTES), self.value())
            }
        }
    }

    fn condition(&mut self, depth: usize) -> String {
        if depth == 0 {
            return self.span_check();
        }
        match self.below(6) {
            0 => self.span_check(),
            1 => format!("{} and {}", self.span_check(), self.condition(depth - 1)),
            2 => format!("{} or {}", self.span_check(), self.condition(depth - 1)),
            3 => format!("not {}", self.span_check()),
            4 => format!("({})", self.condition(depth - 1)),
            _ => format!(
                "{} and ({} or {})",
                self.span_check(),
                self.span_check(),
                self.span_check()
            ),
        }
    }

    fn next_good(&mut self) -> String {
        let mut rule = format!("when {{ {} }}", self.condition(2));
        let always = self.chance(70);
        let never = self.chance(50);
        let mut clauses = Vec::new();
        if always {
            clauses.push(format!("always {{ {} }}", self.condition(2)));
        }
        if never {
            clauses.push(format!("never {{ {} }}", self.condition(1)));
        }
        if self.chance(30) {
            clauses.reverse();
        }
        for clause in clauses {
            rule.push(if self.chance(50) { '\n' } else { ' ' });
            rule.push_str(&clause);
        }
        if self.chance(10) {
            rule.insert_str(0, "// generated\n");
        }
        rule
    }

    fn next_bad(&mut self) -> String {
        self.pick(BAD_RULES).to_owned()
    }

    fn next_malicious(&mut self) -> String {
        match self.below(10) {
            0 => format!("when {{ {} }} always {{ a }}", "x".repeat(10_000 + self.below(10_000))),
            1 => format!(
                "when {{ a.where(b == \"{}\") }} always {{ c }}",
                "y".repeat(50_000)
            ),
            2 => {
                let depth = 10 + self.below(2_000);
                format!("when {{ {}a{} }} always {{ b }}", "(".repeat(depth), ")".repeat(depth))
            }
            3 => format!("when {{ {} }} always {{ b }}", "(".repeat(5_000)),
            4 => "when { pay\0ment } always { b }".to_owned(),
            5 => "when { 支払い.where(金額 > 1000) } always { 検証 }".to_owned(),
            6 => format!("when {{ a }} always {{ {} }}", "b and ".repeat(2_000) + "c"),
            7 => format!("when {{ count(a) > {} }} always {{ b }}", "9".repeat(400)),
            8 => "when { a.where(x matches \"(a+)+$\") } always { \u{202e}b }".to_owned(),
            _ => {
                let bytes: Vec<u8> = (0..64).map(|_| (self.rng.next_u32() & 0xff) as u8).collect();
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }
}

fn sample_trace() -> Trace {
    Trace::new()
        .with_span(
            Span::new("payment")
                .with_attribute("amount", 1500)
                .with_attribute("currency", "USD")
                .with_attribute("verified", true),
        )
        .with_span(Span::new("fraud_check").with_attribute("status", "active"))
        .with_span(Span::new("http.request").with_attribute("http.status_code", 503))
        .with_span(Span::new("db_query").with_attribute("duration_ms", "12.5"))
}

#[test]
fn generator_is_deterministic() {
    let mut a = RuleFuzzer::new(42);
    let mut b = RuleFuzzer::new(42);
    for _ in 0..1_000 {
        assert_eq!(a.next_good(), b.next_good());
        assert_eq!(a.next_bad(), b.next_bad());
        assert_eq!(a.next_malicious(), b.next_malicious());
    }
}

#[test]
fn seeds_produce_different_rules() {
    let mut a = RuleFuzzer::new(1);
    let mut b = RuleFuzzer::new(2);
    let first: Vec<_> = (0..20).map(|_| a.next_good()).collect();
    let second: Vec<_> = (0..20).map(|_| b.next_good()).collect();
    assert_ne!(first, second);
}

#[test]
fn well_formed_rules_parse() {
    let mut fuzzer = RuleFuzzer::new(7);
    let trace = sample_trace();
    for _ in 0..10_000 {
        let source = fuzzer.next_good();
        let rule = match parse(&source) {
            Ok(rule) => rule,
            Err(e) => panic!("generated rule failed to parse: {e}\n{source}"),
        };
        let reparsed = parse(&rule.to_string()).unwrap();
        assert_eq!(rule, reparsed, "{source}");
        // typed errors are acceptable here, panics are not
        let _ = evaluate(&rule, &trace);
    }
}

#[test]
fn malformed_rules_are_rejected() {
    let mut fuzzer = RuleFuzzer::new(11);
    for _ in 0..5_000 {
        let source = fuzzer.next_bad();
        assert!(parse(&source).is_err(), "accepted: {source}");
    }
}

#[test]
fn adversarial_inputs_do_not_panic() {
    let mut fuzzer = RuleFuzzer::new(13);
    let trace = sample_trace();
    let mut rejected = 0;
    for _ in 0..5_000 {
        let source = fuzzer.next_malicious();
        match parse(&source) {
            Ok(rule) => {
                let _ = evaluate(&rule, &trace);
            }
            Err(CompileError::Lex(_) | CompileError::Parse(_)) => rejected += 1,
        }
    }
    assert!(rejected > 0);
}

#[test]
fn mixed_stream() {
    let mut fuzzer = RuleFuzzer::new(99);
    let (mut ok, mut err) = (0, 0);
    for i in 0..20_000 {
        let source = match i % 10 {
            0..=6 => fuzzer.next_good(),
            7 | 8 => fuzzer.next_bad(),
            _ => fuzzer.next_malicious(),
        };
        if parse(&source).is_ok() {
            ok += 1;
        } else {
            err += 1;
        }
    }
    assert!(ok >= 14_000);
    assert!(err >= 4_000);
}
