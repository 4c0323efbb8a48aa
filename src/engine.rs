use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::parse::{CompileError, parse_with_limits};
use crate::{EvalError, EvaluationReport, Evaluator, Limits, Rule, Trace};

/// BLAKE3 digest of a rule expression, truncated to 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    #[must_use]
    pub fn of(expression: &str) -> Self {
        let hash = blake3::hash(expression.as_bytes());
        let mut bytes = [0_u8; 16];
        bytes.copy_from_slice(&hash.as_bytes()[..16]);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A rule as stored by a host: an identifier, a display name, the rule
/// text, and whether it takes part in evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleDefinition {
    pub id: String,
    pub name: String,
    pub expression: String,
    #[cfg_attr(feature = "serde", serde(default = "enabled_by_default"))]
    pub enabled: bool,
}

#[cfg(feature = "serde")]
fn enabled_by_default() -> bool {
    true
}

impl RuleDefinition {
    /// An enabled definition.
    #[must_use]
    pub fn new(id: &str, name: &str, expression: &str) -> Self {
        Self {
            id: id.to_owned(),
            name: name.to_owned(),
            expression: expression.to_owned(),
            enabled: true,
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A loaded definition together with its parsed rule and the outcome of
/// preparing it for evaluation.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    definition: RuleDefinition,
    rule: Rule,
    fingerprint: Fingerprint,
    prepared: Result<(), EvalError>,
}

impl CompiledRule {
    #[must_use]
    pub fn definition(&self) -> &RuleDefinition {
        &self.definition
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.definition.enabled
    }

    /// Why the rule cannot be evaluated, if it cannot. Reported for every
    /// trace the rule is run against.
    #[must_use]
    pub fn prepare_error(&self) -> Option<&EvalError> {
        self.prepared.as_ref().err()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("rule limit exceeded: {loaded}/{limit} rules loaded")]
    RuleLimitExceeded { loaded: usize, limit: usize },

    #[error("failed to compile rule '{id}': {source}")]
    Compile {
        id: String,
        #[source]
        source: CompileError,
    },

    #[error("no rule with id '{0}'")]
    UnknownRule(String),
}

/// A rule that failed while evaluating a trace.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFailure {
    pub rule_id: String,
    pub error: EvalError,
}

/// Result of running every enabled rule against one trace. Rule ids are in
/// ascending order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceReport {
    pub violations: Vec<String>,
    pub errors: Vec<RuleFailure>,
}

impl TraceReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.errors.is_empty()
    }
}

/// Per-rule outcome from [`RuleEngine::evaluate_detailed`].
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub rule_name: String,
    pub result: Result<EvaluationReport, EvalError>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    pub parse_errors: usize,
}

/// Thread-safe registry of compiled rules.
///
/// Rules are stored behind `Arc`, so a trace evaluation works on a snapshot
/// and never blocks concurrent loads or unloads.
///
/// # Example
///
/// ```
/// use trace_invariants::{RuleDefinition, RuleEngine, Span, Trace};
///
/// let engine = RuleEngine::new();
/// engine
///     .load_rule(RuleDefinition::new(
///         "fraud",
///         "Large payments are fraud checked",
///         "when { payment.where(amount > 1000) } always { fraud_check }",
///     ))
///     .unwrap();
///
/// let trace = Trace::new().with_span(Span::new("payment").with_attribute("amount", 5000));
/// let report = engine.evaluate_trace(&trace);
/// assert_eq!(report.violations, vec!["fraud".to_owned()]);
/// ```
#[derive(Debug, Default)]
pub struct RuleEngine {
    limits: Limits,
    evaluator: Evaluator,
    rules: DashMap<String, Arc<CompiledRule>>,
    parse_errors: DashMap<String, CompileError>,
}

impl RuleEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_limits(limits: Limits) -> Self {
        Self {
            evaluator: Evaluator::with_limits(limits),
            limits,
            rules: DashMap::new(),
            parse_errors: DashMap::new(),
        }
    }

    /// Check that `expression` parses, without loading it.
    ///
    /// # Errors
    ///
    /// Returns the [`CompileError`] describing the first problem.
    pub fn validate_expression(&self, expression: &str) -> Result<(), CompileError> {
        parse_with_limits(expression, &self.limits).map(|_| ())
    }

    /// Parse and store `definition`, replacing any rule with the same id.
    /// An unchanged expression is not parsed again.
    ///
    /// # Errors
    ///
    /// [`EngineError::RuleLimitExceeded`] when adding a new id would exceed
    /// [`Limits::max_rules`], and [`EngineError::Compile`] when the
    /// expression does not parse. Parse failures are also kept and reported
    /// by [`parse_errors`](Self::parse_errors) until the id is loaded
    /// successfully or unloaded.
    pub fn load_rule(&self, definition: RuleDefinition) -> Result<(), EngineError> {
        let id = definition.id.clone();
        let existing = self.rules.get(&id).map(|r| Arc::clone(r.value()));
        if existing.is_none() && self.rules.len() >= self.limits.max_rules {
            return Err(EngineError::RuleLimitExceeded {
                loaded: self.rules.len(),
                limit: self.limits.max_rules,
            });
        }

        let fingerprint = Fingerprint::of(&definition.expression);
        let rule = match existing {
            Some(current) if current.fingerprint == fingerprint => {
                debug!(rule_id = %id, %fingerprint, "expression unchanged, reusing parsed rule");
                current.rule.clone()
            }
            _ => match parse_with_limits(&definition.expression, &self.limits) {
                Ok(rule) => rule,
                Err(source) => {
                    warn!(rule_id = %id, error = %source, "rule failed to compile");
                    self.parse_errors.insert(id.clone(), source.clone());
                    return Err(EngineError::Compile { id, source });
                }
            },
        };

        let prepared = self.evaluator.prepare(&rule);
        if let Err(error) = &prepared {
            warn!(rule_id = %id, %error, "rule loaded but cannot be evaluated");
        }

        let compiled = CompiledRule {
            definition,
            rule,
            fingerprint,
            prepared,
        };
        let replaced = self.rules.insert(id.clone(), Arc::new(compiled)).is_some();
        self.parse_errors.remove(&id);
        debug!(rule_id = %id, %fingerprint, replaced, "rule loaded");
        Ok(())
    }

    /// Remove a rule and any recorded parse error for it. Returns whether a
    /// rule was loaded under `id`.
    pub fn unload_rule(&self, id: &str) -> bool {
        self.parse_errors.remove(id);
        let removed = self.rules.remove(id).is_some();
        if removed {
            debug!(rule_id = %id, "rule unloaded");
        }
        removed
    }

    /// Enable or disable a loaded rule without reparsing it.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownRule`] if no rule is loaded under `id`.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), EngineError> {
        let mut entry = self
            .rules
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownRule(id.to_owned()))?;
        let mut compiled = CompiledRule::clone(entry.value());
        compiled.definition.enabled = enabled;
        *entry.value_mut() = Arc::new(compiled);
        debug!(rule_id = %id, enabled, "rule toggled");
        Ok(())
    }

    #[must_use]
    pub fn get_rule(&self, id: &str) -> Option<Arc<CompiledRule>> {
        self.rules.get(id).map(|r| Arc::clone(r.value()))
    }

    /// All loaded rules, ordered by id.
    #[must_use]
    pub fn list_rules(&self) -> Vec<Arc<CompiledRule>> {
        let mut rules: Vec<_> = self.rules.iter().map(|r| Arc::clone(r.value())).collect();
        rules.sort_by(|a, b| a.id().cmp(b.id()));
        rules
    }

    /// Snapshot of the enabled rules, in map order.
    fn enabled_rules(&self) -> Vec<Arc<CompiledRule>> {
        self.rules
            .iter()
            .filter(|r| r.value().is_enabled())
            .map(|r| Arc::clone(r.value()))
            .collect()
    }

    fn evaluate_compiled(&self, compiled: &CompiledRule, trace: &Trace) -> Result<bool, EvalError> {
        compiled.prepared.clone()?;
        self.evaluator.evaluate_prepared(&compiled.rule, trace)
    }

    /// Evaluate every enabled rule against `trace`. A failing rule is
    /// reported in [`TraceReport::errors`] and does not stop the others.
    #[must_use]
    pub fn evaluate_trace(&self, trace: &Trace) -> TraceReport {
        let mut report = TraceReport::default();
        for compiled in self.enabled_rules() {
            match self.evaluate_compiled(&compiled, trace) {
                Ok(true) => report.violations.push(compiled.id().to_owned()),
                Ok(false) => {}
                Err(error) => {
                    warn!(rule_id = %compiled.id(), %error, "rule evaluation failed");
                    report.errors.push(RuleFailure {
                        rule_id: compiled.id().to_owned(),
                        error,
                    });
                }
            }
        }
        report.violations.sort_unstable();
        report.errors.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        debug!(
            spans = trace.len(),
            violations = report.violations.len(),
            errors = report.errors.len(),
            "trace evaluated"
        );
        report
    }

    /// Evaluate every enabled rule against `trace`, keeping each rule's
    /// full report or error.
    #[must_use]
    pub fn evaluate_detailed(&self, trace: &Trace) -> Vec<RuleOutcome> {
        let mut outcomes: Vec<_> = self
            .enabled_rules()
            .into_iter()
            .map(|compiled| RuleOutcome {
                rule_id: compiled.id().to_owned(),
                rule_name: compiled.definition.name.clone(),
                result: self.evaluator.evaluate_detailed(&compiled.rule, trace),
            })
            .collect();
        outcomes.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));
        outcomes
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let mut stats = EngineStats {
            parse_errors: self.parse_errors.len(),
            ..EngineStats::default()
        };
        for entry in &self.rules {
            stats.total_rules += 1;
            if entry.value().is_enabled() {
                stats.enabled_rules += 1;
            } else {
                stats.disabled_rules += 1;
            }
        }
        stats
    }

    /// Ids whose most recent load failed to compile, with the error, ordered
    /// by id.
    #[must_use]
    pub fn parse_errors(&self) -> Vec<(String, CompileError)> {
        let mut errors: Vec<_> = self
            .parse_errors
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        errors.sort_by(|a, b| a.0.cmp(&b.0));
        errors
    }
}
