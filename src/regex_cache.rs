use std::sync::Arc;

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};
use tracing::trace;

use crate::EvalError;

/// Compiled `matches` patterns keyed by their source text. Shared by every
/// evaluation running on the owning [`Evaluator`](crate::Evaluator); entries
/// are only ever added and are shared behind `Arc`.
#[derive(Debug, Default)]
pub(crate) struct RegexCache {
    patterns: DashMap<String, Arc<Regex>>,
}

impl RegexCache {
    pub(crate) fn get_or_compile(&self, pattern: &str, size_limit: usize) -> Result<Arc<Regex>, EvalError> {
        if let Some(regex) = self.patterns.get(pattern) {
            return Ok(Arc::clone(regex.value()));
        }

        let regex = RegexBuilder::new(pattern)
            .size_limit(size_limit)
            .build()
            .map_err(|e| EvalError::InvalidRegex {
                pattern: pattern.to_owned(),
                reason: e.to_string(),
            })
            .map(Arc::new)?;
        trace!(pattern, "compiled regex");

        Ok(self
            .patterns
            .entry(pattern.to_owned())
            .or_insert(regex)
            .value()
            .clone())
    }

    pub(crate) fn len(&self) -> usize {
        self.patterns.len()
    }
}
