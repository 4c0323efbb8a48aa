/// Resource bounds applied while compiling and evaluating rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Limits {
    /// Largest rule source accepted by the lexer, in bytes.
    pub max_source_bytes: usize,
    /// Deepest nesting of `(`, `[` and `{` accepted by the parser.
    pub max_nesting_depth: usize,
    /// Compiled size limit for `matches` patterns, in bytes.
    pub max_regex_bytes: usize,
    /// Most rules a [`RuleEngine`](crate::RuleEngine) will hold.
    pub max_rules: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_source_bytes: 1024 * 1024,
            max_nesting_depth: 32,
            max_regex_bytes: 1024 * 1024,
            max_rules: 100_000,
        }
    }
}

impl Limits {
    #[must_use]
    pub fn with_max_source_bytes(mut self, bytes: usize) -> Self {
        self.max_source_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_regex_bytes(mut self, bytes: usize) -> Self {
        self.max_regex_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_max_rules(mut self, rules: usize) -> Self {
        self.max_rules = rules;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = Limits::default();
        assert_eq!(limits.max_source_bytes, 1_048_576);
        assert_eq!(limits.max_nesting_depth, 32);
        assert_eq!(limits.max_rules, 100_000);
    }

    #[test]
    fn setters_chain() {
        let limits = Limits::default()
            .with_max_source_bytes(10)
            .with_max_nesting_depth(2)
            .with_max_regex_bytes(64)
            .with_max_rules(1);
        assert_eq!(
            limits,
            Limits {
                max_source_bytes: 10,
                max_nesting_depth: 2,
                max_regex_bytes: 64,
                max_rules: 1,
            }
        );
    }
}
