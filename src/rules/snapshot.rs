use std::ops::Deref;

use regex::Regex;

use super::evaluator::{compile_patterns, evaluate_compiled};
use super::types::{Rule, RuleEvaluationResult};

/// An immutable rule set with its patterns compiled up front.
///
/// Derefs to `[Rule]`, so it reads like the plain rule list.
#[derive(Debug, Default)]
pub struct RuleSnapshot {
    rules: Vec<Rule>,
    patterns: Vec<Vec<Regex>>,
}

impl RuleSnapshot {
    pub fn new(rules: Vec<Rule>) -> Self {
        let patterns = rules.iter().map(compile_patterns).collect();
        Self { rules, patterns }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of compiled regex matchers across all rules.
    pub fn pattern_count(&self) -> usize {
        self.patterns.iter().map(Vec::len).sum()
    }

    pub fn evaluate(&self, message: &str) -> RuleEvaluationResult {
        evaluate_compiled(message, &self.rules, &self.patterns)
    }
}

impl Deref for RuleSnapshot {
    type Target = [Rule];

    fn deref(&self) -> &[Rule] {
        &self.rules
    }
}
