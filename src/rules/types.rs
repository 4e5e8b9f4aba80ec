use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::RuleSetError;

/// An operator-defined, weighted fraud signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    pub category: String,
    pub weight: f64,
    /// Literal keywords, or case-insensitive patterns when `is_regex` is set.
    #[serde(rename = "keywords")]
    pub matchers: Vec<String>,
    pub explanation: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub is_regex: bool,
}

fn default_true() -> bool {
    true
}

/// Matcher patterns are always case-insensitive.
pub(crate) fn build_pattern(pattern: &str) -> Result<regex::Regex, regex::Error> {
    regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
}

impl Rule {
    /// Reject configurations the evaluator must never see.
    pub fn validate(&self) -> Result<(), RuleSetError> {
        let invalid = |reason: String| RuleSetError::Invalid {
            category: self.category.clone(),
            reason,
        };

        if self.category.trim().is_empty() {
            return Err(invalid("category must not be empty".to_string()));
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(invalid(format!(
                "weight must be a finite non-negative number, got {}",
                self.weight
            )));
        }
        for matcher in &self.matchers {
            if matcher.trim().is_empty() {
                return Err(invalid("keywords must not contain blank entries".to_string()));
            }
            if self.is_regex {
                if let Err(e) = build_pattern(matcher) {
                    return Err(invalid(format!("pattern '{}' does not compile: {}", matcher, e)));
                }
            }
        }
        Ok(())
    }
}

/// A rule as submitted by an operator, before an id is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRule {
    pub category: String,
    pub weight: f64,
    pub keywords: Vec<String>,
    pub explanation: String,
    #[serde(default)]
    pub is_regex: bool,
}

impl NewRule {
    pub fn into_rule(self, id: i64) -> Rule {
        Rule {
            id,
            category: self.category,
            weight: self.weight,
            matchers: self.keywords,
            explanation: self.explanation,
            enabled: true,
            is_regex: self.is_regex,
        }
    }
}

/// Output of one evaluation pass. Scores keep full precision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleEvaluationResult {
    pub rule_score: f64,
    pub triggered_weight: f64,
    pub triggered_categories: Vec<String>,
    /// Serialized in sorted order.
    pub matched_phrases: BTreeSet<String>,
    pub explanations: Vec<String>,
}

impl RuleEvaluationResult {
    pub fn fired(&self) -> bool {
        !self.triggered_categories.is_empty()
    }

    /// Matched phrases in a deterministic (sorted) order.
    pub fn sorted_phrases(&self) -> Vec<String> {
        self.matched_phrases.iter().cloned().collect()
    }
}
