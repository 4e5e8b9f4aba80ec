use regex::Regex;

use crate::error::MatcherEvaluationError;

use super::types::{build_pattern, Rule, RuleEvaluationResult};

/// Scan a message against a rule set.
///
/// Every enabled rule adds its weight to the normalization denominator whether
/// or not it fires. A fired rule contributes its weight once, no matter how many
/// of its matchers hit.
///
/// Patterns are compiled on every call. Long-lived rule sets should go through
/// [`RuleSnapshot`](super::RuleSnapshot), which compiles them once.
pub fn evaluate(message: &str, rules: &[Rule]) -> RuleEvaluationResult {
    let patterns: Vec<Vec<Regex>> = rules
        .iter()
        .map(|rule| {
            if rule.enabled {
                compile_patterns(rule)
            } else {
                Vec::new()
            }
        })
        .collect();
    evaluate_compiled(message, rules, &patterns)
}

/// Same as [`evaluate`], with `patterns[i]` holding the compiled matchers of `rules[i]`.
pub(crate) fn evaluate_compiled(
    message: &str,
    rules: &[Rule],
    patterns: &[Vec<Regex>],
) -> RuleEvaluationResult {
    let lowered = message.to_lowercase();

    let mut total_active_weight = 0.0;
    let mut result = RuleEvaluationResult::default();

    for (rule, compiled) in rules.iter().zip(patterns).filter(|(r, _)| r.enabled) {
        total_active_weight += rule.weight;

        let (fired, phrases) = if rule.is_regex {
            match_patterns(compiled, message)
        } else {
            match_keywords(rule, &lowered)
        };

        if !fired {
            continue;
        }

        result.triggered_weight += rule.weight;
        result.triggered_categories.push(rule.category.clone());
        result.explanations.push(rule.explanation.clone());
        result.matched_phrases.extend(phrases);

        tracing::debug!(
            rule_id = rule.id,
            category = %rule.category,
            weight = rule.weight,
            "Rule fired"
        );
    }

    result.rule_score = normalize(result.triggered_weight, total_active_weight);
    result
}

/// Compile a regex rule's matchers. Malformed patterns are reported and left
/// out, so they never match. Keyword rules yield nothing.
pub(crate) fn compile_patterns(rule: &Rule) -> Vec<Regex> {
    if !rule.is_regex {
        return Vec::new();
    }

    rule.matchers
        .iter()
        .filter_map(|pattern| match build_pattern(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                report_matcher_failure(MatcherEvaluationError {
                    rule_id: rule.id,
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                });
                None
            }
        })
        .collect()
}

/// Triggered weight as a fraction of the active total, clamped to [0, 1].
fn normalize(triggered_weight: f64, total_active_weight: f64) -> f64 {
    if total_active_weight > 0.0 {
        (triggered_weight / total_active_weight).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Case-insensitive substring containment. Records the keyword itself.
fn match_keywords(rule: &Rule, lowered_message: &str) -> (bool, Vec<String>) {
    let phrases: Vec<String> = rule
        .matchers
        .iter()
        .filter(|kw| !kw.trim().is_empty())
        .filter(|kw| lowered_message.contains(&kw.to_lowercase()))
        .cloned()
        .collect();

    (!phrases.is_empty(), phrases)
}

/// Search the message with each compiled pattern.
/// Records the first matching span, not the pattern.
fn match_patterns(patterns: &[Regex], message: &str) -> (bool, Vec<String>) {
    let mut fired = false;
    let mut phrases = Vec::new();

    for re in patterns {
        if let Some(m) = re.find(message) {
            fired = true;
            if !m.as_str().is_empty() {
                phrases.push(m.as_str().to_string());
            }
        }
    }

    (fired, phrases)
}

fn report_matcher_failure(err: MatcherEvaluationError) {
    tracing::warn!(
        rule_id = err.rule_id,
        pattern = %err.pattern,
        error = %err.reason,
        "Skipping malformed rule pattern"
    );
}
