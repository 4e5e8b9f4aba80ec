use crate::config::PolicyConfig;
use crate::error::AnalysisError;
use crate::rules::RuleEvaluationResult;

use super::types::{DecisionBranch, RiskAssessment, RiskLevel};

/// Combines the rule score and the classifier probability into a verdict.
///
/// The classifier over-fires on ordinary transactional text (bank debits, OTP
/// deliveries), so it can only force a High verdict with some rule
/// corroboration. Heavy rule matches force High on their own.
#[derive(Debug, Clone)]
pub struct HybridDecisionEngine {
    policy: PolicyConfig,
}

impl HybridDecisionEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Reject messages too short for either signal to be trusted.
    pub fn check_context(&self, message: &str) -> Result<(), AnalysisError> {
        let tokens = message.split_whitespace().count();
        if tokens < self.policy.min_tokens {
            return Err(AnalysisError::InsufficientContext {
                tokens,
                required: self.policy.min_tokens,
            });
        }
        Ok(())
    }

    /// Apply the tiered policy. The first matching tier wins:
    /// AI override, then rule override, then the blended score.
    pub fn decide(
        &self,
        message: &str,
        rule_result: &RuleEvaluationResult,
        ml_probability: f64,
    ) -> Result<RiskAssessment, AnalysisError> {
        self.check_context(message)?;

        let p = &self.policy;
        let ml = sanitize_probability(ml_probability);
        let rule_score = rule_result.rule_score.clamp(0.0, 1.0);
        // Thresholds are compared at the precision the weight is reported with,
        // so 0.05 + 0.15 reaches a 0.20 floor.
        let weight = round_to(rule_result.triggered_weight, 2);

        let (branch, risk_level, final_score, reason) =
            if ml >= p.ai_override_probability && weight >= p.ai_override_min_weight {
                (
                    DecisionBranch::AiOverride,
                    RiskLevel::High,
                    ml.max(rule_score),
                    format!(
                        "High Risk AI Override: strong classifier signal corroborated by explicit rule triggers (Raw Wt: {:.2}).",
                        weight
                    ),
                )
            } else if weight >= p.rule_override_min_weight {
                (
                    DecisionBranch::RuleOverride,
                    RiskLevel::High,
                    rule_score,
                    format!(
                        "High Rule Override: explicit high-weight fraud indicators found (Raw Wt: {:.2}).",
                        weight
                    ),
                )
            } else {
                let blended = p.blend_ml_weight * ml + p.blend_rule_weight * rule_score;
                let (level, summary) = if blended < p.medium_threshold {
                    (RiskLevel::Low, "Hybrid calculation shows very low risk signals")
                } else if blended < p.high_threshold {
                    (
                        RiskLevel::Medium,
                        "Hybrid calculation detects a moderate blend of suspicious signals",
                    )
                } else {
                    (RiskLevel::High, "Hybrid calculation crossed the high-risk threshold")
                };
                (
                    DecisionBranch::Blended,
                    level,
                    blended,
                    format!("{} (Raw Wt: {:.2}).", summary, weight),
                )
            };

        Ok(RiskAssessment {
            risk_level,
            final_score: round_to(final_score.clamp(0.0, 1.0), 2),
            rule_score: round_to(rule_score, 2),
            ml_probability: round_to(ml, 4),
            triggered_weight: weight,
            recommendation: risk_level.recommendation().to_string(),
            decision_reason: reason,
            branch,
        })
    }
}

/// Out-of-contract probabilities are clamped; NaN counts as no signal.
fn sanitize_probability(p: f64) -> f64 {
    if p.is_nan() {
        tracing::warn!("Classifier probability was NaN, treating as 0.0");
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
