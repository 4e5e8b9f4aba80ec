use serde::{Deserialize, Serialize};

/// The three-valued verdict shown to the end user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Fixed advisory text for this level.
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::Low => "Message appears safe, but always verify unknown senders or requests.",
            Self::Medium => {
                "Exercise caution. Do not share sensitive information or click unknown links."
            }
            Self::High => {
                "This message is likely fraudulent. Do NOT interact. Do not click links or share details."
            }
        }
    }
}

/// Which tier of the calibration policy produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionBranch {
    AiOverride,
    RuleOverride,
    Blended,
}

impl DecisionBranch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiOverride => "ai_override",
            Self::RuleOverride => "rule_override",
            Self::Blended => "blended",
        }
    }
}

/// The final verdict for one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    /// Rounded to 2 decimals.
    pub final_score: f64,
    /// Rounded to 2 decimals.
    pub rule_score: f64,
    /// Rounded to 4 decimals.
    pub ml_probability: f64,
    /// Rounded to 2 decimals.
    pub triggered_weight: f64,
    pub recommendation: String,
    pub decision_reason: String,
    pub branch: DecisionBranch,
}
