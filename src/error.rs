use thiserror::Error;

/// Failures an analysis request can surface to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error(
        "Insufficient context for reliable analysis: message has {tokens} word(s), at least {required} required"
    )]
    InsufficientContext { tokens: usize, required: usize },
}

/// Rejected user feedback submissions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackError {
    #[error("Feedback message cannot be empty")]
    EmptyMessage,
}

/// A single pattern matcher that could not be evaluated.
/// Only ever logged; the matcher counts as a non-match.
#[derive(Debug, Clone, Error)]
#[error("Pattern '{pattern}' in rule {rule_id} could not be evaluated: {reason}")]
pub struct MatcherEvaluationError {
    pub rule_id: i64,
    pub pattern: String,
    pub reason: String,
}

/// Rule-set validation and storage failures.
#[derive(Debug, Error)]
pub enum RuleSetError {
    #[error("Rule {0} not found")]
    NotFound(i64),

    #[error("Duplicate rule id {0}")]
    DuplicateId(i64),

    #[error("Invalid rule '{category}': {reason}")]
    Invalid { category: String, reason: String },

    #[error("Failed to access rule file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rule file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Classifier adapter failures. Never reach the decision engine: the analyzer
/// degrades them to a zero probability.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Classifier not ready: {0}")]
    NotReady(String),

    #[error("Failed to load model '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error("Prediction failed: {0}")]
    Prediction(String),
}
