use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decision::RiskLevel;
use crate::error::FeedbackError;
use crate::sink::BoundedLog;

/// A user's verdict on an analysis they were shown.
///
/// Both labels deserialize only from `"Low"`, `"Medium"` or `"High"`.
#[derive(Debug, Clone, Deserialize)]
pub struct Feedback {
    pub message: String,
    pub predicted_risk: RiskLevel,
    pub user_correction: RiskLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackEntry {
    pub received_at: DateTime<Utc>,
    pub message: String,
    pub predicted_risk: RiskLevel,
    pub user_correction: RiskLevel,
    /// True when the user disagreed with the prediction.
    pub corrected: bool,
}

/// In-memory store of recent feedback, kept for review and later retraining.
pub struct FeedbackLog {
    log: BoundedLog<FeedbackEntry>,
}

impl FeedbackLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: BoundedLog::new(capacity),
        }
    }

    pub fn submit(&self, feedback: Feedback) -> Result<FeedbackEntry, FeedbackError> {
        if feedback.message.trim().is_empty() {
            return Err(FeedbackError::EmptyMessage);
        }

        let entry = FeedbackEntry {
            received_at: Utc::now(),
            corrected: feedback.predicted_risk != feedback.user_correction,
            message: feedback.message,
            predicted_risk: feedback.predicted_risk,
            user_correction: feedback.user_correction,
        };

        tracing::info!(
            predicted = entry.predicted_risk.as_str(),
            correction = entry.user_correction.as_str(),
            corrected = entry.corrected,
            "User feedback received"
        );

        self.log.push(entry.clone());
        Ok(entry)
    }

    /// Up to `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<FeedbackEntry> {
        self.log.recent(limit)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}
