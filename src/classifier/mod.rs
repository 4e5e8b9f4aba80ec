pub mod model;

use serde::Serialize;

use crate::error::ClassifierError;

pub use model::{LinearTextModel, ModelHandle, ModelState};

/// Anything that can estimate the probability a message is fraudulent.
pub trait ScamClassifier: Send + Sync {
    /// A probability in [0, 1].
    fn probability(&self, message: &str) -> Result<f64, ClassifierError>;

    fn is_ready(&self) -> bool {
        true
    }
}

/// Always returns the same probability.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbability(pub f64);

impl ScamClassifier for FixedProbability {
    fn probability(&self, _message: &str) -> Result<f64, ClassifierError> {
        Ok(self.0)
    }
}

/// How the ML probability on a report was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierStatus {
    Scored,
    /// No model loaded; probability degraded to 0.0.
    NotReady,
    /// Prediction errored or panicked; probability degraded to 0.0.
    Failed,
    /// Prediction exceeded the configured timeout; probability degraded to 0.0.
    TimedOut,
}

impl ClassifierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scored => "scored",
            Self::NotReady => "not_ready",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}
