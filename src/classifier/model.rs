use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::ClassifierError;

use super::ScamClassifier;

/// An exported logistic-regression model over lowercase word unigrams and
/// bigrams. Produced by the offline training job; only scored here.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearTextModel {
    pub bias: f64,
    pub weights: HashMap<String, f64>,
    #[serde(default = "default_true")]
    pub bigrams: bool,
}

fn default_true() -> bool {
    true
}

impl LinearTextModel {
    pub fn from_file(path: &Path) -> Result<Self, ClassifierError> {
        let load_err = |reason: String| ClassifierError::Load {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        let model: LinearTextModel =
            serde_json::from_str(&content).map_err(|e| load_err(e.to_string()))?;

        if !model.bias.is_finite() {
            return Err(load_err("bias is not finite".to_string()));
        }
        if let Some((token, _)) = model.weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(load_err(format!("weight for '{}' is not finite", token)));
        }
        Ok(model)
    }

    /// Probability that the message is a scam, rounded to 4 decimals.
    pub fn probability(&self, message: &str) -> f64 {
        let logit = self.bias
            + features(message, self.bigrams)
                .iter()
                .filter_map(|f| self.weights.get(f))
                .sum::<f64>();
        let p = 1.0 / (1.0 + (-logit).exp());
        ((p * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
    }
}

fn features(message: &str, bigrams: bool) -> Vec<String> {
    let words: Vec<String> = message
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect();

    let mut out = words.clone();
    if bigrams {
        out.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    }
    out
}

/// Lifecycle of the loaded model.
#[derive(Debug, Clone)]
pub enum ModelState {
    NotReady { reason: String },
    Ready(Arc<LinearTextModel>),
}

/// The classifier adapter: constructed once, shared by handle, and explicit
/// about whether a model is available.
pub struct ModelHandle {
    model_path: Option<PathBuf>,
    state: RwLock<ModelState>,
}

impl ModelHandle {
    /// A handle with nothing loaded yet.
    pub fn new(model_path: Option<PathBuf>) -> Self {
        let reason = match &model_path {
            Some(_) => "model not loaded yet".to_string(),
            None => "no model path configured".to_string(),
        };
        Self {
            model_path,
            state: RwLock::new(ModelState::NotReady { reason }),
        }
    }

    /// A handle that is ready from the start.
    pub fn with_model(model: LinearTextModel) -> Self {
        Self {
            model_path: None,
            state: RwLock::new(ModelState::Ready(Arc::new(model))),
        }
    }

    /// (Re)load the model from the configured path. On failure the handle
    /// drops to not-ready and keeps the reason.
    pub fn reload(&self) -> Result<(), ClassifierError> {
        let Some(path) = &self.model_path else {
            return Err(ClassifierError::NotReady(
                "no model path configured".to_string(),
            ));
        };

        match LinearTextModel::from_file(path) {
            Ok(model) => {
                tracing::info!(
                    path = %path.display(),
                    features = model.weights.len(),
                    "Classifier model loaded"
                );
                self.set_state(ModelState::Ready(Arc::new(model)));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Classifier model unavailable");
                self.set_state(ModelState::NotReady {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn state(&self) -> ModelState {
        match self.state.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), ModelState::Ready(_))
    }

    fn set_state(&self, state: ModelState) {
        match self.state.write() {
            Ok(mut guard) => *guard = state,
            Err(poisoned) => *poisoned.into_inner() = state,
        }
    }
}

impl ScamClassifier for ModelHandle {
    fn probability(&self, message: &str) -> Result<f64, ClassifierError> {
        match self.state() {
            ModelState::Ready(model) => Ok(model.probability(message)),
            ModelState::NotReady { reason } => Err(ClassifierError::NotReady(reason)),
        }
    }

    fn is_ready(&self) -> bool {
        ModelHandle::is_ready(self)
    }
}
