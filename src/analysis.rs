use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::classifier::{ClassifierStatus, ScamClassifier};
use crate::decision::{HybridDecisionEngine, RiskAssessment};
use crate::error::{AnalysisError, ClassifierError};
use crate::rules::RuleStore;
use crate::sink::{AnalysisRecord, ResultSink};

/// Everything returned for one analyzed message.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub triggered_rules: Vec<String>,
    pub matched_phrases: Vec<String>,
    pub explanations: Vec<String>,
    pub classifier_status: ClassifierStatus,
    pub processing_time_sec: f64,
    pub analyzed_at: DateTime<Utc>,
}

/// Orchestrates one analysis:
/// 1. Context check (before any sub-engine runs)
/// 2. Rule evaluation against a rule-set snapshot
/// 3. Classifier probability, degraded to 0.0 on failure or timeout
/// 4. Hybrid decision
/// 5. Result sinks
pub struct Analyzer {
    rule_store: Arc<RuleStore>,
    classifier: Arc<dyn ScamClassifier>,
    engine: HybridDecisionEngine,
    classifier_timeout: Duration,
    sinks: Vec<Arc<dyn ResultSink>>,
}

impl Analyzer {
    pub fn new(
        rule_store: Arc<RuleStore>,
        classifier: Arc<dyn ScamClassifier>,
        engine: HybridDecisionEngine,
        classifier_timeout: Duration,
    ) -> Self {
        Self {
            rule_store,
            classifier,
            engine,
            classifier_timeout,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn rule_store(&self) -> &Arc<RuleStore> {
        &self.rule_store
    }

    pub fn classifier_ready(&self) -> bool {
        self.classifier.is_ready()
    }

    pub async fn analyze(&self, message: &str) -> Result<AnalysisReport, AnalysisError> {
        let started = Instant::now();

        if message.trim().is_empty() {
            return Err(AnalysisError::EmptyMessage);
        }
        self.engine.check_context(message)?;

        let rule_result = self.rule_store.snapshot().evaluate(message);

        let (ml_probability, classifier_status) = self.score(message).await;

        let assessment = self.engine.decide(message, &rule_result, ml_probability)?;

        let processing_time_sec =
            (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;

        let report = AnalysisReport {
            matched_phrases: rule_result.sorted_phrases(),
            triggered_rules: rule_result.triggered_categories,
            explanations: rule_result.explanations,
            assessment,
            classifier_status,
            processing_time_sec,
            analyzed_at: Utc::now(),
        };

        if !self.sinks.is_empty() {
            let record = AnalysisRecord {
                analyzed_at: report.analyzed_at,
                message: message.to_string(),
                risk_level: report.assessment.risk_level,
                final_score: report.assessment.final_score,
                rule_score: report.assessment.rule_score,
                ml_probability: report.assessment.ml_probability,
                triggered_rules: report.triggered_rules.clone(),
                classifier_status,
                processing_time_sec,
            };
            for sink in &self.sinks {
                sink.record(&record);
            }
        }

        Ok(report)
    }

    /// Run the classifier off the async workers, bounded by the timeout.
    /// Never retried; any failure degrades to 0.0.
    async fn score(&self, message: &str) -> (f64, ClassifierStatus) {
        if !self.classifier.is_ready() {
            tracing::warn!("Classifier not ready, using 0.0 probability");
            return (0.0, ClassifierStatus::NotReady);
        }

        let classifier = Arc::clone(&self.classifier);
        let owned = message.to_string();
        let task = tokio::task::spawn_blocking(move || classifier.probability(&owned));

        match tokio::time::timeout(self.classifier_timeout, task).await {
            Ok(Ok(Ok(p))) => (p, ClassifierStatus::Scored),
            Ok(Ok(Err(ClassifierError::NotReady(reason)))) => {
                tracing::warn!(%reason, "Classifier not ready, using 0.0 probability");
                (0.0, ClassifierStatus::NotReady)
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Classifier failed, using 0.0 probability");
                (0.0, ClassifierStatus::Failed)
            }
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "Classifier task aborted, using 0.0 probability");
                (0.0, ClassifierStatus::Failed)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.classifier_timeout.as_millis() as u64,
                    "Classifier timed out, using 0.0 probability"
                );
                (0.0, ClassifierStatus::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FixedProbability;
    use crate::config::PolicyConfig;
    use crate::decision::{DecisionBranch, RiskLevel};
    use crate::rules::Rule;
    use crate::sink::RecentAnalyses;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingClassifier {
        calls: AtomicUsize,
        probability: f64,
    }

    impl ScamClassifier for CountingClassifier {
        fn probability(&self, _message: &str) -> Result<f64, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.probability)
        }
    }

    struct SlowClassifier;

    impl ScamClassifier for SlowClassifier {
        fn probability(&self, _message: &str) -> Result<f64, ClassifierError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(0.99)
        }
    }

    struct BrokenClassifier;

    impl ScamClassifier for BrokenClassifier {
        fn probability(&self, _message: &str) -> Result<f64, ClassifierError> {
            Err(ClassifierError::Prediction("tensor shape mismatch".to_string()))
        }
    }

    fn otp_rules() -> Vec<Rule> {
        vec![
            Rule {
                id: 1,
                category: "OTP_REQUEST".to_string(),
                weight: 0.3,
                matchers: vec!["otp".to_string()],
                explanation: "Requests a one-time password".to_string(),
                enabled: true,
                is_regex: false,
            },
            Rule {
                id: 2,
                category: "SHORT_LINK".to_string(),
                weight: 0.15,
                matchers: vec![r"bit\.ly/\S+".to_string()],
                explanation: "Contains a shortened link".to_string(),
                enabled: true,
                is_regex: true,
            },
        ]
    }

    fn analyzer(classifier: Arc<dyn ScamClassifier>, timeout_ms: u64) -> Analyzer {
        let path = std::env::temp_dir().join("smishguard-analysis-unused.json");
        let store = RuleStore::from_rules(path, otp_rules()).unwrap();
        Analyzer::new(
            Arc::new(store),
            classifier,
            HybridDecisionEngine::new(PolicyConfig::default()),
            Duration::from_millis(timeout_ms),
        )
    }

    #[tokio::test]
    async fn test_analyze_reports_provenance() {
        let a = analyzer(Arc::new(FixedProbability(0.9)), 1000);
        let report = a
            .analyze("Share the OTP or pay at bit.ly/pay-now today")
            .await
            .unwrap();

        assert_eq!(report.triggered_rules, vec!["OTP_REQUEST", "SHORT_LINK"]);
        assert_eq!(report.matched_phrases, vec!["bit.ly/pay-now", "otp"]);
        assert_eq!(report.explanations.len(), 2);
        assert_eq!(report.classifier_status, ClassifierStatus::Scored);
        assert_eq!(report.assessment.branch, DecisionBranch::AiOverride);
        assert_eq!(report.assessment.risk_level, RiskLevel::High);
        assert_eq!(report.assessment.triggered_weight, 0.45);
    }

    #[tokio::test]
    async fn test_short_message_skips_classifier() {
        let classifier = Arc::new(CountingClassifier {
            calls: AtomicUsize::new(0),
            probability: 0.5,
        });
        let a = analyzer(classifier.clone(), 1000);

        let err = a.analyze("send otp").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientContext { tokens: 2, .. }));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

        assert_eq!(a.analyze("   ").await.unwrap_err(), AnalysisError::EmptyMessage);

        a.analyze("are we still on").await.unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_zero() {
        let a = analyzer(Arc::new(SlowClassifier), 20);
        let report = a.analyze("hello, how was the trip").await.unwrap();
        assert_eq!(report.classifier_status, ClassifierStatus::TimedOut);
        assert_eq!(report.assessment.ml_probability, 0.0);
        assert_eq!(report.assessment.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_classifier_error_degrades_to_zero() {
        let a = analyzer(Arc::new(BrokenClassifier), 1000);
        let report = a.analyze("share your otp with me").await.unwrap();
        assert_eq!(report.classifier_status, ClassifierStatus::Failed);
        assert_eq!(report.assessment.ml_probability, 0.0);
    }

    #[tokio::test]
    async fn test_not_ready_model_degrades_to_zero() {
        let a = analyzer(Arc::new(crate::classifier::ModelHandle::new(None)), 1000);
        assert!(!a.classifier_ready());
        let report = a.analyze("share your otp with me").await.unwrap();
        assert_eq!(report.classifier_status, ClassifierStatus::NotReady);
        assert_eq!(report.assessment.ml_probability, 0.0);
    }

    #[tokio::test]
    async fn test_sinks_do_not_change_result() {
        let recent = Arc::new(RecentAnalyses::new(10));
        let plain = analyzer(Arc::new(FixedProbability(0.4)), 1000);
        let with_sink = analyzer(Arc::new(FixedProbability(0.4)), 1000).with_sink(recent.clone());

        let message = "Your otp is 1234 for login";
        let a = plain.analyze(message).await.unwrap();
        let b = with_sink.analyze(message).await.unwrap();

        assert_eq!(a.assessment, b.assessment);
        assert_eq!(a.triggered_rules, b.triggered_rules);
        assert_eq!(recent.len(), 1);
        let logged = &recent.recent(1)[0];
        assert_eq!(logged.message, message);
        assert_eq!(logged.risk_level, b.assessment.risk_level);
    }

    #[tokio::test]
    async fn test_report_serializes_flat() {
        let a = analyzer(Arc::new(FixedProbability(0.1)), 1000);
        let report = a.analyze("Hey, are we still on for dinner tonight?").await.unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["risk_level"], "Low");
        assert_eq!(json["final_score"], 0.05);
        assert_eq!(json["branch"], "blended");
        assert_eq!(json["classifier_status"], "scored");
        assert!(json["matched_phrases"].as_array().unwrap().is_empty());
    }
}
