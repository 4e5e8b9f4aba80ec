use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::classifier::ClassifierStatus;
use crate::config::MAX_BUFFER_CAPACITY;
use crate::decision::RiskLevel;

/// Audit entry handed to every sink after an analysis completes.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub analyzed_at: DateTime<Utc>,
    pub message: String,
    pub risk_level: RiskLevel,
    pub final_score: f64,
    pub rule_score: f64,
    pub ml_probability: f64,
    pub triggered_rules: Vec<String>,
    pub classifier_status: ClassifierStatus,
    pub processing_time_sec: f64,
}

/// Receives completed analyses. Sinks observe results; they never alter them.
pub trait ResultSink: Send + Sync {
    fn record(&self, record: &AnalysisRecord);
}

/// Emits one structured log event per analysis.
#[derive(Debug, Default)]
pub struct TracingSink;

const PREVIEW_CHARS: usize = 50;

impl ResultSink for TracingSink {
    fn record(&self, record: &AnalysisRecord) {
        tracing::info!(
            message = %preview(&record.message),
            risk_level = record.risk_level.as_str(),
            final_score = record.final_score,
            rule_score = record.rule_score,
            ml_probability = record.ml_probability,
            classifier = record.classifier_status.as_str(),
            triggered = ?record.triggered_rules,
            processing_time_sec = record.processing_time_sec,
            "Fraud analysis report"
        );
    }
}

fn preview(message: &str) -> String {
    if message.chars().count() > PREVIEW_CHARS {
        let head: String = message.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        message.to_string()
    }
}

/// Fixed-capacity in-memory log. The oldest entry is evicted once full.
pub struct BoundedLog<T> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_BUFFER_CAPACITY);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn push(&self, entry: T) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Up to `limit` entries, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<T> {
        self.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// History of recent analyses, served by the admin log endpoint.
pub struct RecentAnalyses {
    log: BoundedLog<AnalysisRecord>,
}

impl RecentAnalyses {
    pub fn new(capacity: usize) -> Self {
        Self {
            log: BoundedLog::new(capacity),
        }
    }

    /// Up to `limit` records, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<AnalysisRecord> {
        self.log.recent(limit)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

impl ResultSink for RecentAnalyses {
    fn record(&self, record: &AnalysisRecord) {
        self.log.push(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(message: &str) -> AnalysisRecord {
        AnalysisRecord {
            analyzed_at: Utc::now(),
            message: message.to_string(),
            risk_level: RiskLevel::Low,
            final_score: 0.1,
            rule_score: 0.0,
            ml_probability: 0.2,
            triggered_rules: vec![],
            classifier_status: ClassifierStatus::Scored,
            processing_time_sec: 0.001,
        }
    }

    #[test]
    fn test_recent_is_newest_first_and_bounded() {
        let recent = RecentAnalyses::new(2);
        recent.record(&record("first"));
        recent.record(&record("second"));
        recent.record(&record("third"));

        let entries = recent.recent(10);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "third");
        assert_eq!(entries[1].message, "second");
        assert_eq!(recent.recent(1).len(), 1);
    }

    #[test]
    fn test_bounded_log_caps_oversized_capacity() {
        let log: BoundedLog<u32> = BoundedLog::new(usize::MAX);
        assert_eq!(log.capacity, MAX_BUFFER_CAPACITY);
        assert!(log.is_empty());

        let log: BoundedLog<u32> = BoundedLog::new(0);
        log.push(1);
        log.push(2);
        assert_eq!(log.recent(5), vec![2]);
    }

    #[test]
    fn test_preview_truncates_long_messages() {
        let long = "x".repeat(80);
        assert_eq!(preview(&long), format!("{}...", "x".repeat(50)));
        assert_eq!(preview("short one"), "short one");
    }
}
