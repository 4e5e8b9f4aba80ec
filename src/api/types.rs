use serde::{Deserialize, Serialize};

use crate::feedback::FeedbackEntry;
use crate::rules::Rule;
use crate::sink::AnalysisRecord;

// ============================================================
// Requests & query params
// ============================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub limit: Option<usize>,
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_ready: bool,
    pub active_rules: usize,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<AnalysisRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub feedback: Vec<FeedbackEntry>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RuleCreatedResponse {
    pub status: String,
    pub rule: Rule,
}

#[derive(Debug, Serialize)]
pub struct RuleToggledResponse {
    pub status: String,
    pub message: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ModelReloadResponse {
    pub status: String,
    pub model_ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
