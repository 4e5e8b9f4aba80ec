use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::analysis::AnalysisReport;
use crate::error::{AnalysisError, FeedbackError, RuleSetError};
use crate::feedback::Feedback;
use crate::rules::{NewRule, Rule};

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

fn rule_set_error(e: RuleSetError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        RuleSetError::NotFound(_) => StatusCode::NOT_FOUND,
        RuleSetError::Invalid { .. } | RuleSetError::DuplicateId(_) => StatusCode::BAD_REQUEST,
        RuleSetError::Io { .. } | RuleSetError::Parse { .. } => {
            tracing::error!(error = %e, "Rule set storage failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

fn success(message: impl Into<String>) -> StatusResponse {
    StatusResponse {
        status: "success".to_string(),
        message: message.into(),
    }
}

// ============================================================
// Health & Analysis
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model_ready: state.model.is_ready(),
        active_rules: state.rules.active_count(),
    })
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<AnalysisReport> {
    state
        .analyzer
        .analyze(&req.message)
        .await
        .map(Json)
        .map_err(|e| match e {
            AnalysisError::EmptyMessage | AnalysisError::InsufficientContext { .. } => {
                api_error(StatusCode::BAD_REQUEST, e.to_string())
            }
        })
}

// ============================================================
// Feedback
// ============================================================

pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Json(feedback): Json<Feedback>,
) -> ApiResult<StatusResponse> {
    state.feedback.submit(feedback).map_err(|e| match e {
        FeedbackError::EmptyMessage => api_error(StatusCode::BAD_REQUEST, e.to_string()),
    })?;
    Ok(Json(success("Feedback recorded")))
}

pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogParams>,
) -> Json<FeedbackListResponse> {
    let limit = params.limit.unwrap_or(100).min(1000);
    let feedback = state.feedback.recent(limit);
    Json(FeedbackListResponse {
        total: feedback.len(),
        feedback,
    })
}

// ============================================================
// Admin: logs
// ============================================================

pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogParams>,
) -> Json<LogsResponse> {
    let limit = params.limit.unwrap_or(100).min(1000);
    let logs = state.recent.recent(limit);
    Json(LogsResponse {
        total: logs.len(),
        logs,
    })
}

// ============================================================
// Admin: rules
// ============================================================

pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<Rule>> {
    Json(state.rules.list())
}

pub async fn add_rule(
    State(state): State<Arc<AppState>>,
    Json(new_rule): Json<NewRule>,
) -> ApiResult<RuleCreatedResponse> {
    let rule = state.rules.add(new_rule).await.map_err(rule_set_error)?;
    Ok(Json(RuleCreatedResponse {
        status: "success".to_string(),
        rule,
    }))
}

pub async fn toggle_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<i64>,
) -> ApiResult<RuleToggledResponse> {
    let enabled = state.rules.toggle(rule_id).await.map_err(rule_set_error)?;
    Ok(Json(RuleToggledResponse {
        status: "success".to_string(),
        message: "Rule toggled".to_string(),
        enabled,
    }))
}

pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<i64>,
) -> ApiResult<StatusResponse> {
    state.rules.delete(rule_id).await.map_err(rule_set_error)?;
    Ok(Json(success("Rule deleted")))
}

pub async fn reload_rules(State(state): State<Arc<AppState>>) -> ApiResult<StatusResponse> {
    let count = state.rules.reload().await.map_err(rule_set_error)?;
    Ok(Json(success(format!("Reloaded {} rules", count))))
}

// ============================================================
// Admin: model
// ============================================================

pub async fn reload_model(State(state): State<Arc<AppState>>) -> ApiResult<ModelReloadResponse> {
    let model = state.model.clone();
    let outcome = tokio::task::spawn_blocking(move || model.reload())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match outcome {
        Ok(()) => Ok(Json(ModelReloadResponse {
            status: "success".to_string(),
            model_ready: true,
        })),
        Err(e) => Err(api_error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())),
    }
}
