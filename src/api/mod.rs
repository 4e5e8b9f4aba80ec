pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::analysis::Analyzer;
use crate::classifier::ModelHandle;
use crate::feedback::FeedbackLog;
use crate::rules::RuleStore;
use crate::sink::RecentAnalyses;

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub rules: Arc<RuleStore>,
    pub model: Arc<ModelHandle>,
    pub recent: Arc<RecentAnalyses>,
    pub feedback: Arc<FeedbackLog>,
}

pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/feedback", post(handlers::submit_feedback))
        .route("/api/v1/admin/logs", get(handlers::list_logs))
        .route("/api/v1/admin/feedback", get(handlers::list_feedback))
        .route(
            "/api/v1/admin/rules",
            get(handlers::list_rules).post(handlers::add_rule),
        )
        .route("/api/v1/admin/rules/reload", post(handlers::reload_rules))
        .route(
            "/api/v1/admin/rules/{rule_id}",
            put(handlers::toggle_rule).delete(handlers::delete_rule),
        )
        .route("/api/v1/admin/model/reload", post(handlers::reload_model))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
    shutdown: CancellationToken,
) -> eyre::Result<()> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{LinearTextModel, ScamClassifier};
    use crate::config::PolicyConfig;
    use crate::decision::HybridDecisionEngine;
    use crate::rules::Rule;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn test_state() -> AppState {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "smishguard-api-{}-{}.json",
            std::process::id(),
            n
        ));
        let rules = vec![Rule {
            id: 1,
            category: "OTP_REQUEST".to_string(),
            weight: 0.5,
            matchers: vec!["otp".to_string()],
            explanation: "Requests a one-time password".to_string(),
            enabled: true,
            is_regex: false,
        }];
        let store = Arc::new(RuleStore::from_rules(path, rules).unwrap());
        let model = Arc::new(ModelHandle::with_model(LinearTextModel {
            bias: -1.0,
            weights: HashMap::from([("otp".to_string(), 4.0)]),
            bigrams: true,
        }));
        let recent = Arc::new(RecentAnalyses::new(10));
        let classifier: Arc<dyn ScamClassifier> = model.clone();
        let analyzer = Analyzer::new(
            store.clone(),
            classifier,
            HybridDecisionEngine::new(PolicyConfig::default()),
            Duration::from_secs(1),
        )
        .with_sink(recent.clone());

        AppState {
            analyzer: Arc::new(analyzer),
            rules: store,
            model,
            recent,
            feedback: Arc::new(FeedbackLog::new(10)),
        }
    }

    async fn read_body(resp: axum::http::Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let app = router(test_state());
        let resp = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["model_ready"], true);
        assert_eq!(body["active_rules"], 1);
    }

    #[tokio::test]
    async fn test_analyze_returns_report() {
        let state = test_state();
        let app = router(state.clone());
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/analyze",
                serde_json::json!({ "message": "Please share the OTP you received" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = read_body(resp).await;
        assert_eq!(body["risk_level"], "High");
        assert_eq!(body["branch"], "ai_override");
        assert_eq!(body["triggered_rules"], serde_json::json!(["OTP_REQUEST"]));
        assert_eq!(body["matched_phrases"], serde_json::json!(["otp"]));
        assert!(body["processing_time_sec"].is_number());
        assert_eq!(state.recent.len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_short_and_empty() {
        let app = router(test_state());
        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/analyze",
                serde_json::json!({ "message": "ok" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = read_body(resp).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Insufficient context"));

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/analyze",
                serde_json::json!({ "message": "   " }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = read_body(resp).await;
        assert_eq!(body["error"], "Message cannot be empty");
    }

    #[tokio::test]
    async fn test_rule_admin_lifecycle() {
        let state = test_state();
        let app = router(state.clone());

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/rules",
                serde_json::json!({
                    "category": "SHORT_LINK",
                    "weight": 0.15,
                    "keywords": ["bit\\.ly/\\S+"],
                    "explanation": "Contains a shortened link",
                    "is_regex": true
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_body(resp).await;
        assert_eq!(body["rule"]["id"], 2);
        assert_eq!(body["rule"]["enabled"], true);

        let resp = app
            .clone()
            .oneshot(
                Request::put("/api/v1/admin/rules/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_body(resp).await["enabled"], false);
        assert_eq!(state.rules.active_count(), 1);

        let resp = app
            .clone()
            .oneshot(
                Request::delete("/api/v1/admin/rules/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(
                Request::delete("/api/v1/admin/rules/2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .oneshot(Request::get("/api/v1/admin/rules").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = read_body(resp).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let _ = std::fs::remove_file(state.rules.path());
    }

    #[tokio::test]
    async fn test_add_rule_rejects_negative_weight() {
        let app = router(test_state());
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/rules",
                serde_json::json!({
                    "category": "BAD",
                    "weight": -0.5,
                    "keywords": ["x"],
                    "explanation": "never valid"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logs_newest_first() {
        let state = test_state();
        let app = router(state.clone());
        for message in ["first message here please", "second message here please"] {
            let resp = app
                .clone()
                .oneshot(json_request(
                    "POST",
                    "/api/v1/analyze",
                    serde_json::json!({ "message": message }),
                ))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = app
            .oneshot(
                Request::get("/api/v1/admin/logs?limit=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = read_body(resp).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["logs"][0]["message"], "second message here please");
    }

    #[tokio::test]
    async fn test_model_reload_without_path_is_unavailable() {
        let app = router(test_state());
        let resp = app
            .oneshot(
                Request::post("/api/v1/admin/model/reload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_feedback_submit_and_list() {
        let state = test_state();
        let app = router(state.clone());

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/feedback",
                serde_json::json!({
                    "message": "Your BlueDart package is out for delivery",
                    "predicted_risk": "Medium",
                    "user_correction": "Low"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_body(resp).await["status"], "success");
        assert_eq!(state.feedback.len(), 1);

        let resp = app
            .oneshot(
                Request::get("/api/v1/admin/feedback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_body(resp).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["feedback"][0]["user_correction"], "Low");
        assert_eq!(body["feedback"][0]["corrected"], true);
    }

    #[tokio::test]
    async fn test_feedback_rejects_unknown_label_and_blank_message() {
        let state = test_state();
        let app = router(state.clone());

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/feedback",
                serde_json::json!({
                    "message": "some message here",
                    "predicted_risk": "High",
                    "user_correction": "Safe"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/v1/feedback",
                serde_json::json!({
                    "message": "  ",
                    "predicted_risk": "High",
                    "user_correction": "Low"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(state.feedback.is_empty());
    }
}
