use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use smishguard::analysis::Analyzer;
use smishguard::api::{self, AppState};
use smishguard::classifier::{ModelHandle, ScamClassifier};
use smishguard::config::Config;
use smishguard::decision::HybridDecisionEngine;
use smishguard::feedback::FeedbackLog;
use smishguard::rules::RuleStore;
use smishguard::sink::{RecentAnalyses, TracingSink};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Initialize structured logging (set RUST_LOG=debug to see individual rule hits)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    tracing::info!("SmishGuard starting");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        rules_path = %config.rules.path,
        model_path = ?config.classifier.model_path,
        "Configuration loaded from {}",
        config_path
    );

    // Rule set
    let rule_store = RuleStore::open(&config.rules.path, config.rules.create_if_missing)
        .map_err(|e| eyre::eyre!("Failed to open rule set: {}", e))?;
    let rule_store = Arc::new(rule_store);

    // Classifier: a missing or broken model leaves it not-ready, the service still runs
    let model = Arc::new(ModelHandle::new(
        config.classifier.model_path.as_ref().map(PathBuf::from),
    ));
    if config.classifier.model_path.is_some() {
        if let Err(e) = model.reload() {
            tracing::warn!(error = %e, "Starting without classifier, ML probability will be 0.0");
        }
    } else {
        tracing::warn!("No classifier model configured, ML probability will be 0.0");
    }

    let recent = Arc::new(RecentAnalyses::new(config.api.recent_log_capacity));
    let classifier: Arc<dyn ScamClassifier> = model.clone();
    let analyzer = Analyzer::new(
        rule_store.clone(),
        classifier,
        HybridDecisionEngine::new(config.policy.clone()),
        Duration::from_millis(config.classifier.timeout_ms),
    )
    .with_sink(Arc::new(TracingSink))
    .with_sink(recent.clone());
    tracing::info!("Analyzer initialized");

    if !config.api.enabled {
        tracing::warn!("API disabled in configuration, nothing to serve");
        return Ok(());
    }

    let state = AppState {
        analyzer: Arc::new(analyzer),
        rules: rule_store,
        model,
        recent,
        feedback: Arc::new(FeedbackLog::new(config.api.feedback_capacity)),
    };

    // Create shutdown signal
    let shutdown = CancellationToken::new();

    let mut server = {
        let shutdown = shutdown.clone();
        let host = config.api.host.clone();
        let port = config.api.port;
        tokio::spawn(async move { api::serve(state, &host, port, shutdown).await })
    };

    tracing::info!("Press Ctrl+C to stop.");

    // Wait for shutdown signal, or for the server to die on its own
    let finished_early = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutdown signal received, draining in-flight requests...");
            shutdown.cancel();
            None
        }
        finished = &mut server => Some(finished),
    };

    let outcome = match finished_early {
        Some(finished) => finished,
        None => server.await,
    };

    match outcome {
        Ok(Ok(())) => {
            tracing::info!("SmishGuard stopped gracefully");
            Ok(())
        }
        Ok(Err(e)) => Err(eyre::eyre!("API server failed: {}", e)),
        Err(e) => Err(eyre::eyre!("API server task panicked: {}", e)),
    }
}
