//! algomod server binary
//!
//! Startup order matters: tracing, config, rule tables (fatal on error —
//! serving with an empty or partial rule set silently degrades moderation
//! quality), backend handle, pipeline, then the HTTP listener.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use algomod_classifier::{ClassifierConfig, InferenceBackend, OllamaBackend, SeverityClassifier};
use algomod_normalizer::{Normalizer, RuleSet};
use algomod_server::config::{Cli, ServerConfig};
use algomod_server::pipeline::ModerationPipeline;
use algomod_server::routes::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting algomod server");

    let config = ServerConfig::load(&cli.config, &cli)?;
    info!("Backend: {}", config.backend.base_url);
    info!("Model: {}", config.backend.model);

    let metrics_handle = init_metrics()?;

    // Rule tables load once; failure here is fatal by design.
    let rule_set = match &config.moderation.rules_path {
        Some(path) => RuleSet::from_file(path)?,
        None => RuleSet::builtin(),
    };
    let normalizer = Arc::new(Normalizer::new(&rule_set)?);
    info!(
        patterns = normalizer.pattern_count(),
        safe_contexts = normalizer.safe_context_count(),
        "rule tables loaded"
    );

    let backend = Arc::new(OllamaBackend::new(
        &config.backend.base_url,
        &config.backend.model,
        Duration::from_secs(config.backend.request_timeout_secs),
        config.backend.num_predict,
    )?);
    if backend.probe().await {
        info!("inference backend reachable");
    } else {
        // Not fatal: requests degrade gracefully until the backend comes up.
        warn!("inference backend unreachable at startup, stage 2 will degrade");
    }

    let classifier = Arc::new(SeverityClassifier::new(
        backend,
        ClassifierConfig {
            request_timeout: Duration::from_secs(config.backend.request_timeout_secs),
            max_concurrent: config.moderation.max_concurrent_inference,
            queue_wait: Duration::from_secs(config.moderation.queue_wait_secs),
            fallback_policy: config.moderation.fallback_policy,
        },
    ));

    let pipeline = Arc::new(ModerationPipeline::new(
        normalizer,
        classifier,
        config.moderation.max_input_bytes,
    ));

    let state = AppState {
        pipeline,
        metrics: metrics_handle,
    };
    let app = routes::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Shutdown signal received, stopping server...");
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("algomod=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("algomod=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return the handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("algomod_requests_total", "Total moderation requests received");
    metrics::describe_counter!(
        "algomod_algospeak_detected_total",
        "Requests in which Stage 1 applied at least one rewrite"
    );
    metrics::describe_counter!(
        "algomod_stage2_outcomes_total",
        "Stage 2 outcomes by kind (classified vs contained failure)"
    );
    metrics::describe_counter!(
        "algomod_validation_failures_total",
        "Requests rejected before any stage ran"
    );

    Ok(handle)
}
