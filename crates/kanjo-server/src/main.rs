//! kanjo Server
//!
//! Serves the Japanese sentiment model over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use kanjo_classifiers::{HubModelLoader, ModelAccessor};
use kanjo_server::{create_router, AppState, Cli, ServerConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = ServerConfig::load(&cli.config, &cli)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    // Initialize tracing
    init_tracing(config.debug);

    info!("Starting kanjo sentiment server");
    info!("Model: {} @ {}", config.model.identifier, config.model.revision);
    info!("Device: {}", config.model.device);
    info!(
        "Model loading: {}",
        if config.eager_load { "eager" } else { "lazy" }
    );

    let metrics_handle = if config.metrics {
        Some(init_metrics()?)
    } else {
        None
    };

    let loader = Arc::new(HubModelLoader::new(config.model.clone()));
    let accessor = Arc::new(ModelAccessor::new(config.model.identifier.clone(), loader));

    if config.eager_load {
        accessor
            .preload()
            .await
            .context("failed to load sentiment model at startup")?;
    }

    let addr = (config.host.clone(), config.port);
    let state = AppState::new(accessor, metrics_handle);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", addr.0, addr.1))?;
    info!("Listening on http://{}", listener.local_addr()?);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
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
}

/// Initialize tracing/logging
fn init_tracing(debug: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default = if debug {
        "kanjo=debug,tower_http=debug"
    } else {
        "kanjo=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "kanjo_requests_total",
        "Total number of requests by endpoint"
    );
    metrics::describe_counter!(
        "kanjo_predictions_total",
        "Total number of predictions by normalized label"
    );
    metrics::describe_counter!(
        "kanjo_unrecognized_labels_total",
        "Model labels outside positive/negative that were collapsed to negative"
    );
    metrics::describe_counter!("kanjo_errors_total", "Total number of model errors by kind");
    metrics::describe_histogram!(
        "kanjo_inference_latency_us",
        metrics::Unit::Microseconds,
        "Model inference latency in microseconds"
    );

    // Histograms are only drained by upkeep
    let upkeep = handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    info!("Metrics exporter initialized");
    Ok(handle)
}
