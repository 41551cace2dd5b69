use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use preview_events::EventBus;
use preview_pipeline::{JobEngine, PipelineConfig};
use preview_stages::StageConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use preview_api::background::job_retention;
use preview_api::config::ServerConfig;
use preview_api::router::build_app_router;
use preview_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "preview_api=debug,preview_pipeline=debug,preview_stages=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let pipeline_config = PipelineConfig::from_env();
    let stage_config = StageConfig::from_env();
    tracing::info!(
        results_dir = %pipeline_config.results_dir.display(),
        public_prefix = %pipeline_config.public_prefix,
        "Loaded pipeline configuration"
    );

    tokio::fs::create_dir_all(&pipeline_config.results_dir)
        .await
        .expect("Failed to create results directory");

    // --- Job engine ---
    let event_bus = Arc::new(EventBus::default());
    let retention = pipeline_config.retention;
    let sweep_interval = pipeline_config.sweep_interval;
    let engine = Arc::new(JobEngine::new(
        preview_stages::stage_set(&stage_config),
        pipeline_config,
        event_bus,
    ));
    tracing::info!("Job engine created");

    // --- Retention sweeper ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = retention.map(|retention| {
        tokio::spawn(job_retention::run(
            Arc::clone(engine.registry()),
            retention,
            sweep_interval,
            retention_cancel.clone(),
        ))
    });
    if retention_handle.is_none() {
        tracing::info!("Job retention disabled, finished jobs are kept until restart");
    }

    // --- App state and router ---
    let state = AppState::new(Arc::clone(&engine), config.clone());
    let shutdown = state.shutdown.clone();
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Live feeds would otherwise hold the server open.
            shutdown.cancel();
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    if let Some(handle) = retention_handle {
        let limit = Duration::from_secs(config.shutdown_timeout_secs);
        let _ = tokio::time::timeout(limit, handle).await;
        tracing::info!("Job retention sweeper stopped");
    }

    tracing::info!(
        jobs = engine.registry().len(),
        "Graceful shutdown complete, unfinished jobs are dropped"
    );
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
