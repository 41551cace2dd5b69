use std::sync::Arc;

use preview_events::EventBus;
use preview_pipeline::JobEngine;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind an `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Job registry, runners and pipeline.
    pub engine: Arc<JobEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Cancelled when the server begins shutting down; closes live feeds.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(engine: Arc<JobEngine>, config: ServerConfig) -> Self {
        Self {
            engine,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        self.engine.bus()
    }
}
