pub mod health;
pub mod jobs;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws?key=              WebSocket progress feed
/// /generate?url=        start or attach to a job
/// /status?url=          job read model by project URL
/// /jobs/{key}           job read model by key
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .merge(jobs::router())
}
