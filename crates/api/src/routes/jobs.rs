//! Route definitions for job submission and reads.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/api/v1`.
///
/// ```text
/// GET|POST  /generate?url=   -> generate
/// GET       /status?url=     -> status
/// GET       /jobs/{key}      -> get_job
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", get(jobs::generate).post(jobs::generate))
        .route("/status", get(jobs::status))
        .route("/jobs/{key}", get(jobs::get_job))
}
