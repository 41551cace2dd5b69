//! Handlers for job submission and progress reads.
//!
//! `generate` is the only write path; it never blocks on the job itself.
//! `status` and `get_job` are pure reads and never create a job.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use preview_core::error::CoreError;
use preview_core::job::{Job, JobKey};
use preview_core::project::ProjectSource;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::{DataResponse, GenerateResponse, JobView};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Query string carrying the project URL.
#[derive(Debug, Deserialize)]
pub struct SourceQuery {
    pub url: Option<String>,
}

impl SourceQuery {
    fn source(&self) -> AppResult<ProjectSource> {
        let raw = self
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("missing 'url' query parameter".into()))?;
        Ok(ProjectSource::parse(raw)?)
    }
}

fn find_job(state: &AppState, key: &JobKey) -> AppResult<Job> {
    state.engine.status(key).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            key: key.to_string(),
        })
    })
}

fn status_url(key: &JobKey) -> String {
    format!("/api/v1/jobs/{key}")
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

/// GET|POST /api/v1/generate?url=
///
/// Starts a job for the project unless one already exists for its key.
/// Returns 201 when a job was created and 200 when attaching to an existing
/// one.
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> AppResult<impl IntoResponse> {
    let source = query.source()?;
    let submission = state.engine.submit(source);
    let key = submission.job.key().clone();

    let status = if submission.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(DataResponse {
            data: GenerateResponse {
                status_url: status_url(&key),
                key,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/status?url=
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> AppResult<Json<DataResponse<JobView>>> {
    let source = query.source()?;
    let job = find_job(&state, source.key())?;
    Ok(Json(DataResponse {
        data: JobView::from(&job),
    }))
}

/// GET /api/v1/jobs/{key}
pub async fn get_job(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<DataResponse<JobView>>> {
    let key = JobKey::parse(&key)?;
    let job = find_job(&state, &key)?;
    Ok(Json(DataResponse {
        data: JobView::from(&job),
    }))
}
