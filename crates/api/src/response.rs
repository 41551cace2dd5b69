//! Shared response envelope and view types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })`.

use preview_core::job::{Job, JobKey, JobState};
use preview_core::types::Timestamp;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: view }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Public read model of a job.
///
/// Omits on-disk paths; artifacts are addressed by URL only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
    pub key: JobKey,
    pub state: JobState,
    pub artifacts: Vec<ArtifactView>,
    pub expected_count: Option<usize>,
    pub started_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactView {
    pub task: String,
    pub url: String,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            key: job.key().clone(),
            state: job.state(),
            artifacts: job
                .artifacts()
                .iter()
                .map(|a| ArtifactView {
                    task: a.task.clone(),
                    url: a.url.clone(),
                })
                .collect(),
            expected_count: job.expected_count(),
            started_at: job.started_at(),
            ended_at: job.ended_at(),
            error: job.error().map(str::to_string),
        }
    }
}

/// Body of a `generate` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub key: JobKey,
    /// Where to poll for progress.
    pub status_url: String,
}
