//! Project resolver backed by the app-generation result API.
//!
//! The service is an RPC-style endpoint: `POST {api_url}` with
//! `{"json": {"appId": "..."}}` returns `{"json": {"project": {...}}}`.

use async_trait::async_trait;
use preview_core::project::{Project, ProjectSource, SourceFile};
use preview_core::stage::{ProjectResolver, ResolveError};
use serde::Deserialize;

pub const DEFAULT_PROJECT_API_URL: &str =
    "https://wasp-ai-server.fly.dev/operations/get-app-generation-result";

#[derive(Debug, Deserialize)]
struct Envelope {
    json: Option<ResultBody>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    project: Option<ProjectBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectBody {
    primary_color: String,
    #[serde(default)]
    files: Vec<SourceFile>,
}

/// Fetches a generated app's files over HTTP.
pub struct HttpProjectResolver {
    client: reqwest::Client,
    api_url: String,
    task_limit: Option<usize>,
}

impl HttpProjectResolver {
    /// `task_limit` caps how many components of a project become tasks.
    pub fn new(client: reqwest::Client, api_url: impl Into<String>, task_limit: Option<usize>) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            task_limit,
        }
    }
}

#[async_trait]
impl ProjectResolver for HttpProjectResolver {
    async fn resolve(&self, source: &ProjectSource) -> Result<Project, ResolveError> {
        let body = serde_json::json!({ "json": { "appId": source.key().as_str() } });

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ResolveError::Upstream(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(source.key().to_string()));
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ResolveError::Upstream(format!("{status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ResolveError::Upstream(e.to_string()))?;

        parse_project(source, &text, self.task_limit)
    }
}

/// Decode a result API body into a [`Project`].
///
/// A body without a project means the app id is unknown upstream.
pub fn parse_project(
    source: &ProjectSource,
    body: &str,
    task_limit: Option<usize>,
) -> Result<Project, ResolveError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| ResolveError::Upstream(format!("malformed project response: {e}")))?;

    let project = envelope
        .json
        .and_then(|result| result.project)
        .ok_or_else(|| ResolveError::NotFound(source.key().to_string()))?;

    tracing::debug!(
        job_key = %source.key(),
        files = project.files.len(),
        primary_color = %project.primary_color,
        "Project resolved",
    );

    Project::from_files(
        source.key().clone(),
        project.primary_color,
        project.files,
        task_limit,
    )
}
