#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use preview_core::job::{Job, JobKey};
use preview_core::project::{Project, ProjectSource, SourceFile, Task};
use preview_core::stage::{
    CaptureError, Capturer, ProjectResolver, RenderError, Renderer, ResolveError, StageSet,
    StyleBuildError, StyleBuilder,
};
use preview_events::EventBus;
use preview_pipeline::{JobEngine, PipelineConfig};
use tokio::sync::Semaphore;
use tower::ServiceExt;

use preview_api::config::ServerConfig;
use preview_api::router::build_app_router;
use preview_api::state::AppState;

/// Bytes written by the fake capturer.
pub const IMAGE_BYTES: &[u8] = b"\x89PNG fake image";

// ---------------------------------------------------------------------------
// Stage fakes
// ---------------------------------------------------------------------------

/// Resolves any key except `missing` to a two-component project.
struct StaticResolver;

#[async_trait]
impl ProjectResolver for StaticResolver {
    async fn resolve(&self, source: &ProjectSource) -> Result<Project, ResolveError> {
        if source.key().as_str() == "missing" {
            return Err(ResolveError::NotFound("missing".into()));
        }
        let files = ["src/MainLayout.jsx", "src/pages/HomePage.jsx", "src/pages/AboutPage.jsx"]
            .into_iter()
            .map(|name| SourceFile {
                name: name.to_string(),
                content: String::new(),
            })
            .collect();
        Project::from_files(source.key().clone(), "indigo", files, None)
    }
}

/// Echoes the task id; with a gate, each render waits for a permit.
struct EchoRenderer {
    gate: Option<Arc<Semaphore>>,
}

#[async_trait]
impl Renderer for EchoRenderer {
    async fn render(&self, task: &Task) -> Result<String, RenderError> {
        if let Some(gate) = &self.gate {
            let _permit = gate
                .acquire()
                .await
                .map_err(|_| RenderError::Request("render gate closed".to_string()))?;
        }
        Ok(format!("<h1>{}</h1>", task.id()))
    }
}

struct NoopStyle;

#[async_trait]
impl StyleBuilder for NoopStyle {
    async fn build(&self, _work_dir: &Path) -> Result<(), StyleBuildError> {
        Ok(())
    }
}

struct FileCapturer;

#[async_trait]
impl Capturer for FileCapturer {
    async fn capture(&self, _markup: &Path, image: &Path) -> Result<PathBuf, CaptureError> {
        tokio::fs::write(image, IMAGE_BYTES)
            .await
            .map_err(CaptureError::Spawn)?;
        Ok(image.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    // Held so the results directory outlives the test.
    pub results: tempfile::TempDir,
}

/// Build the full application router over in-memory stage fakes.
pub fn build_test_app() -> TestApp {
    build_app_with_gate(None)
}

/// Like [`build_test_app`], but rendering blocks until the returned
/// semaphore is given permits.
pub fn build_gated_test_app() -> (TestApp, Arc<Semaphore>) {
    let gate = Arc::new(Semaphore::new(0));
    (build_app_with_gate(Some(Arc::clone(&gate))), gate)
}

fn build_app_with_gate(gate: Option<Arc<Semaphore>>) -> TestApp {
    let results = tempfile::tempdir().unwrap();
    let stages = StageSet {
        resolver: Arc::new(StaticResolver),
        renderer: Arc::new(EchoRenderer { gate }),
        style: Arc::new(NoopStyle),
        capturer: Arc::new(FileCapturer),
    };
    let pipeline = PipelineConfig {
        results_dir: results.path().to_path_buf(),
        public_prefix: "/results".to_string(),
        ..PipelineConfig::default()
    };

    let engine = Arc::new(JobEngine::new(stages, pipeline, Arc::new(EventBus::default())));
    let state = AppState::new(engine, test_config());
    let router = build_app_router(state.clone(), &test_config());

    TestApp {
        router,
        state,
        results,
    }
}

/// Poll until the job for `key` is terminal.
pub async fn wait_for_terminal(state: &AppState, key: &str) -> Job {
    let key = JobKey::parse(key).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(job) = state.engine.status(&key) {
                if job.is_terminal() {
                    return job;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job should finish")
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
