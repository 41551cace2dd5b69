#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use preview_core::project::{Project, ProjectSource, SourceFile, Task};
use preview_core::stage::{
    CaptureError, Capturer, ProjectResolver, RenderError, Renderer, ResolveError, StageSet,
    StyleBuildError, StyleBuilder,
};
use preview_events::{EventBus, JobEvent};
use preview_pipeline::{JobEngine, PipelineConfig, StageTimeouts};
use tokio::sync::broadcast;

pub const LAYOUT: &str = "src/client/MainLayout.jsx";

/// Component file names for the given task ids.
pub fn component(id: &str) -> String {
    format!("src/client/pages/{id}.jsx")
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves every source to the same component list.
pub struct FakeResolver {
    ids: Vec<String>,
    color: String,
    fail: bool,
    answer_for: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeResolver {
    pub fn with_tasks(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            color: "blue".to_string(),
            fail: false,
            answer_for: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_tasks(&[])
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }

    /// Resolve every source to the project of `key` instead of its own.
    pub fn answering_for(mut self, key: &str) -> Self {
        self.answer_for = Some(key.to_string());
        self
    }
}

#[async_trait]
impl ProjectResolver for FakeResolver {
    async fn resolve(&self, source: &ProjectSource) -> Result<Project, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Keep the job observable as Running for a moment.
        tokio::time::sleep(Duration::from_millis(20)).await;

        if self.fail {
            return Err(ResolveError::NotFound(source.key().to_string()));
        }

        let mut files = vec![SourceFile {
            name: LAYOUT.to_string(),
            content: "export default function MainLayout() {}".to_string(),
        }];
        files.extend(self.ids.iter().map(|id| SourceFile {
            name: component(id),
            content: format!("export default function {id}() {{}}"),
        }));
        let key = match &self.answer_for {
            Some(key) => preview_core::job::JobKey::parse(key).unwrap(),
            None => source.key().clone(),
        };
        Project::from_files(key, self.color.clone(), files, None)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRenderer {
    fail: HashSet<String>,
    empty: HashSet<String>,
    hang: HashSet<String>,
}

impl FakeRenderer {
    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail.insert(id.to_string());
        self
    }

    pub fn empty_on(mut self, id: &str) -> Self {
        self.empty.insert(id.to_string());
        self
    }

    pub fn hanging_on(mut self, id: &str) -> Self {
        self.hang.insert(id.to_string());
        self
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, task: &Task) -> Result<String, RenderError> {
        let id = task.id();
        if self.hang.contains(id) {
            std::future::pending::<()>().await;
        }
        if self.fail.contains(id) {
            return Err(RenderError::Api {
                status: 500,
                body: "model unavailable".to_string(),
            });
        }
        if self.empty.contains(id) {
            return Ok("   ".to_string());
        }
        Ok(format!("<div class=\"text-primary-500\">{id}</div>"))
    }
}

// ---------------------------------------------------------------------------
// Style builder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStyle {
    pub builds: AtomicUsize,
}

#[async_trait]
impl StyleBuilder for FakeStyle {
    async fn build(&self, work_dir: &Path) -> Result<(), StyleBuildError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(work_dir.join("main.output.css"), "/* built */")
            .await
            .map_err(StyleBuildError::Spawn)
    }
}

// ---------------------------------------------------------------------------
// Capturer
// ---------------------------------------------------------------------------

/// Writes a placeholder image next to the markup.
#[derive(Default)]
pub struct FakeCapturer {
    fail: HashSet<String>,
    skip_write: HashSet<String>,
}

impl FakeCapturer {
    pub fn failing_on(mut self, id: &str) -> Self {
        self.fail.insert(id.to_string());
        self
    }

    /// Report success for `id` without writing the image.
    pub fn lying_on(mut self, id: &str) -> Self {
        self.skip_write.insert(id.to_string());
        self
    }
}

#[async_trait]
impl Capturer for FakeCapturer {
    async fn capture(&self, markup: &Path, image: &Path) -> Result<PathBuf, CaptureError> {
        let id = markup
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        if self.fail.contains(&id) {
            return Err(CaptureError::Failed {
                exit_code: Some(1),
                stderr: "browser crashed".to_string(),
            });
        }
        if !self.skip_write.contains(&id) {
            tokio::fs::write(image, b"\x89PNG fake")
                .await
                .map_err(CaptureError::Spawn)?;
        }
        Ok(image.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub engine: JobEngine,
    pub resolver: Arc<FakeResolver>,
    pub style: Arc<FakeStyle>,
    pub events: broadcast::Receiver<JobEvent>,
    // Held so the results directory outlives the test.
    pub results: tempfile::TempDir,
}

pub fn timeouts() -> StageTimeouts {
    StageTimeouts {
        resolve: Duration::from_secs(5),
        render: Duration::from_millis(200),
        style: Duration::from_secs(5),
        capture: Duration::from_secs(5),
    }
}

pub fn harness(resolver: FakeResolver, renderer: FakeRenderer, capturer: FakeCapturer) -> Harness {
    let results = tempfile::tempdir().unwrap();
    let (engine, resolver, style, events) =
        engine_in(results.path(), resolver, renderer, capturer);
    Harness {
        engine,
        resolver,
        style,
        events,
        results,
    }
}

/// Build an engine writing into an existing results directory.
pub fn engine_in(
    results_dir: &Path,
    resolver: FakeResolver,
    renderer: FakeRenderer,
    capturer: FakeCapturer,
) -> (
    JobEngine,
    Arc<FakeResolver>,
    Arc<FakeStyle>,
    broadcast::Receiver<JobEvent>,
) {
    let resolver = Arc::new(resolver);
    let style = Arc::new(FakeStyle::default());

    let stages = StageSet {
        resolver: resolver.clone(),
        renderer: Arc::new(renderer),
        style: style.clone(),
        capturer: Arc::new(capturer),
    };
    let config = PipelineConfig {
        results_dir: results_dir.to_path_buf(),
        public_prefix: "/results".to_string(),
        timeouts: timeouts(),
        ..PipelineConfig::default()
    };

    let bus = Arc::new(EventBus::new(256));
    let events = bus.subscribe();
    (JobEngine::new(stages, config, bus), resolver, style, events)
}

pub fn source(key: &str) -> ProjectSource {
    ProjectSource::parse(&format!("https://magic-app-gen.example/result/{key}")).unwrap()
}

/// Drain every event already published.
pub fn drain(rx: &mut broadcast::Receiver<JobEvent>) -> Vec<JobEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
