//! The per-task pipeline: Render, Style, Capture.
//!
//! Stages run strictly in order and each only if the previous one succeeded.
//! Every stage is bounded by its configured timeout; any failure surfaces as
//! a single [`PipelineError`] tagged with the failing stage.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use preview_core::job::{Artifact, JobKey};
use preview_core::naming::{artifact_url, image_filename, job_dir, markup_filename};
use preview_core::project::Task;
use preview_core::stage::{
    CaptureError, Capturer, RenderError, Renderer, Stage, StageSet, StyleBuilder,
};

use crate::config::{PipelineConfig, StageTimeouts};
use crate::error::{PipelineError, StageFailure};

/// Per-job resources shared by every task of the job.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub key: JobKey,
    /// Work directory exclusively owned by this job's runner.
    pub work_dir: PathBuf,
    /// URL prefix used to build artifact URLs.
    pub public_prefix: String,
}

impl JobContext {
    pub fn new(key: JobKey, config: &PipelineConfig) -> Self {
        Self {
            work_dir: job_dir(&config.results_dir, &key),
            public_prefix: config.public_prefix.clone(),
            key,
        }
    }
}

/// Outcome of one task, as yielded by [`TaskPipeline::stream`].
pub type TaskOutcome<'a> = (&'a Task, Result<Artifact, PipelineError>);

/// Sequences the three stages for a task.
pub struct TaskPipeline {
    renderer: Arc<dyn Renderer>,
    style: Arc<dyn StyleBuilder>,
    capturer: Arc<dyn Capturer>,
    timeouts: StageTimeouts,
}

impl TaskPipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        style: Arc<dyn StyleBuilder>,
        capturer: Arc<dyn Capturer>,
        timeouts: StageTimeouts,
    ) -> Self {
        Self {
            renderer,
            style,
            capturer,
            timeouts,
        }
    }

    pub fn from_stages(stages: &StageSet, timeouts: StageTimeouts) -> Self {
        Self::new(
            Arc::clone(&stages.renderer),
            Arc::clone(&stages.style),
            Arc::clone(&stages.capturer),
            timeouts,
        )
    }

    /// Run one task through all stages and return its artifact.
    pub async fn process(&self, task: &Task, ctx: &JobContext) -> Result<Artifact, PipelineError> {
        let markup = run_stage(
            Stage::Render,
            self.timeouts.render,
            self.renderer.render(task),
        )
        .await?;
        if markup.trim().is_empty() {
            return Err(PipelineError::new(Stage::Render, RenderError::Empty));
        }

        let markup_path = ctx.work_dir.join(markup_filename(task.id()));
        tokio::fs::write(&markup_path, markup)
            .await
            .map_err(|e| PipelineError::new(Stage::Render, e))?;
        tracing::debug!(job_key = %ctx.key, task = %task.id(), "Markup written");

        run_stage(
            Stage::Style,
            self.timeouts.style,
            self.style.build(&ctx.work_dir),
        )
        .await?;

        let image_path = ctx.work_dir.join(image_filename(task.id()));
        match tokio::fs::remove_file(&image_path).await {
            Ok(()) => {
                tracing::debug!(job_key = %ctx.key, task = %task.id(), "Removed previous image");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PipelineError::new(Stage::Capture, e)),
        }
        let written = run_stage(
            Stage::Capture,
            self.timeouts.capture,
            self.capturer.capture(&markup_path, &image_path),
        )
        .await?;

        if !tokio::fs::try_exists(&written).await.unwrap_or(false) {
            return Err(PipelineError::new(
                Stage::Capture,
                CaptureError::MissingOutput(written),
            ));
        }

        Ok(Artifact {
            task: task.id().to_string(),
            url: artifact_url(&ctx.public_prefix, &ctx.key, task.id()),
            path: written,
        })
    }

    /// Lazily process `tasks` one at a time, in order.
    ///
    /// Nothing runs until the stream is polled; each outcome is produced
    /// exactly once and the stream cannot be restarted.
    pub fn stream<'a>(
        &'a self,
        tasks: &'a [Task],
        ctx: &'a JobContext,
    ) -> impl Stream<Item = TaskOutcome<'a>> + Send + 'a {
        stream::iter(tasks).then(move |task| async move { (task, self.process(task, ctx).await) })
    }
}

/// Await a stage future under a time limit, tagging failures with `stage`.
async fn run_stage<T, E>(
    stage: Stage,
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, PipelineError>
where
    E: Into<StageFailure>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(PipelineError::new(stage, e)),
        Err(_elapsed) => Err(PipelineError::new(stage, StageFailure::Timeout(limit))),
    }
}
