//! Executes one job from project resolution to a terminal state.
//!
//! State machine driven here:
//!
//! ```text
//! Running --(every task processed)--------------> Done
//! Running --(resolution or setup failed)--------> Error
//! ```
//!
//! Individual task failures never abort the job: they are logged, announced
//! on the event bus, and skipped.

use std::pin::pin;
use std::sync::Arc;

use futures::StreamExt;
use preview_core::job::{Job, JobKey, JobState, JobUpdate};
use preview_core::project::{Project, ProjectSource};
use preview_core::stage::ProjectResolver;
use preview_events::{EventBus, JobEvent, JobEventKind};

use crate::config::PipelineConfig;
use crate::registry::JobRegistry;
use crate::scaffold;
use crate::task::{JobContext, TaskPipeline};

/// Runner for a single job.
///
/// Holds only the job's key; all state changes go through the registry.
pub struct JobRunner {
    source: ProjectSource,
    registry: Arc<JobRegistry>,
    bus: Arc<EventBus>,
    resolver: Arc<dyn ProjectResolver>,
    pipeline: Arc<TaskPipeline>,
    config: Arc<PipelineConfig>,
}

impl JobRunner {
    pub fn new(
        source: ProjectSource,
        registry: Arc<JobRegistry>,
        bus: Arc<EventBus>,
        resolver: Arc<dyn ProjectResolver>,
        pipeline: Arc<TaskPipeline>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            source,
            registry,
            bus,
            resolver,
            pipeline,
            config,
        }
    }

    fn key(&self) -> &JobKey {
        self.source.key()
    }

    /// Drive the job to completion and return its terminal state.
    pub async fn run(self) -> JobState {
        tracing::info!(job_key = %self.key(), url = %self.source.url(), "Job runner started");

        let project = match self.resolve().await {
            Ok(project) => project,
            Err(message) => return self.fail(message),
        };

        let expected_count = project.tasks.len();
        self.update(JobUpdate::expected_count(expected_count));

        let ctx = JobContext::new(self.key().clone(), &self.config);
        if let Err(e) = scaffold::prepare_work_dir(&ctx.work_dir, &project.primary_color).await {
            return self.fail(format!("job setup failed: {e}"));
        }

        self.publish(JobEventKind::JobStarted { expected_count });

        let mut produced = 0;
        let mut outcomes = pin!(self.pipeline.stream(&project.tasks, &ctx));
        while let Some((task, outcome)) = outcomes.next().await {
            match outcome {
                Ok(artifact) => {
                    if self.update(JobUpdate::artifact(artifact.clone())).is_none() {
                        continue;
                    }
                    produced += 1;
                    tracing::info!(
                        job_key = %self.key(),
                        task = %task.id(),
                        produced,
                        expected_count,
                        "Artifact ready",
                    );
                    self.publish(JobEventKind::ArtifactReady {
                        artifact,
                        produced,
                        expected_count,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        job_key = %self.key(),
                        task = %task.id(),
                        stage = %e.stage,
                        error = %e.cause,
                        "Task failed, skipping",
                    );
                    self.publish(JobEventKind::TaskFailed {
                        task: task.id().to_string(),
                        stage: e.stage,
                        error: e.cause.to_string(),
                    });
                }
            }
        }

        self.update(JobUpdate::state(JobState::Done));
        tracing::info!(job_key = %self.key(), produced, expected_count, "Job finished");
        self.publish(JobEventKind::JobCompleted {
            produced,
            expected_count,
        });
        JobState::Done
    }

    /// Resolve the project under the configured time limit.
    async fn resolve(&self) -> Result<Project, String> {
        let limit = self.config.timeouts.resolve;
        match tokio::time::timeout(limit, self.resolver.resolve(&self.source)).await {
            Ok(Ok(project)) if project.key != *self.key() => Err(format!(
                "project resolution returned '{}' instead of '{}'",
                project.key,
                self.key()
            )),
            Ok(Ok(project)) => {
                tracing::debug!(
                    job_key = %self.key(),
                    layout = %project.layout.name,
                    tasks = project.tasks.len(),
                    "Project resolved",
                );
                Ok(project)
            }
            Ok(Err(e)) => Err(format!("project resolution failed: {e}")),
            Err(_) => Err(format!("project resolution timed out after {limit:?}")),
        }
    }

    /// Record a fatal error and end the job.
    fn fail(&self, message: String) -> JobState {
        tracing::error!(job_key = %self.key(), error = %message, "Job failed");
        self.update(JobUpdate::failed(message.clone()));
        self.publish(JobEventKind::JobFailed { error: message });
        JobState::Error
    }

    /// Apply an update, logging rejected ones instead of propagating them.
    fn update(&self, update: JobUpdate) -> Option<Job> {
        match self.registry.apply_update(self.key(), update) {
            Ok(job) => Some(job),
            Err(e) => {
                tracing::error!(job_key = %self.key(), error = %e, "Job update rejected");
                None
            }
        }
    }

    fn publish(&self, kind: JobEventKind) {
        self.bus.publish(JobEvent::new(self.key().clone(), kind));
    }
}
