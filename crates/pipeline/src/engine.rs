//! Entry point for submitting and observing jobs.
//!
//! [`JobEngine::submit`] is the deduplicating write trigger: it registers a
//! job for a key at most once and starts that job's runner detached from the
//! caller. [`JobEngine::status`] is the matching read model.

use std::sync::Arc;

use preview_core::job::{Job, JobKey, JobState, JobUpdate};
use preview_core::project::ProjectSource;
use preview_core::stage::StageSet;
use preview_events::{EventBus, JobEvent, JobEventKind};
use tokio::task::JoinHandle;

use crate::config::PipelineConfig;
use crate::registry::JobRegistry;
use crate::runner::JobRunner;
use crate::task::TaskPipeline;

/// Result of [`JobEngine::submit`].
pub struct Submission {
    /// Snapshot of the job at submission time.
    pub job: Job,
    /// Whether this call registered the job.
    pub created: bool,
    /// Completion handle of the runner started by this call, if any.
    pub runner: Option<JoinHandle<JobState>>,
}

/// Owns the registry and the shared pipeline; cheap to share via `Arc`.
pub struct JobEngine {
    registry: Arc<JobRegistry>,
    bus: Arc<EventBus>,
    stages: StageSet,
    pipeline: Arc<TaskPipeline>,
    config: Arc<PipelineConfig>,
}

impl JobEngine {
    pub fn new(stages: StageSet, config: PipelineConfig, bus: Arc<EventBus>) -> Self {
        let pipeline = Arc::new(TaskPipeline::from_stages(&stages, config.timeouts));
        Self {
            registry: Arc::new(JobRegistry::new()),
            bus,
            stages,
            pipeline,
            config: Arc::new(config),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current snapshot of the job for `key`. Never creates a job.
    pub fn status(&self, key: &JobKey) -> Option<Job> {
        self.registry.get(key)
    }

    /// Register a job for `source` unless one exists, and start its runner.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, source: ProjectSource) -> Submission {
        let (job, created) = self.registry.create_if_absent(source.key().clone(), None);
        if !created {
            tracing::debug!(job_key = %source.key(), state = %job.state(), "Attached to existing job");
            return Submission {
                job,
                created,
                runner: None,
            };
        }

        tracing::info!(job_key = %source.key(), "Job registered");
        let runner = self.spawn_runner(source);
        Submission {
            job,
            created,
            runner: Some(runner),
        }
    }

    /// Spawn the runner plus a supervisor that fails the job if the runner
    /// panics, so a job never stays `Running` after its runner is gone.
    fn spawn_runner(&self, source: ProjectSource) -> JoinHandle<JobState> {
        let key = source.key().clone();
        let runner = JobRunner::new(
            source,
            Arc::clone(&self.registry),
            Arc::clone(&self.bus),
            Arc::clone(&self.stages.resolver),
            Arc::clone(&self.pipeline),
            Arc::clone(&self.config),
        );
        let registry = Arc::clone(&self.registry);
        let bus = Arc::clone(&self.bus);

        tokio::spawn(async move {
            match tokio::spawn(runner.run()).await {
                Ok(state) => state,
                Err(e) => {
                    let message = format!("job runner aborted: {e}");
                    tracing::error!(job_key = %key, error = %message, "Job runner crashed");
                    if let Err(e) = registry.apply_update(&key, JobUpdate::failed(message.clone())) {
                        tracing::error!(job_key = %key, error = %e, "Job update rejected");
                    }
                    bus.publish(JobEvent::new(key, JobEventKind::JobFailed { error: message }));
                    JobState::Error
                }
            }
        })
    }
}
