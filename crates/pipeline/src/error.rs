use std::time::Duration;

use preview_core::job::TransitionError;
use preview_core::stage::{CaptureError, RenderError, Stage, StyleBuildError};

/// Why a single stage failed.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Style(#[from] StyleBuildError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A task-level failure, tagged with the stage that failed.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {cause}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub cause: StageFailure,
}

impl PipelineError {
    pub fn new(stage: Stage, cause: impl Into<StageFailure>) -> Self {
        Self {
            stage,
            cause: cause.into(),
        }
    }
}

/// Failure to prepare a job's shared resources.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("invalid primary color '{0}'")]
    InvalidPrimaryColor(String),

    #[error("could not prepare work directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected registry operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no job registered for key '{0}'")]
    UnknownKey(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}
