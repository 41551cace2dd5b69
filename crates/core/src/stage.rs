//! Contracts of the external collaborators driven by the pipeline.
//!
//! Each trait is a single opaque async operation. Implementations live in
//! `preview-stages`; tests substitute in-memory fakes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::project::{Project, ProjectSource, Task};

// ---------------------------------------------------------------------------
// Stage identity
// ---------------------------------------------------------------------------

/// The three per-task pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Render,
    Style,
    Capture,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Render => "render",
            Stage::Style => "style",
            Stage::Capture => "capture",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to turn a project source into a task list.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("project not found: {0}")]
    NotFound(String),

    #[error("upstream project service failed: {0}")]
    Upstream(String),

    #[error("project has no layout component")]
    MissingLayout,

    #[error("cannot derive a task name from file '{0}'")]
    InvalidFileName(String),

    #[error("two components share the task name '{0}'")]
    DuplicateTask(String),
}

/// Failure of the text-generation step.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render request failed: {0}")]
    Request(String),

    #[error("render service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("render service returned no markup")]
    Empty,
}

/// Failure of the stylesheet build step.
#[derive(Debug, thiserror::Error)]
pub enum StyleBuildError {
    #[error("could not start style build: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("style build failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
}

/// Failure of the rasterization step.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("could not start capture: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capture failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("markup at {} cannot be opened as a page", .0.display())]
    InvalidMarkup(PathBuf),

    #[error("capture produced no image at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("captured image is unreadable: {0}")]
    InvalidImage(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Resolves a project source into its component task list.
#[async_trait]
pub trait ProjectResolver: Send + Sync {
    async fn resolve(&self, source: &ProjectSource) -> Result<Project, ResolveError>;
}

/// Produces standalone HTML markup for one task.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, task: &Task) -> Result<String, RenderError>;
}

/// Compiles the stylesheet inside a job work directory.
///
/// Must be idempotent: it is invoked once per task over the same inputs.
#[async_trait]
pub trait StyleBuilder: Send + Sync {
    async fn build(&self, work_dir: &Path) -> Result<(), StyleBuildError>;
}

/// Rasterizes a markup file into an image at `image`.
///
/// Returns the path of the written image.
#[async_trait]
pub trait Capturer: Send + Sync {
    async fn capture(&self, markup: &Path, image: &Path) -> Result<PathBuf, CaptureError>;
}

// ---------------------------------------------------------------------------
// StageSet
// ---------------------------------------------------------------------------

/// One implementation of every collaborator, shared by all jobs.
#[derive(Clone)]
pub struct StageSet {
    pub resolver: Arc<dyn ProjectResolver>,
    pub renderer: Arc<dyn Renderer>,
    pub style: Arc<dyn StyleBuilder>,
    pub capturer: Arc<dyn Capturer>,
}
