//! Job orchestration for component previews.
//!
//! - [`registry`]: concurrency-safe job store with atomic create-if-absent.
//! - [`task`]: the Render → Style → Capture pipeline for one task.
//! - [`runner`]: drives one job through its task list.
//! - [`engine`]: deduplicating submission and status reads.
//! - [`scaffold`]: per-job style scaffold.

pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod runner;
pub mod scaffold;
pub mod task;

pub use config::{PipelineConfig, StageTimeouts};
pub use engine::{JobEngine, Submission};
pub use error::{PipelineError, RegistryError, SetupError, StageFailure};
pub use registry::JobRegistry;
pub use task::{JobContext, TaskPipeline};
