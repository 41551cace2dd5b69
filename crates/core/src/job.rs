//! Job model and lifecycle state machine.
//!
//! A [`Job`] is the mutable progress record for one [`JobKey`]. It is only
//! ever changed through [`Job::apply`], which validates a [`JobUpdate`] as a
//! whole before touching any field, so a rejected update leaves the job
//! exactly as it was.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum length of a job key.
pub const MAX_KEY_LEN: usize = 128;

static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

// ---------------------------------------------------------------------------
// JobKey
// ---------------------------------------------------------------------------

/// Caller-supplied job identity.
///
/// Doubles as the name of the job's work directory, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobKey(String);

impl JobKey {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.is_empty() || raw.len() > MAX_KEY_LEN {
            return Err(CoreError::Validation(format!(
                "job key must be 1-{MAX_KEY_LEN} characters, got {}",
                raw.len()
            )));
        }
        if !KEY_RE.is_match(raw) {
            return Err(CoreError::Validation(format!(
                "job key '{raw}' may only contain letters, digits, '-' and '_'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobKey> for String {
    fn from(key: JobKey) -> Self {
        key.0
    }
}

// ---------------------------------------------------------------------------
// JobState
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
///
/// ```text
/// Pending -> Running -> Done
///                    \-> Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Done,
    Error,
}

impl JobState {
    /// `Done` and `Error` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Error)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Running -> Running` is accepted so progress updates can restate the
    /// current state.
    pub fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Pending, JobState::Running)
                | (JobState::Running, JobState::Running)
                | (JobState::Running, JobState::Done)
                | (JobState::Running, JobState::Error)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Done => "done",
            JobState::Error => "error",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// One produced output file, tagged with the task it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Id of the task that produced this artifact.
    pub task: String,
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Public retrieval path, e.g. `/results/{key}/{task}.png`.
    pub url: String,
}

// ---------------------------------------------------------------------------
// JobUpdate
// ---------------------------------------------------------------------------

/// A partial update merged into a [`Job`] by [`Job::apply`].
///
/// Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub state: Option<JobState>,
    pub artifact: Option<Artifact>,
    pub expected_count: Option<usize>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn state(state: JobState) -> Self {
        Self {
            state: Some(state),
            ..Default::default()
        }
    }

    pub fn artifact(artifact: Artifact) -> Self {
        Self {
            artifact: Some(artifact),
            ..Default::default()
        }
    }

    pub fn expected_count(count: usize) -> Self {
        Self {
            expected_count: Some(count),
            ..Default::default()
        }
    }

    /// Move the job to `Error` and record why.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: Some(JobState::Error),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_none()
            && self.artifact.is_none()
            && self.expected_count.is_none()
            && self.error.is_none()
    }
}

/// Reasons a [`JobUpdate`] can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("job is already {0} and accepts no further updates")]
    AlreadyTerminal(JobState),

    #[error("illegal state transition {from} -> {to}")]
    InvalidTransition { from: JobState, to: JobState },

    #[error("expected count is already fixed at {0}")]
    ExpectedCountFixed(usize),

    #[error("expected count {expected} is below the {recorded} artifacts already recorded")]
    ExpectedCountTooLow { expected: usize, recorded: usize },

    #[error("artifact would exceed the expected count of {expected}")]
    ArtifactOverflow { expected: usize },
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Progress record for one job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    key: JobKey,
    state: JobState,
    started_at: Timestamp,
    ended_at: Option<Timestamp>,
    artifacts: Vec<Artifact>,
    expected_count: Option<usize>,
    error: Option<String>,
}

impl Job {
    /// Create a job in the `Pending` state.
    ///
    /// `expected_count` may be `None` when the task list is not known yet;
    /// it can then be fixed once through [`JobUpdate::expected_count`].
    pub fn new(key: JobKey, expected_count: Option<usize>) -> Self {
        Self {
            key,
            state: JobState::Pending,
            started_at: chrono::Utc::now(),
            ended_at: None,
            artifacts: Vec::new(),
            expected_count,
            error: None,
        }
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<Timestamp> {
        self.ended_at
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn expected_count(&self) -> Option<usize> {
        self.expected_count
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Merge `update` into the job.
    ///
    /// The whole update is validated first; on error nothing changes.
    /// Reaching a terminal state stamps `ended_at`.
    pub fn apply(&mut self, update: JobUpdate) -> Result<(), TransitionError> {
        if self.state.is_terminal() && !update.is_empty() {
            return Err(TransitionError::AlreadyTerminal(self.state));
        }

        if let Some(expected) = update.expected_count {
            if let Some(fixed) = self.expected_count {
                return Err(TransitionError::ExpectedCountFixed(fixed));
            }
            if expected < self.artifacts.len() {
                return Err(TransitionError::ExpectedCountTooLow {
                    expected,
                    recorded: self.artifacts.len(),
                });
            }
        }

        if update.artifact.is_some() {
            let expected = update
                .expected_count
                .or(self.expected_count)
                .unwrap_or(0);
            if self.artifacts.len() >= expected {
                return Err(TransitionError::ArtifactOverflow { expected });
            }
        }

        if let Some(next) = update.state {
            if !self.state.can_transition_to(next) {
                return Err(TransitionError::InvalidTransition {
                    from: self.state,
                    to: next,
                });
            }
        }

        if let Some(expected) = update.expected_count {
            self.expected_count = Some(expected);
        }
        if let Some(artifact) = update.artifact {
            self.artifacts.push(artifact);
        }
        if let Some(error) = update.error {
            self.error = Some(error);
        }
        if let Some(next) = update.state {
            self.state = next;
            if next.is_terminal() {
                self.ended_at = Some(chrono::Utc::now());
            }
        }

        Ok(())
    }
}
