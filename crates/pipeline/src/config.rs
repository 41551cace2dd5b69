use std::path::PathBuf;
use std::time::Duration;

/// Per-stage time limits. A stage exceeding its limit fails the task.
#[derive(Debug, Clone, Copy)]
pub struct StageTimeouts {
    pub resolve: Duration,
    pub render: Duration,
    pub style: Duration,
    pub capture: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            resolve: Duration::from_secs(30),
            render: Duration::from_secs(180),
            style: Duration::from_secs(60),
            capture: Duration::from_secs(60),
        }
    }
}

/// Job engine configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory holding one work directory per job.
    pub results_dir: PathBuf,
    /// URL prefix under which `results_dir` is served.
    pub public_prefix: String,
    pub timeouts: StageTimeouts,
    /// How long terminal jobs stay in the registry (`None` = forever).
    pub retention: Option<Duration>,
    /// How often the retention sweeper runs.
    pub sweep_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("./results"),
            public_prefix: "/results".to_string(),
            timeouts: StageTimeouts::default(),
            retention: None,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default      |
    /// |-------------------------|--------------|
    /// | `RESULTS_DIR`           | `./results`  |
    /// | `PUBLIC_RESULTS_PREFIX` | `/results`   |
    /// | `RESOLVE_TIMEOUT_SECS`  | `30`         |
    /// | `RENDER_TIMEOUT_SECS`   | `180`        |
    /// | `STYLE_TIMEOUT_SECS`    | `60`         |
    /// | `CAPTURE_TIMEOUT_SECS`  | `60`         |
    /// | `JOB_RETENTION_SECS`    | unset        |
    /// | `RETENTION_SWEEP_SECS`  | `300`        |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let timeouts = StageTimeouts {
            resolve: secs_var("RESOLVE_TIMEOUT_SECS").unwrap_or(defaults.timeouts.resolve),
            render: secs_var("RENDER_TIMEOUT_SECS").unwrap_or(defaults.timeouts.render),
            style: secs_var("STYLE_TIMEOUT_SECS").unwrap_or(defaults.timeouts.style),
            capture: secs_var("CAPTURE_TIMEOUT_SECS").unwrap_or(defaults.timeouts.capture),
        };

        Self {
            results_dir: std::env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
            public_prefix: std::env::var("PUBLIC_RESULTS_PREFIX")
                .unwrap_or(defaults.public_prefix),
            timeouts,
            retention: secs_var("JOB_RETENTION_SECS"),
            sweep_interval: secs_var("RETENTION_SWEEP_SECS").unwrap_or(defaults.sweep_interval),
        }
    }
}

/// Parse an optional whole-seconds environment variable.
fn secs_var(name: &str) -> Option<Duration> {
    std::env::var(name).ok().map(|v| {
        let secs: u64 = v
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid u64"));
        Duration::from_secs(secs)
    })
}
