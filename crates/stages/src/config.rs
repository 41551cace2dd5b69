use crate::chromium::{DEFAULT_CHROMIUM_BIN, DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
use crate::openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL};
use crate::project_api::DEFAULT_PROJECT_API_URL;
use crate::tailwind::DEFAULT_TAILWIND_COMMAND;

/// Settings of the external collaborators, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// App-generation result endpoint.
    pub project_api_url: String,
    /// Maximum components converted per project (`None` = all).
    pub task_limit: Option<usize>,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Command line used to invoke Tailwind, e.g. `npx tailwindcss`.
    pub tailwind_command: String,
    pub chromium_bin: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl StageConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var           | Default                                 |
    /// |-------------------|-----------------------------------------|
    /// | `PROJECT_API_URL` | app-generation result endpoint          |
    /// | `TASK_LIMIT`      | unset (all components)                  |
    /// | `OPENAI_API_KEY`  | empty (render requests will be refused) |
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1`             |
    /// | `OPENAI_MODEL`    | `gpt-4-1106-preview`                    |
    /// | `TAILWIND_COMMAND`| `npx tailwindcss`                       |
    /// | `CHROMIUM_BIN`    | `chromium`                              |
    /// | `VIEWPORT_WIDTH`  | `1400`                                  |
    /// | `VIEWPORT_HEIGHT` | `900`                                   |
    pub fn from_env() -> Self {
        let task_limit = std::env::var("TASK_LIMIT").ok().map(|v| {
            v.parse::<usize>()
                .expect("TASK_LIMIT must be a valid usize")
        });

        let viewport_width: u32 = std::env::var("VIEWPORT_WIDTH")
            .unwrap_or_else(|_| DEFAULT_VIEWPORT_WIDTH.to_string())
            .parse()
            .expect("VIEWPORT_WIDTH must be a valid u32");

        let viewport_height: u32 = std::env::var("VIEWPORT_HEIGHT")
            .unwrap_or_else(|_| DEFAULT_VIEWPORT_HEIGHT.to_string())
            .parse()
            .expect("VIEWPORT_HEIGHT must be a valid u32");

        let openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if openai_api_key.is_empty() {
            tracing::warn!("OPENAI_API_KEY is not set; render requests will fail");
        }

        Self {
            project_api_url: std::env::var("PROJECT_API_URL")
                .unwrap_or_else(|_| DEFAULT_PROJECT_API_URL.into()),
            task_limit,
            openai_api_key,
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.into()),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.into()),
            tailwind_command: std::env::var("TAILWIND_COMMAND")
                .unwrap_or_else(|_| DEFAULT_TAILWIND_COMMAND.into()),
            chromium_bin: std::env::var("CHROMIUM_BIN")
                .unwrap_or_else(|_| DEFAULT_CHROMIUM_BIN.into()),
            viewport_width,
            viewport_height,
        }
    }
}
