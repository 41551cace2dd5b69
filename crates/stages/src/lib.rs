//! Concrete collaborators for the preview pipeline.
//!
//! - [`project_api`]: fetches a generated app's component files.
//! - [`openai`]: renders a component to HTML through a chat completion.
//! - [`tailwind`]: compiles the job stylesheet with the Tailwind CLI.
//! - [`chromium`]: screenshots rendered pages with headless Chromium.

use std::sync::Arc;

use preview_core::stage::StageSet;

pub mod chromium;
pub mod config;
pub mod openai;
pub mod project_api;
pub mod subprocess;
pub mod tailwind;

pub use config::StageConfig;

/// Build the production [`StageSet`] from configuration.
///
/// The resolver and renderer share one HTTP connection pool.
pub fn stage_set(config: &StageConfig) -> StageSet {
    let client = reqwest::Client::new();

    StageSet {
        resolver: Arc::new(project_api::HttpProjectResolver::new(
            client.clone(),
            config.project_api_url.clone(),
            config.task_limit,
        )),
        renderer: Arc::new(openai::OpenAiRenderer::new(
            client,
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
        )),
        style: Arc::new(tailwind::TailwindBuilder::from_command_line(
            &config.tailwind_command,
        )),
        capturer: Arc::new(chromium::ChromiumCapturer::new(
            config.chromium_bin.clone(),
            config.viewport_width,
            config.viewport_height,
        )),
    }
}
