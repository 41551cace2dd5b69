//! Render stage backed by an OpenAI-compatible chat completions API.
//!
//! Asks the model to turn a React component, rendered inside the app's
//! layout component, into one static HTML document with mock data.

use async_trait::async_trait;
use preview_core::naming::OUTPUT_CSS_FILE;
use preview_core::project::Task;
use preview_core::stage::{RenderError, Renderer};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4-1106-preview";

const SYSTEM_PROMPT: &str = "You convert React components into static HTML. \
Reply with a single HTML document only, without markdown code fences.";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// HTTP client for the chat completions endpoint.
pub struct OpenAiRenderer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiRenderer {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl Renderer for OpenAiRenderer {
    async fn render(&self, task: &Task) -> Result<String, RenderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(SYSTEM_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(build_prompt(task)),
                },
            ],
        };

        tracing::debug!(task = %task.id(), model = %self.model, "Requesting markup");

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RenderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RenderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| RenderError::Request(e.to_string()))?;

        extract_markup(parsed)
    }
}

/// Build the user prompt for one task.
pub fn build_prompt(task: &Task) -> String {
    let layout = task.layout();
    let component = task.source();
    format!(
        "Render {component_name} as the child of {layout_name} and produce one \
standalone HTML page that looks like the rendered React tree.\n\
- Fill the page with plausible mock data.\n\
- Link the stylesheet ./{css} in the document head.\n\
- Use Tailwind utility classes for styling.\n\
- For images use https://picsum.photos/{{width}}/{{height}} with the size you need.\n\
\n\
{layout_name}:\n```\n{layout_src}\n```\n\
{component_name}:\n```\n{component_src}\n```\n",
        component_name = component.name,
        layout_name = layout.name,
        css = OUTPUT_CSS_FILE,
        layout_src = layout.content,
        component_src = component.content,
    )
}

/// Pull the markup out of a completion, rejecting empty answers.
fn extract_markup(response: ChatResponse) -> Result<String, RenderError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    let markup = strip_code_fence(&content);
    if markup.is_empty() {
        return Err(RenderError::Empty);
    }
    Ok(markup.to_string())
}

/// Remove a surrounding markdown code fence (```` ```html ... ``` ````) if
/// the model added one anyway.
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `html`) on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}
