//! Capture stage backed by a headless Chromium binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use preview_core::stage::{CaptureError, Capturer};
use tokio::process::Command;
use url::Url;

use crate::subprocess::run_command;

pub const DEFAULT_CHROMIUM_BIN: &str = "chromium";
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1400;
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 900;

/// Screenshots a local HTML file with `chromium --headless --screenshot`.
#[derive(Debug, Clone)]
pub struct ChromiumCapturer {
    binary: String,
    width: u32,
    height: u32,
}

impl ChromiumCapturer {
    pub fn new(binary: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            binary: binary.into(),
            width,
            height,
        }
    }

    /// Command-line arguments for one capture.
    fn args(&self, page: &Url, image: &Path) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--window-size={},{}", self.width, self.height),
            format!("--screenshot={}", image.display()),
            page.to_string(),
        ]
    }
}

impl Default for ChromiumCapturer {
    fn default() -> Self {
        Self::new(
            DEFAULT_CHROMIUM_BIN,
            DEFAULT_VIEWPORT_WIDTH,
            DEFAULT_VIEWPORT_HEIGHT,
        )
    }
}

#[async_trait]
impl Capturer for ChromiumCapturer {
    async fn capture(&self, markup: &Path, image: &Path) -> Result<PathBuf, CaptureError> {
        let markup = tokio::fs::canonicalize(markup)
            .await
            .map_err(CaptureError::Spawn)?;
        let page = page_url(&markup)?;
        let image = std::path::absolute(image).map_err(CaptureError::Spawn)?;

        tracing::debug!(page = %page, image = %image.display(), "Capturing page");

        let mut cmd = Command::new(&self.binary);
        cmd.args(self.args(&page, &image));

        let output = run_command(&mut cmd, None)
            .await
            .map_err(CaptureError::Spawn)?;

        if !output.success() {
            return Err(CaptureError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        verify_image(&image).await?;
        Ok(image)
    }
}

/// `file://` URL of an absolute markup path.
fn page_url(markup: &Path) -> Result<Url, CaptureError> {
    Url::from_file_path(markup).map_err(|()| CaptureError::InvalidMarkup(markup.to_path_buf()))
}

/// Check that `path` holds a decodable image header.
async fn verify_image(path: &Path) -> Result<(), CaptureError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(CaptureError::MissingOutput(path.to_path_buf()));
    }

    let owned = path.to_path_buf();
    let dimensions = tokio::task::spawn_blocking(move || image::image_dimensions(&owned))
        .await
        .map_err(|e| CaptureError::InvalidImage(e.to_string()))?
        .map_err(|e| CaptureError::InvalidImage(e.to_string()))?;

    tracing::debug!(width = dimensions.0, height = dimensions.1, "Captured image verified");
    Ok(())
}
