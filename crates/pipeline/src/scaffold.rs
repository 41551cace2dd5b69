//! Shared per-job style scaffold.
//!
//! Every job directory gets a Tailwind configuration whose `primary` palette
//! aliases the project's color family, plus the stylesheet input that the
//! style stage compiles.

use std::path::Path;

use preview_core::naming::{INPUT_CSS_FILE, OUTPUT_CSS_FILE, TAILWIND_CONFIG_FILE};

use crate::error::SetupError;

/// Stylesheet input: the three Tailwind layers.
pub const MAIN_CSS: &str = "@tailwind base;\n@tailwind components;\n@tailwind utilities;\n";

/// Palette shades aliased under `primary`.
const SHADES: [u16; 10] = [50, 100, 200, 300, 400, 500, 600, 700, 800, 900];

/// Render `tailwind.config.js` for a project color family such as `"blue"`.
///
/// The color is spliced into JavaScript, so only lowercase ASCII letters are
/// accepted.
pub fn tailwind_config(primary_color: &str) -> Result<String, SetupError> {
    if primary_color.is_empty() || !primary_color.chars().all(|c| c.is_ascii_lowercase()) {
        return Err(SetupError::InvalidPrimaryColor(primary_color.to_string()));
    }

    let shades: String = SHADES
        .iter()
        .map(|shade| format!("          {shade}: colors.{primary_color}[{shade}],\n"))
        .collect();

    Ok(format!(
        r#"const colors = require('tailwindcss/colors')

/** @type {{import('tailwindcss').Config}} */
module.exports = {{
  content: ['./*.html'],
  theme: {{
    extend: {{
      colors: {{
        primary: {{
{shades}        }},
      }},
    }},
  }},
}}
"#
    ))
}

/// Create `work_dir`, drop outputs of any earlier run, and write the style
/// scaffold into it.
pub async fn prepare_work_dir(work_dir: &Path, primary_color: &str) -> Result<(), SetupError> {
    let config = tailwind_config(primary_color)?;

    tokio::fs::create_dir_all(work_dir).await?;
    let removed = clear_outputs(work_dir).await?;
    if removed > 0 {
        tracing::debug!(dir = %work_dir.display(), removed, "Removed outputs of a previous run");
    }
    tokio::fs::write(work_dir.join(TAILWIND_CONFIG_FILE), config).await?;
    tokio::fs::write(work_dir.join(INPUT_CSS_FILE), MAIN_CSS).await?;

    tracing::debug!(dir = %work_dir.display(), primary_color, "Work directory prepared");
    Ok(())
}

/// Whether `path` is a generated markup page, image or compiled stylesheet.
fn is_generated_output(path: &Path) -> bool {
    if path.file_name().is_some_and(|name| name == OUTPUT_CSS_FILE) {
        return true;
    }
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("html" | "png")
    )
}

/// Delete generated outputs directly inside `work_dir`; returns how many
/// files were removed.
async fn clear_outputs(work_dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(work_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() || !is_generated_output(&path) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(removed)
}
