//! Deterministic file naming for job work directories.
//!
//! Layout of one job directory:
//!
//! ```text
//! {results_root}/{key}/tailwind.config.js
//! {results_root}/{key}/main.css
//! {results_root}/{key}/main.output.css
//! {results_root}/{key}/{task}.html
//! {results_root}/{key}/{task}.png
//! ```

use std::path::{Path, PathBuf};

use crate::job::JobKey;

/// Tailwind configuration written once per job.
pub const TAILWIND_CONFIG_FILE: &str = "tailwind.config.js";

/// Stylesheet input holding the Tailwind directives.
pub const INPUT_CSS_FILE: &str = "main.css";

/// Compiled stylesheet linked from every rendered page.
pub const OUTPUT_CSS_FILE: &str = "main.output.css";

/// Work directory of a job.
pub fn job_dir(results_root: &Path, key: &JobKey) -> PathBuf {
    results_root.join(key.as_str())
}

/// Rendered markup file for a task: `{task}.html`.
pub fn markup_filename(task_id: &str) -> String {
    format!("{task_id}.html")
}

/// Captured image file for a task: `{task}.png`.
pub fn image_filename(task_id: &str) -> String {
    format!("{task_id}.png")
}

/// Public URL under which a task image is served.
///
/// `prefix` is the mount point of the results directory, e.g. `/results`.
/// A trailing slash on the prefix is tolerated.
///
/// ```
/// use preview_core::job::JobKey;
/// use preview_core::naming::artifact_url;
///
/// let key = JobKey::parse("app-1").unwrap();
/// assert_eq!(artifact_url("/results", &key, "Dashboard"), "/results/app-1/Dashboard.png");
/// assert_eq!(artifact_url("/results/", &key, "Dashboard"), "/results/app-1/Dashboard.png");
/// ```
pub fn artifact_url(prefix: &str, key: &JobKey, task_id: &str) -> String {
    format!(
        "{}/{}/{}",
        prefix.trim_end_matches('/'),
        key,
        image_filename(task_id)
    )
}
