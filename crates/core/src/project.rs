//! Project and task model.
//!
//! A generated app is addressed by its public URL; the last path segment is
//! the app id and becomes the [`JobKey`]. The app's `.jsx` components become
//! one [`Task`] each, rendered inside the shared layout component.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::CoreError;
use crate::job::JobKey;
use crate::stage::ResolveError;

/// Component suffix that marks the shared layout.
const LAYOUT_SUFFIX: &str = "Layout.jsx";

/// Components that are never previewed on their own.
const EXCLUDED_SUFFIXES: [&str; 3] = ["Login.jsx", "Signup.jsx", LAYOUT_SUFFIX];

// ---------------------------------------------------------------------------
// ProjectSource
// ---------------------------------------------------------------------------

/// A validated project URL together with the job key derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSource {
    url: Url,
    key: JobKey,
}

impl ProjectSource {
    /// Parse a project URL.
    ///
    /// Only `http`/`https` URLs are accepted. The key is the last non-empty
    /// path segment, so `https://host/result/abc` and `https://host/result/abc/`
    /// both resolve to `abc`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let url = Url::parse(raw.trim())
            .map_err(|e| CoreError::Validation(format!("invalid project URL: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::Validation(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            )));
        }

        let segment = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or_else(|| CoreError::Validation("project URL has no app id".into()))?;

        let key = JobKey::parse(segment)?;
        Ok(Self { url, key })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }
}

// ---------------------------------------------------------------------------
// SourceFile / Task
// ---------------------------------------------------------------------------

/// A source file as delivered by the project service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Base name of a component file: the last `/` segment up to its first `.`.
///
/// ```
/// use preview_core::project::base_name;
///
/// assert_eq!(base_name("src/pages/TodoList.jsx"), Some("TodoList"));
/// assert_eq!(base_name("src/.hidden.jsx"), None);
/// ```
pub fn base_name(file_name: &str) -> Option<&str> {
    file_name
        .rsplit('/')
        .next()
        .and_then(|last| last.split('.').next())
        .filter(|base| !base.is_empty())
}

/// One component to convert. Immutable once built.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    source: SourceFile,
    layout: Arc<SourceFile>,
}

impl Task {
    pub fn new(source: SourceFile, layout: Arc<SourceFile>) -> Result<Self, ResolveError> {
        let id = base_name(&source.name)
            .ok_or_else(|| ResolveError::InvalidFileName(source.name.clone()))?
            .to_string();
        Ok(Self { id, source, layout })
    }

    /// Task identity, used for artifact file names.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &SourceFile {
        &self.source
    }

    pub fn layout(&self) -> &SourceFile {
        &self.layout
    }
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// A resolved project: its palette seed, layout and ordered task list.
#[derive(Debug, Clone)]
pub struct Project {
    pub key: JobKey,
    /// Tailwind color family used for the `primary` palette, e.g. `"blue"`.
    pub primary_color: String,
    pub layout: Arc<SourceFile>,
    pub tasks: Vec<Task>,
}

impl Project {
    /// Build a project from the raw file list of a generated app.
    ///
    /// Keeps `.jsx` components except login, signup and layout screens,
    /// preserving their order. The first `*Layout.jsx` file becomes the shared
    /// layout and is required. `limit` truncates the task list.
    pub fn from_files(
        key: JobKey,
        primary_color: impl Into<String>,
        files: Vec<SourceFile>,
        limit: Option<usize>,
    ) -> Result<Self, ResolveError> {
        let components: Vec<SourceFile> = files
            .into_iter()
            .filter(|f| f.name.ends_with(".jsx"))
            .collect();

        let layout = components
            .iter()
            .find(|f| f.name.ends_with(LAYOUT_SUFFIX))
            .cloned()
            .map(Arc::new)
            .ok_or(ResolveError::MissingLayout)?;

        let mut selected: Vec<SourceFile> = components
            .into_iter()
            .filter(|f| !EXCLUDED_SUFFIXES.iter().any(|s| f.name.ends_with(s)))
            .collect();
        if let Some(limit) = limit {
            selected.truncate(limit);
        }

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(selected.len());
        for source in selected {
            let task = Task::new(source, Arc::clone(&layout))?;
            if !seen.insert(task.id().to_string()) {
                return Err(ResolveError::DuplicateTask(task.id().to_string()));
            }
            tasks.push(task);
        }

        Ok(Self {
            key,
            primary_color: primary_color.into(),
            layout,
            tasks,
        })
    }
}
