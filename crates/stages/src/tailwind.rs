//! Style build stage backed by the Tailwind CSS command-line tool.

use std::path::Path;

use async_trait::async_trait;
use preview_core::naming::{INPUT_CSS_FILE, OUTPUT_CSS_FILE};
use preview_core::stage::{StyleBuildError, StyleBuilder};
use tokio::process::Command;

use crate::subprocess::{run_command, split_command};

/// Default command used to invoke Tailwind.
pub const DEFAULT_TAILWIND_COMMAND: &str = "npx tailwindcss";

/// Runs `{command} -i main.css -o main.output.css` inside a job directory.
///
/// Tailwind scans the directory's `.html` files (per the job's
/// `tailwind.config.js`), so rebuilding after each rendered task picks up the
/// classes of every page written so far.
#[derive(Debug, Clone)]
pub struct TailwindBuilder {
    program: String,
    args: Vec<String>,
}

impl TailwindBuilder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a whitespace-separated command line, falling back to
    /// [`DEFAULT_TAILWIND_COMMAND`] when blank.
    pub fn from_command_line(command: &str) -> Self {
        let (program, args) = split_command(command)
            .or_else(|| split_command(DEFAULT_TAILWIND_COMMAND))
            .unwrap_or_default();
        Self { program, args }
    }
}

#[async_trait]
impl StyleBuilder for TailwindBuilder {
    async fn build(&self, work_dir: &Path) -> Result<(), StyleBuildError> {
        tracing::debug!(dir = %work_dir.display(), program = %self.program, "Running style build");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(["-i", INPUT_CSS_FILE, "-o", OUTPUT_CSS_FILE]);

        let output = run_command(&mut cmd, Some(work_dir))
            .await
            .map_err(StyleBuildError::Spawn)?;

        if !output.success() {
            return Err(StyleBuildError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        tracing::debug!(duration_ms = output.duration_ms, "Style build finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn zero_exit_is_success() {
        let dir = tempfile::tempdir().unwrap();
        let builder = TailwindBuilder::new("true", vec![]);
        builder.build(dir.path()).await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let builder = TailwindBuilder::new("false", vec![]);
        let err = builder.build(dir.path()).await.unwrap_err();
        assert_matches!(err, StyleBuildError::Failed { exit_code: Some(1), .. });
    }

    #[tokio::test]
    async fn receives_input_and_output_arguments() {
        let dir = tempfile::tempdir().unwrap();
        // `sh -c SCRIPT NAME ARGS...`: the script writes its arguments to a file.
        let builder = TailwindBuilder::new(
            "sh",
            vec![
                "-c".to_string(),
                "echo \"$@\" > args.txt".to_string(),
                "tailwind".to_string(),
            ],
        );
        builder.build(dir.path()).await.unwrap();

        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "-i main.css -o main.output.css");
    }

    #[test]
    fn blank_command_falls_back_to_default() {
        let builder = TailwindBuilder::from_command_line("  ");
        assert_eq!(builder.program, "npx");
        assert_eq!(builder.args, vec!["tailwindcss".to_string()]);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let builder = TailwindBuilder::new("/nonexistent/tailwind", vec![]);
        let err = builder.build(dir.path()).await.unwrap_err();
        assert_matches!(err, StyleBuildError::Spawn(_));
    }
}
