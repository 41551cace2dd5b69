//! Shared subprocess management for the command-line stages.
//!
//! Provides [`run_command`], the spawn + capture logic used by the style
//! build and capture stages. Each stage builds a [`tokio::process::Command`]
//! with its program and arguments and delegates the I/O handling here.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Maximum stdout or stderr size captured per stream (1 MiB).
const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit code (`None` if killed by a signal).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawn `cmd`, capture stdout/stderr and wait for it to exit.
///
/// The child is spawned with `kill_on_drop(true)`: when a caller abandons the
/// returned future (e.g. a stage timeout fires) the process is killed.
pub async fn run_command(
    cmd: &mut Command,
    working_dir: Option<&Path>,
) -> Result<CommandOutput, std::io::Error> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    // Pipes are drained while waiting; a full pipe would stall the child.
    let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
    let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

    let status = child.wait().await?;

    let stdout_bytes = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    Ok(CommandOutput {
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Split a configured command line like `"npx tailwindcss"` into a program
/// and its leading arguments.
///
/// Returns `None` for a blank command.
pub fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

/// Read an entire output stream into a byte buffer, capped at [`MAX_OUTPUT_BYTES`].
async fn read_stream<R: AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_OUTPUT_BYTES as u64)
            .read_to_end(&mut buf)
            .await;
    }
    buf
}
