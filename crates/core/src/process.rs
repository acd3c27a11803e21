//! Command runner.
//!
//! Runs one command line through the platform shell and returns its captured
//! stdout. Both streams are read with a byte ceiling; a process that writes
//! past it is killed and reported as [`ProcessFailure::OutputLimit`].

use crate::error::{Error, ProcessFailure, Result};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Number of stderr lines kept in process errors
pub const STDERR_SNIPPET_LINES: usize = 20;

/// Run `command` to completion and return its stdout.
///
/// # Errors
///
/// Fails with [`Error::Process`] if the command cannot be spawned, exits with a
/// non-zero code, is killed by a signal, or writes more than
/// `max_output_bytes` to either stream.
pub async fn run_command(command: &str, max_output_bytes: usize) -> Result<String> {
    tracing::debug!(command = %command, max_output_bytes, "Running command");

    let mut child = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::process(command, ProcessFailure::Spawn(e.to_string()), ""))?;

    let spawn_error = |e: std::io::Error| {
        Error::process(command, ProcessFailure::Spawn(e.to_string()), "")
    };

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let captured = tokio::try_join!(
        read_bounded(stdout, max_output_bytes),
        read_bounded(stderr, max_output_bytes)
    );
    let (stdout, stderr) = match captured {
        Ok(streams) => streams,
        Err(failure) => {
            // Ignore kill errors: the process may have exited on its own already.
            let _ = child.kill().await;
            return Err(match failure {
                CaptureError::Overflow => {
                    tracing::warn!(command = %command, limit = max_output_bytes, "Command output exceeded limit");
                    Error::process(command, ProcessFailure::OutputLimit(max_output_bytes), "")
                }
                CaptureError::Io(e) => spawn_error(e),
            });
        }
    };

    let status = child.wait().await.map_err(spawn_error)?;
    let stderr = String::from_utf8_lossy(&stderr);

    if let Some(reason) = failure(status) {
        tracing::warn!(command = %command, status = %status, "Command failed");
        return Err(Error::process(
            command,
            reason,
            tail(&stderr, STDERR_SNIPPET_LINES),
        ));
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

enum CaptureError {
    Overflow,
    Io(std::io::Error),
}

type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// Read a stream to its end, failing as soon as it exceeds `limit` bytes.
async fn read_bounded<R>(reader: Option<R>, limit: usize) -> CaptureResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let ceiling = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    let mut buffer = Vec::new();
    reader
        .take(ceiling)
        .read_to_end(&mut buffer)
        .await
        .map_err(CaptureError::Io)?;
    if buffer.len() > limit {
        return Err(CaptureError::Overflow);
    }
    Ok(buffer)
}

fn failure(status: ExitStatus) -> Option<ProcessFailure> {
    if status.success() {
        return None;
    }
    if let Some(code) = status.code() {
        return Some(ProcessFailure::ExitCode(code));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(ProcessFailure::Signal(signal));
        }
    }
    Some(ProcessFailure::ExitCode(-1))
}

fn tail(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.trim_end().lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
