use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Hard ceiling on a scheduled run.
pub const RUN_TIMEOUT: Duration = Duration::from_secs(600);

/// Synthetic stderr line recorded when the ceiling is hit.
pub const TIMEOUT_MESSAGE: &str = "Error: Command timed out after 10 minutes.";

#[derive(Debug)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub cancelled: bool,
}

/// Run a shell command capturing stdout and stderr line by line.
///
/// The command is handed to `sh -c` so agent invocations can use pipes and
/// quoting. Timeout and cancellation both kill the child; the readers drain
/// whatever was written before the pipes closed.
pub async fn execute_command(
    command: &str,
    timeout: Duration,
    cancel: CancellationToken,
) -> ExecOutcome {
    let mut child = match Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return ExecOutcome {
                stdout: String::new(),
                stderr: format!("Failed to execute command: {e}"),
                exit_code: -1,
                timed_out: false,
                cancelled: false,
            };
        }
    };

    let stdout_task = child.stdout.take().map(|out| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            let mut buf = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if !buf.is_empty() {
                    buf.push('\n');
                }
                buf.push_str(&line);
            }
            buf
        })
    });
    let stderr_task = child.stderr.take().map(|err| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            let mut buf = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if !buf.is_empty() {
                    buf.push('\n');
                }
                buf.push_str(&line);
            }
            buf
        })
    });

    let mut exit_code = -1;
    let mut timed_out = false;
    let mut cancelled = false;

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => exit_code = status.code().unwrap_or(-1),
            Err(e) => tracing::warn!("Failed to wait for child: {e}"),
        },
        _ = tokio::time::sleep(timeout) => {
            timed_out = true;
            let _ = child.kill().await;
        }
        _ = cancel.cancelled() => {
            cancelled = true;
            let _ = child.kill().await;
        }
    }

    let mut stdout = String::new();
    if let Some(task) = stdout_task {
        if let Ok(buf) = task.await {
            stdout = buf;
        }
    }
    let mut stderr = String::new();
    if let Some(task) = stderr_task {
        if let Ok(buf) = task.await {
            stderr = buf;
        }
    }

    if timed_out {
        if !stderr.is_empty() {
            stderr.push('\n');
        }
        stderr.push_str(TIMEOUT_MESSAGE);
    }

    ExecOutcome {
        stdout,
        stderr,
        exit_code,
        timed_out,
        cancelled,
    }
}
