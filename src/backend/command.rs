//! External command execution
//!
//! Thin wrapper around tokio's process support that pipes subprocess output
//! through the log line by line and enforces a hard timeout.

use log::{debug, error};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::CommandError;

/// Runs external commands, capturing stdout for the caller
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        CommandRunner { timeout }
    }

    /// Run `program` with `args` and return its stdout lines.
    ///
    /// Non-empty stdout lines are logged at debug level and stderr lines at
    /// error level as they are produced. A run that exceeds the timeout is
    /// killed and reported like a nonzero exit.
    pub async fn run(&self, program: &str, args: &[String]) -> Result<Vec<String>, CommandError> {
        debug!("Running command: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Drain both pipes while waiting so the child never blocks on a
        // full pipe buffer.
        let stdout_task = tokio::spawn(collect_stdout(child.stdout.take()));
        let stderr_task = tokio::spawn(log_stderr(child.stderr.take()));

        let waited = timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                let _ = child.kill().await;
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let lines = stdout_task.await.map_err(io::Error::from)?;
        stderr_task.await.map_err(io::Error::from)?;

        if !status.success() {
            return Err(CommandError::NonZeroExit {
                program: program.to_string(),
                code: status.code(),
            });
        }

        Ok(lines)
    }
}

async fn collect_stdout<R>(reader: Option<R>) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return Vec::new();
    };

    let mut lines = BufReader::new(reader).lines();
    let mut collected = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        debug!("[xfs_quota] {}", line);
        collected.push(line);
    }
    collected
}

async fn log_stderr<R>(reader: Option<R>)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return;
    };

    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        error!("[xfs_quota] {}", line);
    }
}
