//! Child process execution with a wall-clock timeout and an output cap

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{ChildStdin, Command};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use titan_common::{CommandInvocation, CommandRunner, InvokeOptions, TitanError, TitanResult};

/// Runs commands directly (no shell) on the tokio runtime.
///
/// Children are spawned with `kill_on_drop`, so a timeout or an output
/// overflow kills the process when the invocation returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    #[instrument(skip(self, command, options), fields(command = %command))]
    async fn run(&self, command: &CommandInvocation, options: &InvokeOptions) -> TitanResult<String> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TitanError::Command(format!("failed to start {}: {}", command.program, e)))?;

        let limit = options.max_output_bytes;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let work = async {
            let (_, out, err) = tokio::try_join!(
                feed_stdin(stdin, command.stdin.as_deref()),
                read_capped(stdout, limit),
                read_capped(stderr, limit),
            )?;
            let status = child.wait().await?;
            Ok::<_, TitanError>((status, out, err))
        };

        let (status, out, err) = match timeout(options.timeout, work).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(after_secs = options.timeout.as_secs(), "command timed out, killing");
                return Err(TitanError::AdapterTimeout { after: options.timeout });
            }
        };

        let stdout = String::from_utf8_lossy(&out).into_owned();
        let stderr = String::from_utf8_lossy(&err).into_owned();
        debug!(code = ?status.code(), stdout_bytes = out.len(), stderr_bytes = err.len(), "command exited");

        if !status.success() {
            let detail = stderr.trim();
            let detail = if detail.is_empty() { stdout.trim() } else { detail };
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(TitanError::Command(format!(
                "{} exited with status {}: {}",
                command.program,
                code,
                last_lines(detail, 5)
            )));
        }

        if stdout.trim().is_empty() {
            Ok(stderr)
        } else {
            Ok(stdout)
        }
    }
}

async fn feed_stdin(pipe: Option<ChildStdin>, input: Option<&str>) -> TitanResult<()> {
    if let (Some(mut pipe), Some(input)) = (pipe, input) {
        pipe.write_all(input.as_bytes()).await?;
        // dropping the pipe closes it so the child sees EOF
    }
    Ok(())
}

async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, limit: usize) -> TitanResult<Vec<u8>> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    let mut buf = Vec::new();
    let mut capped = reader.take(limit as u64 + 1);
    capped.read_to_end(&mut buf).await?;
    if buf.len() > limit {
        return Err(TitanError::OutputTooLarge { limit });
    }
    Ok(buf)
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
