//! Tool runner backed by real child processes.

use super::{ToolCommand, ToolOutput, ToolRunner};
use crate::error::{MigrateError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs tools as child processes.
///
/// stderr (where the tools write `--verbose` progress) is streamed into the
/// log at debug level and kept for error reporting. stdout is discarded.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    fn locate(&self, program: &str) -> std::result::Result<PathBuf, String> {
        which::which(program).map_err(|e| e.to_string())
    }

    async fn run(&self, command: &ToolCommand, cancel: &CancellationToken) -> Result<ToolOutput> {
        if cancel.is_cancelled() {
            return Err(MigrateError::Cancelled);
        }
        debug!("Running: {}", command.display());

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MigrateError::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to launch {}: {}", command.program, e),
                ))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MigrateError::Io(std::io::Error::other("stderr was not captured")))?;

        let tool = command.tool;
        let collect = async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Some(line) = lines.next_line().await? {
                if tool.reports_progress() {
                    info!(target: "pg_dump_migrate::tool", "{}: {}", tool, line);
                } else {
                    debug!(target: "pg_dump_migrate::tool", "{}: {}", tool, line);
                }
                collected.push(line);
            }
            Ok::<_, std::io::Error>(collected)
        };
        let finish = async { tokio::join!(collect, child.wait()) };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                // kill_on_drop terminates the child when it goes out of scope
                warn!("Cancelling running {}", tool);
                Err(MigrateError::Cancelled)
            }
            (lines, status) = finish => {
                let status = status?;
                let stderr = lines?;
                Ok(ToolOutput {
                    exit_code: status.code(),
                    stderr,
                })
            }
        }
    }
}
