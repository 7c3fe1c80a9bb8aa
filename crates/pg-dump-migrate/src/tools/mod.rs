//! External PostgreSQL client tools.
//!
//! The pipeline never talks to a database directly. Every stage is a
//! `pg_dump`, `pg_restore` or `psql` invocation described by a [`ToolCommand`]
//! and executed through a [`ToolRunner`], so tests can swap in a fake runner.

mod commands;
mod process;

pub use commands::*;
pub use process::ProcessRunner;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Environment variable libpq reads the password from.
pub const PASSWORD_ENV: &str = "PGPASSWORD";

/// The client tools the pipeline depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    PgDump,
    PgRestore,
    Psql,
}

impl Tool {
    /// Whether the tool's `--verbose` stderr is progress the operator should see.
    pub fn reports_progress(self) -> bool {
        matches!(self, Tool::PgDump | Tool::PgRestore)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tool::PgDump => "pg_dump",
            Tool::PgRestore => "pg_restore",
            Tool::Psql => "psql",
        })
    }
}

/// A fully built tool invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Which tool this runs.
    pub tool: Tool,

    /// Executable name or path.
    pub program: String,

    /// Command-line arguments.
    pub args: Vec<String>,

    /// Extra environment variables (carries the password).
    pub env: Vec<(String, String)>,
}

impl ToolCommand {
    /// Render the command line for logs. Environment values are never included.
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            if arg.is_empty() || !arg.chars().all(is_shell_safe) {
                out.push('\'');
                out.push_str(&arg.replace('\'', "'\\''"));
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '=' | ':' | '-')
}

impl fmt::Debug for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let env: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("ToolCommand")
            .field("tool", &self.tool)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &env)
            .finish()
    }
}

/// Outcome of a tool that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,

    /// Lines the tool wrote to stderr.
    pub stderr: Vec<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty stderr line, for error messages.
    pub fn last_error_line(&self) -> Option<&str> {
        self.stderr
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
    }

    /// Short description of a failed run.
    pub fn failure_summary(&self) -> String {
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        match self.last_error_line() {
            Some(line) => format!("{} ({})", status, line),
            None => status,
        }
    }
}

/// Executes tool commands.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Resolve an executable on the host.
    fn locate(&self, program: &str) -> std::result::Result<PathBuf, String>;

    /// Run a command to completion.
    ///
    /// A non-zero exit is reported through [`ToolOutput::exit_code`], not as an
    /// error; `Err` means the process could not be run or the run was cancelled.
    async fn run(&self, command: &ToolCommand, cancel: &CancellationToken) -> Result<ToolOutput>;
}
