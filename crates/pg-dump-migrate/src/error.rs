//! Error types for the migration library.

use crate::orchestrator::Stage;
use crate::tools::Tool;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for configuration errors and failed pipeline stages.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for file IO errors outside the pipeline (e.g. unreadable config).
pub const EXIT_IO_ERROR: u8 = 7;

/// Exit code when the run was interrupted by a signal.
pub const EXIT_CANCELLED: u8 = 130;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required client tool is not installed
    #[error("Required tool '{tool}' not found: {message}")]
    ToolMissing { tool: Tool, message: String },

    /// An endpoint did not accept the connectivity probe
    #[error("Cannot connect to {endpoint} database: {message}")]
    Connection { endpoint: String, message: String },

    /// pg_dump failed
    #[error("Export failed: {0}")]
    Export(String),

    /// pg_restore could not be run at all (a non-zero exit is only a warning)
    #[error("Import failed: {0}")]
    Import(String),

    /// Dropping or recreating the target schema failed
    #[error("Schema reset failed: {0}")]
    Reset(String),

    /// Removing the backup file failed
    #[error("Failed to remove backup file {path:?}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading an operator answer failed
    #[error("Prompt failed: {0}")]
    Prompt(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, etc.)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Connection error for the named endpoint.
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Pipeline stage this error aborted, if it came from one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MigrateError::ToolMissing { .. } => Some(Stage::ToolCheck),
            MigrateError::Connection { endpoint, .. } if endpoint == "source" => {
                Some(Stage::SourceCheck)
            }
            MigrateError::Connection { .. } => Some(Stage::TargetCheck),
            MigrateError::Export(_) => Some(Stage::Export),
            MigrateError::Reset(_) => Some(Stage::Reset),
            MigrateError::Import(_) => Some(Stage::Import),
            MigrateError::Cleanup { .. } => Some(Stage::Cleanup),
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Io(_) => EXIT_IO_ERROR,
            MigrateError::Cancelled => EXIT_CANCELLED,
            _ => EXIT_FAILURE,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = match self.stage() {
            Some(stage) => format!("Error: aborted at {}: {}\n", stage, self),
            None => format!("Error: {}\n", self),
        };

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
