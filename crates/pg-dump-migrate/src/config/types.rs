//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database the backup is taken from.
    pub source: EndpointConfig,

    /// Database the backup is restored into.
    pub target: EndpointConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// A PostgreSQL endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. May be left out when `password_env` is set.
    #[serde(default)]
    pub password: String,

    /// Environment variable to read the password from when `password` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Schema reset by the optional drop-and-recreate step (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,
}

impl fmt::Debug for EndpointConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("password_env", &self.password_env)
            .field("schema", &self.schema)
            .finish()
    }
}

impl EndpointConfig {
    /// `host:port/database` label used in logs. Never includes credentials.
    pub fn display_name(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Operator decision for an optional stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Prompt the operator when the stage is reached.
    #[default]
    Ask,

    /// Run the stage without asking.
    Yes,

    /// Skip the stage without asking.
    No,
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ask" => Ok(Decision::Ask),
            "yes" | "y" | "true" => Ok(Decision::Yes),
            "no" | "n" | "false" => Ok(Decision::No),
            other => Err(format!("expected ask, yes or no, got '{}'", other)),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Path of the intermediate custom-format archive (default: "backup.dump").
    #[serde(default = "default_backup_file")]
    pub backup_file: PathBuf,

    /// Whether to drop and recreate the target schema before import.
    #[serde(default)]
    pub reset_schema: Decision,

    /// Whether to delete the backup file after import.
    #[serde(default)]
    pub remove_backup: Decision,

    /// Pass `--no-owner` to pg_restore (default: false).
    #[serde(default)]
    pub no_owner: bool,

    /// Client tool locations.
    #[serde(default)]
    pub tools: ToolPaths,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            backup_file: default_backup_file(),
            reset_schema: Decision::Ask,
            remove_backup: Decision::Ask,
            no_owner: false,
            tools: ToolPaths::default(),
        }
    }
}

/// Names or paths of the PostgreSQL client tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default = "default_pg_dump")]
    pub pg_dump: String,

    #[serde(default = "default_pg_restore")]
    pub pg_restore: String,

    #[serde(default = "default_psql")]
    pub psql: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            pg_dump: default_pg_dump(),
            pg_restore: default_pg_restore(),
            psql: default_psql(),
        }
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_backup_file() -> PathBuf {
    PathBuf::from("backup.dump")
}

fn default_pg_dump() -> String {
    "pg_dump".to_string()
}

fn default_pg_restore() -> String {
    "pg_restore".to_string()
}

fn default_psql() -> String {
    "psql".to_string()
}
