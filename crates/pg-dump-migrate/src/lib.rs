//! # pg-dump-migrate
//!
//! PostgreSQL to PostgreSQL migration driven by the stock client tools.
//!
//! The library runs a fixed pipeline against two configured endpoints:
//!
//! - **Preflight** checks that `pg_dump`, `pg_restore` and `psql` are installed
//!   and that both endpoints accept a connection
//! - **Export** writes a custom-format archive of the source database
//! - **Reset** optionally drops and recreates the target schema
//! - **Import** restores the archive into the target, tolerating
//!   "already exists" conflicts
//! - **Cleanup** optionally removes the archive
//!
//! ## Example
//!
//! ```rust,no_run
//! use pg_dump_migrate::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> pg_dump_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::new(config);
//!     let result = orchestrator.run(CancellationToken::new(), false).await?;
//!     println!("Backup size: {} bytes", result.backup_bytes);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod tools;

// Re-exports for convenient access
pub use config::{Config, Decision, EndpointConfig, MigrationConfig, ToolPaths};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    EndpointHealth, HealthCheckResult, ImportWarning, MigrationResult, Orchestrator, Stage,
};
pub use prompt::{Confirmer, LineConfirmer, ScriptedConfirmer};
pub use tools::{ProcessRunner, Tool, ToolCommand, ToolOutput, ToolRunner};
