//! Migration orchestrator - main workflow coordinator.

mod health;
mod stage;

pub use health::{EndpointHealth, HealthCheckResult};
pub use stage::Stage;

use crate::config::{Config, Decision, EndpointConfig};
use crate::error::{MigrateError, Result};
use crate::prompt::{Confirmer, LineConfirmer};
use crate::tools::{
    dump_command, probe_command, reset_command, restore_command, ProcessRunner, Tool,
    ToolCommand, ToolOutput, ToolRunner,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Migration orchestrator.
pub struct Orchestrator {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    confirmer: Box<dyn Confirmer>,
}

/// Result of a migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status: "completed" or "dry_run".
    pub status: String,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// Path of the backup file.
    pub backup_file: PathBuf,

    /// Size of the backup file after export.
    pub backup_bytes: u64,

    /// Whether the target schema was dropped and recreated.
    pub schema_reset: bool,

    /// Set when pg_restore exited non-zero.
    pub import_warning: Option<ImportWarning>,

    /// Whether the backup file was deleted at the end.
    pub backup_removed: bool,
}

impl MigrationResult {
    /// Serialize the result as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A pg_restore run that exited non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportWarning {
    /// Exit code, `None` if terminated by a signal.
    pub exit_code: Option<i32>,

    /// stderr lines reporting an object that already exists.
    pub conflicts: usize,

    /// Error total from pg_restore's "errors ignored on restore" summary.
    pub errors_ignored: Option<u64>,
}

impl ImportWarning {
    fn from_output(output: &ToolOutput) -> Self {
        let conflicts = output
            .stderr
            .iter()
            .filter(|line| line.contains("already exists"))
            .count();
        let errors_ignored = output.stderr.iter().rev().find_map(|line| {
            let (_, count) = line.split_once("errors ignored on restore:")?;
            count.trim().parse().ok()
        });
        Self {
            exit_code: output.exit_code,
            conflicts,
            errors_ignored,
        }
    }
}

fn ensure_running(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(MigrateError::Cancelled)
    } else {
        Ok(())
    }
}

impl Orchestrator {
    /// Create an orchestrator that runs the real client tools and prompts on
    /// stdin.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            runner: Arc::new(ProcessRunner::new()),
            confirmer: Box::new(LineConfirmer::stdio()),
        }
    }

    /// Replace the tool runner.
    pub fn with_runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the source of operator answers.
    pub fn with_confirmer(mut self, confirmer: impl Confirmer + 'static) -> Self {
        self.confirmer = Box::new(confirmer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the migration.
    ///
    /// With `dry_run` only stages 1-3 execute; the commands of the remaining
    /// stages are logged instead of run.
    pub async fn run(mut self, cancel: CancellationToken, dry_run: bool) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        let backup_file = self.config.migration.backup_file.clone();

        info!("Starting migration run: {}", run_id);
        info!(
            "Source: {}, target: {}, backup file: {:?}",
            self.config.source.display_name(),
            self.config.target.display_name(),
            backup_file
        );

        // Stage 1
        self.enter(Stage::ToolCheck, &cancel)?;
        self.check_tools()?;

        // Stages 2 and 3: both endpoints are probed before either failure is reported
        self.enter(Stage::SourceCheck, &cancel)?;
        let source = self.probe(&self.config.source, &cancel).await?;
        self.enter(Stage::TargetCheck, &cancel)?;
        let target = self.probe(&self.config.target, &cancel).await?;
        if let Some(message) = source.error {
            if let Some(ref target_error) = target.error {
                error!("Target is unreachable as well: {}", target_error);
            }
            return Err(MigrateError::connection("source", message));
        }
        if let Some(message) = target.error {
            return Err(MigrateError::connection("target", message));
        }

        if dry_run {
            self.log_plan();
            return Ok(self.finish(MigrationResult {
                run_id,
                status: "dry_run".to_string(),
                duration_seconds: 0.0,
                started_at,
                completed_at: started_at,
                backup_file,
                backup_bytes: 0,
                schema_reset: false,
                import_warning: None,
                backup_removed: false,
            }));
        }

        self.enter(Stage::Export, &cancel)?;
        let backup_bytes = self.export(&cancel).await?;

        self.enter(Stage::Reset, &cancel)?;
        let schema_reset = self.reset_target(&cancel).await?;

        self.enter(Stage::Import, &cancel)?;
        let import_warning = self.import(&cancel).await?;

        self.enter(Stage::Cleanup, &cancel)?;
        let backup_removed = self.cleanup(&cancel)?;

        Ok(self.finish(MigrationResult {
            run_id,
            status: "completed".to_string(),
            duration_seconds: 0.0,
            started_at,
            completed_at: started_at,
            backup_file,
            backup_bytes,
            schema_reset,
            import_warning,
            backup_removed,
        }))
    }

    /// Run stages 1-3 and report both endpoints.
    pub async fn health_check(&self, cancel: CancellationToken) -> Result<HealthCheckResult> {
        self.check_tools()?;
        let source = self.probe(&self.config.source, &cancel).await?;
        let target = self.probe(&self.config.target, &cancel).await?;
        Ok(HealthCheckResult::new(source, target))
    }

    fn enter(&self, stage: Stage, cancel: &CancellationToken) -> Result<()> {
        ensure_running(cancel)?;
        info!("Stage {}/{}: {}", stage.number(), Stage::ALL.len(), stage.name());
        Ok(())
    }

    fn finish(&self, mut result: MigrationResult) -> MigrationResult {
        result.completed_at = Utc::now();
        result.duration_seconds =
            (result.completed_at - result.started_at).num_milliseconds() as f64 / 1000.0;

        match result.import_warning {
            Some(ref w) => info!(
                "Migration {} with import warnings ({} conflicts) in {:.1}s",
                result.status, w.conflicts, result.duration_seconds
            ),
            None => info!(
                "Migration {} in {:.1}s",
                result.status, result.duration_seconds
            ),
        }
        result
    }

    /// Stage 1: every client tool must resolve on the host.
    fn check_tools(&self) -> Result<()> {
        let tools = &self.config.migration.tools;
        for (tool, program) in [
            (Tool::PgDump, &tools.pg_dump),
            (Tool::PgRestore, &tools.pg_restore),
            (Tool::Psql, &tools.psql),
        ] {
            match self.runner.locate(program) {
                Ok(path) => debug!("Found {} at {:?}", tool, path),
                Err(message) => return Err(MigrateError::ToolMissing { tool, message }),
            }
        }
        Ok(())
    }

    /// Stages 2 and 3. Only cancellation is returned as an error; every other
    /// failure is recorded in the result.
    async fn probe(
        &self,
        endpoint: &EndpointConfig,
        cancel: &CancellationToken,
    ) -> Result<EndpointHealth> {
        let command = probe_command(&self.config.migration.tools, endpoint);
        let started = Instant::now();
        let outcome = self.runner.run(&command, cancel).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(output) if output.success() => None,
            Ok(output) => Some(output.failure_summary()),
            Err(MigrateError::Cancelled) => return Err(MigrateError::Cancelled),
            Err(e) => Some(e.to_string()),
        };

        match error {
            None => info!("Connected to {} ({}ms)", endpoint.display_name(), latency_ms),
            Some(ref e) => error!("Cannot connect to {}: {}", endpoint.display_name(), e),
        }

        Ok(EndpointHealth {
            endpoint: endpoint.display_name(),
            connected: error.is_none(),
            latency_ms,
            error,
        })
    }

    /// Stage 4. Returns the size of the written archive.
    async fn export(&self, cancel: &CancellationToken) -> Result<u64> {
        let backup_file = &self.config.migration.backup_file;
        let command = dump_command(
            &self.config.migration.tools,
            &self.config.source,
            backup_file,
        );

        info!(
            "Exporting {} to {:?}",
            self.config.source.display_name(),
            backup_file
        );
        let output = self.run_tool(&command, cancel, MigrateError::Export).await?;
        if !output.success() {
            return Err(MigrateError::Export(format!(
                "pg_dump failed with {}",
                output.failure_summary()
            )));
        }

        let metadata = std::fs::metadata(backup_file).map_err(|e| {
            MigrateError::Export(format!(
                "pg_dump succeeded but {:?} is not readable: {}",
                backup_file, e
            ))
        })?;
        info!("Export finished: {} bytes", metadata.len());
        Ok(metadata.len())
    }

    /// Stage 5. Returns whether the schema was reset.
    async fn reset_target(&mut self, cancel: &CancellationToken) -> Result<bool> {
        let target = &self.config.target;
        let question = format!(
            "Drop and recreate schema '{}' on {}? Everything in it will be lost",
            target.schema,
            target.display_name()
        );
        if !self.decide(self.config.migration.reset_schema, &question)? {
            info!("Keeping existing objects in the target schema");
            return Ok(false);
        }
        // The prompt may have blocked across a shutdown signal
        ensure_running(cancel)?;

        let command = reset_command(&self.config.migration.tools, &self.config.target);
        warn!(
            "Dropping schema '{}' on {}",
            self.config.target.schema,
            self.config.target.display_name()
        );
        let output = self.run_tool(&command, cancel, MigrateError::Reset).await?;
        if !output.success() {
            return Err(MigrateError::Reset(format!(
                "psql failed with {}",
                output.failure_summary()
            )));
        }
        info!("Schema '{}' recreated", self.config.target.schema);
        Ok(true)
    }

    /// Stage 6. A non-zero pg_restore exit is downgraded to a warning.
    async fn import(&self, cancel: &CancellationToken) -> Result<Option<ImportWarning>> {
        let backup_file = &self.config.migration.backup_file;
        let command = restore_command(
            &self.config.migration.tools,
            &self.config.target,
            backup_file,
            self.config.migration.no_owner,
        );

        info!(
            "Importing {:?} into {}",
            backup_file,
            self.config.target.display_name()
        );
        let output = self.run_tool(&command, cancel, MigrateError::Import).await?;
        if output.success() {
            info!("Import finished");
            return Ok(None);
        }

        let warning = ImportWarning::from_output(&output);
        warn!(
            "pg_restore finished with {}; {} objects already existed. Continuing",
            output.failure_summary(),
            warning.conflicts
        );
        Ok(Some(warning))
    }

    /// Stage 7. Returns whether the backup file was removed.
    fn cleanup(&mut self, cancel: &CancellationToken) -> Result<bool> {
        let backup_file = self.config.migration.backup_file.clone();
        let question = format!("Remove backup file {:?}?", backup_file);
        if !self.decide(self.config.migration.remove_backup, &question)? {
            info!("Keeping backup file {:?}", backup_file);
            return Ok(false);
        }
        ensure_running(cancel)?;

        std::fs::remove_file(&backup_file).map_err(|source| MigrateError::Cleanup {
            path: backup_file.clone(),
            source,
        })?;
        info!("Removed backup file {:?}", backup_file);
        Ok(true)
    }

    fn decide(&mut self, decision: Decision, question: &str) -> Result<bool> {
        match decision {
            Decision::Ask => self.confirmer.confirm(question),
            Decision::Yes => {
                debug!("Answered yes by configuration: {}", question);
                Ok(true)
            }
            Decision::No => {
                debug!("Answered no by configuration: {}", question);
                Ok(false)
            }
        }
    }

    /// Run a tool, turning launch failures into the stage's error.
    async fn run_tool(
        &self,
        command: &ToolCommand,
        cancel: &CancellationToken,
        stage_error: fn(String) -> MigrateError,
    ) -> Result<ToolOutput> {
        match self.runner.run(command, cancel).await {
            Ok(output) => Ok(output),
            Err(MigrateError::Cancelled) => Err(MigrateError::Cancelled),
            Err(e) => Err(stage_error(e.to_string())),
        }
    }

    fn log_plan(&self) {
        let tools = &self.config.migration.tools;
        let backup_file = &self.config.migration.backup_file;
        info!("Dry run: connectivity OK, nothing will be changed");
        info!(
            "  export:  {}",
            dump_command(tools, &self.config.source, backup_file).display()
        );
        match self.config.migration.reset_schema {
            Decision::No => info!("  reset:   skipped"),
            decision => info!(
                "  reset:   {} (answer: {:?})",
                reset_command(tools, &self.config.target).display(),
                decision
            ),
        }
        info!(
            "  import:  {}",
            restore_command(
                tools,
                &self.config.target,
                backup_file,
                self.config.migration.no_owner
            )
            .display()
        );
        info!(
            "  cleanup: remove {:?} (answer: {:?})",
            backup_file, self.config.migration.remove_backup
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationConfig, ToolPaths};
    use crate::prompt::ScriptedConfirmer;
    use crate::tools::PROBE_QUERY;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    const SOURCE_HOST: &str = "source.internal";
    const TARGET_HOST: &str = "target.internal";

    /// Records every command and answers with scripted exit codes.
    #[derive(Default)]
    struct FakeRunner {
        missing: Vec<&'static str>,
        unreachable: Vec<&'static str>,
        dump_exit: i32,
        reset_exit: i32,
        restore_exit: i32,
        restore_stderr: Vec<String>,
        restore_unlaunchable: bool,
        restore_deletes_archive: bool,
        ignore_cancel: bool,
        calls: Mutex<Vec<ToolCommand>>,
    }

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Probe(String),
        Dump,
        Reset,
        Restore,
    }

    impl FakeRunner {
        fn calls(&self) -> Vec<Call> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|c| classify(c))
                .collect()
        }
    }

    fn arg_after<'a>(cmd: &'a ToolCommand, flag: &str) -> &'a str {
        let i = cmd.args.iter().position(|a| a == flag).unwrap();
        &cmd.args[i + 1]
    }

    fn classify(cmd: &ToolCommand) -> Call {
        match cmd.tool {
            Tool::PgDump => Call::Dump,
            Tool::PgRestore => Call::Restore,
            Tool::Psql if arg_after(cmd, "--command") == PROBE_QUERY => {
                Call::Probe(arg_after(cmd, "--host").to_string())
            }
            Tool::Psql => Call::Reset,
        }
    }

    fn exited(code: i32, stderr: Vec<String>) -> ToolOutput {
        ToolOutput {
            exit_code: Some(code),
            stderr,
        }
    }

    #[async_trait]
    impl ToolRunner for FakeRunner {
        fn locate(&self, program: &str) -> std::result::Result<PathBuf, String> {
            if self.missing.iter().any(|m| *m == program) {
                Err("cannot find binary path".to_string())
            } else {
                Ok(PathBuf::from("/usr/bin").join(program))
            }
        }

        async fn run(
            &self,
            command: &ToolCommand,
            cancel: &CancellationToken,
        ) -> Result<ToolOutput> {
            if cancel.is_cancelled() && !self.ignore_cancel {
                return Err(MigrateError::Cancelled);
            }
            self.calls.lock().unwrap().push(command.clone());
            if command.tool == Tool::PgRestore {
                if self.restore_unlaunchable {
                    return Err(MigrateError::Io(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        "failed to launch pg_restore: permission denied",
                    )));
                }
                if self.restore_deletes_archive {
                    std::fs::remove_file(command.args.last().unwrap()).unwrap();
                }
            }
            Ok(match classify(command) {
                Call::Probe(host) if self.unreachable.iter().any(|h| *h == host) => exited(
                    2,
                    vec![format!("psql: error: could not translate host name \"{}\"", host)],
                ),
                Call::Probe(_) => exited(0, vec![]),
                Call::Dump => {
                    // Written even on failure: a partial archive stays behind
                    std::fs::write(arg_after(command, "--file"), b"PGDMP").unwrap();
                    exited(self.dump_exit, vec!["pg_dump: dumping contents".into()])
                }
                Call::Reset => exited(self.reset_exit, vec![]),
                Call::Restore => exited(self.restore_exit, self.restore_stderr.clone()),
            })
        }
    }

    fn endpoint(host: &str) -> EndpointConfig {
        EndpointConfig {
            host: host.to_string(),
            port: 5432,
            database: "app".to_string(),
            user: "postgres".to_string(),
            password: "password".to_string(),
            password_env: None,
            schema: "public".to_string(),
        }
    }

    fn config(backup_file: &Path) -> Config {
        Config {
            source: endpoint(SOURCE_HOST),
            target: endpoint(TARGET_HOST),
            migration: MigrationConfig {
                backup_file: backup_file.to_path_buf(),
                ..MigrationConfig::default()
            },
        }
    }

    async fn run_with(
        config: Config,
        runner: &Arc<FakeRunner>,
        answers: impl IntoIterator<Item = bool>,
    ) -> Result<MigrationResult> {
        Orchestrator::new(config)
            .with_runner(runner.clone())
            .with_confirmer(ScriptedConfirmer::new(answers))
            .run(CancellationToken::new(), false)
            .await
    }

    fn probes() -> Vec<Call> {
        vec![
            Call::Probe(SOURCE_HOST.to_string()),
            Call::Probe(TARGET_HOST.to_string()),
        ]
    }

    #[tokio::test]
    async fn test_declined_prompts_complete_and_keep_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup.dump");
        let runner = Arc::new(FakeRunner::default());

        let result = run_with(config(&backup), &runner, [false, false])
            .await
            .unwrap();

        assert_eq!(result.status, "completed");
        assert!(!result.schema_reset);
        assert!(result.import_warning.is_none());
        assert!(!result.backup_removed);
        assert_eq!(result.backup_bytes, 5);
        assert!(backup.exists());

        let mut expected = probes();
        expected.extend([Call::Dump, Call::Restore]);
        assert_eq!(runner.calls(), expected);
    }

    #[tokio::test]
    async fn test_missing_tool_stops_before_any_command() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            missing: vec!["pg_restore"],
            ..FakeRunner::default()
        });

        let err = run_with(config(&dir.path().join("b.dump")), &runner, [true, true])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MigrateError::ToolMissing {
                tool: Tool::PgRestore,
                ..
            }
        ));
        assert_eq!(err.stage(), Some(Stage::ToolCheck));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_source_still_probes_target_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let runner = Arc::new(FakeRunner {
            unreachable: vec![SOURCE_HOST],
            ..FakeRunner::default()
        });

        let err = run_with(config(&backup), &runner, [true, true])
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::SourceCheck));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(runner.calls(), probes());
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn test_unreachable_target_halts_at_stage_three() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let runner = Arc::new(FakeRunner {
            unreachable: vec![TARGET_HOST],
            ..FakeRunner::default()
        });

        let err = run_with(config(&backup), &runner, [true, true])
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::TargetCheck));
        assert!(err.to_string().contains("target"));
        assert_eq!(runner.calls(), probes());
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn test_failed_export_skips_remaining_stages() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let runner = Arc::new(FakeRunner {
            dump_exit: 1,
            ..FakeRunner::default()
        });

        let err = run_with(config(&backup), &runner, [true, true])
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Export));
        let mut expected = probes();
        expected.push(Call::Dump);
        assert_eq!(runner.calls(), expected);
        // Partial archive is left behind
        assert!(backup.exists());
    }

    #[tokio::test]
    async fn test_accepted_reset_runs_once_before_restore() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());

        let result = run_with(config(&dir.path().join("b.dump")), &runner, [true, false])
            .await
            .unwrap();

        assert!(result.schema_reset);
        let mut expected = probes();
        expected.extend([Call::Dump, Call::Reset, Call::Restore]);
        assert_eq!(runner.calls(), expected);
    }

    #[tokio::test]
    async fn test_failed_reset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            reset_exit: 3,
            ..FakeRunner::default()
        });

        let err = run_with(config(&dir.path().join("b.dump")), &runner, [true, true])
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Reset));
        assert!(!runner.calls().contains(&Call::Restore));
    }

    #[tokio::test]
    async fn test_restore_conflicts_are_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            restore_exit: 1,
            restore_stderr: vec![
                "pg_restore: creating TABLE \"public.users\"".into(),
                "pg_restore: error: could not execute query: ERROR:  relation \"users\" already exists".into(),
                "pg_restore: error: could not execute query: ERROR:  relation \"orders\" already exists".into(),
                "pg_restore: warning: errors ignored on restore: 2".into(),
            ],
            ..FakeRunner::default()
        });

        let result = run_with(config(&dir.path().join("b.dump")), &runner, [false, false])
            .await
            .unwrap();

        assert_eq!(result.status, "completed");
        assert_eq!(
            result.import_warning,
            Some(ImportWarning {
                exit_code: Some(1),
                conflicts: 2,
                errors_ignored: Some(2),
            })
        );
    }

    #[tokio::test]
    async fn test_accepted_cleanup_removes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let runner = Arc::new(FakeRunner::default());

        let result = run_with(config(&backup), &runner, [false, true])
            .await
            .unwrap();

        assert!(result.backup_removed);
        assert!(!backup.exists());
    }

    /// Answers yes, but only after a shutdown signal arrived.
    struct CancelWhileAsking(CancellationToken);

    impl Confirmer for CancelWhileAsking {
        fn confirm(&mut self, _question: &str) -> Result<bool> {
            self.0.cancel();
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_signal_during_reset_prompt_skips_drop() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            ignore_cancel: true,
            ..FakeRunner::default()
        });
        let cancel = CancellationToken::new();

        let err = Orchestrator::new(config(&dir.path().join("b.dump")))
            .with_runner(runner.clone())
            .with_confirmer(CancelWhileAsking(cancel.clone()))
            .run(cancel, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Cancelled));
        let mut expected = probes();
        expected.push(Call::Dump);
        assert_eq!(runner.calls(), expected);
    }

    #[tokio::test]
    async fn test_signal_during_cleanup_prompt_keeps_backup() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let mut config = config(&backup);
        config.migration.reset_schema = Decision::No;
        let runner = Arc::new(FakeRunner {
            ignore_cancel: true,
            ..FakeRunner::default()
        });
        let cancel = CancellationToken::new();

        let err = Orchestrator::new(config)
            .with_runner(runner.clone())
            .with_confirmer(CancelWhileAsking(cancel.clone()))
            .run(cancel, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Cancelled));
        assert!(backup.exists());
    }

    #[tokio::test]
    async fn test_unlaunchable_restore_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            restore_unlaunchable: true,
            ..FakeRunner::default()
        });

        let err = run_with(config(&dir.path().join("b.dump")), &runner, [false, true])
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Import(_)));
        assert_eq!(err.stage(), Some(Stage::Import));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_failed_backup_removal_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            restore_deletes_archive: true,
            ..FakeRunner::default()
        });

        let err = run_with(config(&dir.path().join("b.dump")), &runner, [false, true])
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Cleanup { .. }));
        assert_eq!(err.stage(), Some(Stage::Cleanup));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_configured_decisions_override_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let mut config = config(&backup);
        config.migration.reset_schema = Decision::Yes;
        config.migration.remove_backup = Decision::No;
        let runner = Arc::new(FakeRunner::default());

        // The scripted "yes" answers would remove the backup if they were consulted
        let result = run_with(config, &runner, [true, true]).await.unwrap();

        assert!(result.schema_reset);
        assert!(!result.backup_removed);
        assert!(backup.exists());
    }

    #[tokio::test]
    async fn test_dry_run_only_probes() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("b.dump");
        let runner = Arc::new(FakeRunner::default());

        let result = Orchestrator::new(config(&backup))
            .with_runner(runner.clone())
            .with_confirmer(ScriptedConfirmer::new([true, true]))
            .run(CancellationToken::new(), true)
            .await
            .unwrap();

        assert_eq!(result.status, "dry_run");
        assert_eq!(runner.calls(), probes());
        assert!(!backup.exists());
    }

    #[tokio::test]
    async fn test_cancelled_run_executes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Orchestrator::new(config(&dir.path().join("b.dump")))
            .with_runner(runner.clone())
            .run(cancel, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MigrateError::Cancelled));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_health_check_reports_each_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(FakeRunner {
            unreachable: vec![TARGET_HOST],
            ..FakeRunner::default()
        });

        let result = Orchestrator::new(config(&dir.path().join("b.dump")))
            .with_runner(runner.clone())
            .health_check(CancellationToken::new())
            .await
            .unwrap();

        assert!(!result.healthy);
        assert!(result.source.connected);
        assert!(!result.target.connected);
        assert!(result
            .target
            .error
            .as_deref()
            .unwrap()
            .contains("exit code 2"));
    }

    #[test]
    fn test_custom_tool_paths_are_checked() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir.path().join("b.dump"));
        config.migration.tools = ToolPaths {
            psql: "psql-16".into(),
            ..ToolPaths::default()
        };
        let runner = Arc::new(FakeRunner {
            missing: vec!["psql-16"],
            ..FakeRunner::default()
        });

        let orchestrator = Orchestrator::new(config).with_runner(runner);
        let err = orchestrator.check_tools().unwrap_err();
        assert!(matches!(err, MigrateError::ToolMissing { tool: Tool::Psql, .. }));
    }
}
