//! pg-dump-migrate CLI - PostgreSQL migration with pg_dump and pg_restore.

mod confirm;
mod wizard;

use clap::{Parser, Subcommand};
use pg_dump_migrate::{Config, Decision, MigrateError, MigrationResult, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "pg-dump-migrate")]
#[command(about = "PostgreSQL migration with pg_dump and pg_restore")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export the source, optionally reset the target schema, and restore into the target
    Run {
        /// Override backup file path
        #[arg(long)]
        backup_file: Option<PathBuf>,

        /// Drop and recreate the target schema before import: ask, yes or no
        #[arg(long, value_name = "ANSWER")]
        reset_schema: Option<Decision>,

        /// Delete the backup file after import: ask, yes or no
        #[arg(long, value_name = "ANSWER")]
        remove_backup: Option<Decision>,

        /// Dry run: check tools and connections, show the commands, change nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Test database connections
    HealthCheck,

    /// Create or edit a configuration file interactively
    Init {
        /// Output path for configuration file [default: config.yaml]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing file without confirmation
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Handle init command separately (doesn't need existing config)
    if let Commands::Init { output, force } = cli.command {
        // No logging setup for wizard - keeps terminal clean for interactive prompts
        let output_path = output.unwrap_or_else(|| PathBuf::from("config.yaml"));
        wizard::run_wizard(&output_path, force)
            .await
            .map_err(|e| MigrateError::Config(e.to_string()))?;
        return Ok(());
    }

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let cancel_token = setup_signal_handler();

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above
        Commands::Run {
            backup_file,
            reset_schema,
            remove_backup,
            dry_run,
        } => {
            // Apply overrides
            if let Some(path) = backup_file {
                config.migration.backup_file = path;
            }
            if let Some(decision) = reset_schema {
                config.migration.reset_schema = decision;
            }
            if let Some(decision) = remove_backup {
                config.migration.remove_backup = decision;
            }
            config.validate()?;

            let orchestrator = Orchestrator::new(config).with_confirmer(confirm::for_stdin());
            let result = orchestrator.run(cancel_token, dry_run).await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config);
            let result = orchestrator.health_check(cancel_token).await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Health Check Results:");
                for (label, endpoint) in [("Source", &result.source), ("Target", &result.target)] {
                    println!(
                        "  {} ({}): {} ({}ms)",
                        label,
                        endpoint.endpoint,
                        if endpoint.connected { "OK" } else { "FAILED" },
                        endpoint.latency_ms
                    );
                    if let Some(ref err) = endpoint.error {
                        println!("    Error: {}", err);
                    }
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if let Some(err) = result.failure() {
                return Err(err);
            }
        }
    }

    Ok(())
}

fn print_summary(result: &MigrationResult) {
    let status_msg = if result.status == "dry_run" {
        "Dry run completed!"
    } else {
        "Migration completed!"
    };
    println!("\n{}", status_msg);
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    if result.status == "dry_run" {
        return;
    }
    println!(
        "  Backup: {} ({} bytes, {})",
        result.backup_file.display(),
        result.backup_bytes,
        if result.backup_removed { "removed" } else { "kept" }
    );
    println!(
        "  Target schema reset: {}",
        if result.schema_reset { "yes" } else { "no" }
    );
    match result.import_warning {
        Some(ref w) => {
            let code = w
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            println!(
                "  Import: finished with warnings (exit {}, {} objects already existed)",
                code, w.conflicts
            );
        }
        None => println!("  Import: OK"),
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout is reserved for the summary / JSON result
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM.
/// Returns a CancellationToken that will be cancelled when a signal is received.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Stopping the running tool...", name);
                    token.cancel();
                });
            }
            Err(e) => error!("Failed to setup {} handler: {}", name, e),
        }
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Stopping the running tool...");
            token.cancel();
        }
    });

    cancel_token
}
