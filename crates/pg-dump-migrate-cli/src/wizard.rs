//! Interactive configuration wizard for creating/editing config files.

use dialoguer::{Confirm, Input, Password, Select};
use pg_dump_migrate::{Config, Decision, EndpointConfig, MigrationConfig, Orchestrator};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Result type for wizard operations.
pub type WizardResult<T> = Result<T, WizardError>;

/// Errors that can occur during wizard execution.
#[derive(Debug)]
pub enum WizardError {
    /// User cancelled the wizard.
    Cancelled,
    /// IO error (file read/write).
    Io(std::io::Error),
    /// Config serialization error.
    Config(String),
    /// Validation error.
    Validation(String),
}

impl std::fmt::Display for WizardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Configuration cancelled"),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Config(msg) => write!(f, "Config error: {}", msg),
            Self::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for WizardError {}

impl From<std::io::Error> for WizardError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<dialoguer::Error> for WizardError {
    fn from(e: dialoguer::Error) -> Self {
        Self::Io(std::io::Error::other(e.to_string()))
    }
}

/// Action to take when config file already exists.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ExistingFileAction {
    Edit,
    Overwrite,
    Abort,
}

/// Run the configuration wizard.
pub async fn run_wizard(output: &Path, force: bool) -> WizardResult<()> {
    println!();
    println!("PostgreSQL Dump/Restore Migration - Configuration Wizard");
    println!("========================================================");
    println!();

    let existing_config = if output.exists() && !force {
        match prompt_existing_file_action(output)? {
            ExistingFileAction::Edit => {
                println!("Loading existing configuration...");
                match Config::load(output) {
                    Ok(config) => Some(config),
                    Err(e) => {
                        println!("Warning: Could not parse existing file: {}", e);
                        println!("Starting with fresh configuration.\n");
                        None
                    }
                }
            }
            ExistingFileAction::Overwrite => {
                println!("Starting with fresh configuration.\n");
                None
            }
            ExistingFileAction::Abort => {
                return Err(WizardError::Cancelled);
            }
        }
    } else {
        None
    };

    let source = prompt_endpoint(
        "Source Database (export from)",
        existing_config.as_ref().map(|c| &c.source),
    )?;
    let target = prompt_endpoint(
        "Target Database (restore into)",
        existing_config.as_ref().map(|c| &c.target),
    )?;
    let migration = prompt_migration_config(existing_config.as_ref().map(|c| &c.migration))?;

    let config = Config {
        source,
        target,
        migration,
    };

    if let Err(e) = config.validate() {
        return Err(WizardError::Validation(e.to_string()));
    }

    print_summary(&config);

    if Confirm::new()
        .with_prompt("Test database connections now?")
        .default(true)
        .interact()?
    {
        test_connections(&config).await;
    }

    if !Confirm::new()
        .with_prompt(format!("Save configuration to {}?", output.display()))
        .default(true)
        .interact()?
    {
        return Err(WizardError::Cancelled);
    }

    write_config(&config, output)?;

    println!("\nConfiguration saved to {}", output.display());
    println!("Run 'pg-dump-migrate run' to start the migration.");

    Ok(())
}

fn prompt_existing_file_action(path: &Path) -> WizardResult<ExistingFileAction> {
    println!("File already exists: {}\n", path.display());

    let options = &["Edit existing configuration", "Overwrite with new", "Abort"];
    let selection = Select::new()
        .with_prompt("What would you like to do?")
        .items(options)
        .default(0)
        .interact()?;

    Ok(match selection {
        0 => ExistingFileAction::Edit,
        1 => ExistingFileAction::Overwrite,
        _ => ExistingFileAction::Abort,
    })
}

fn prompt_endpoint(title: &str, existing: Option<&EndpointConfig>) -> WizardResult<EndpointConfig> {
    println!("{}", title);
    println!("{}", "-".repeat(title.len()));

    let host: String = Input::new()
        .with_prompt("  Host")
        .default(
            existing
                .map(|c| c.host.clone())
                .unwrap_or_else(|| "localhost".to_string()),
        )
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("  Port")
        .default(existing.map(|c| c.port).unwrap_or(5432))
        .interact_text()?;

    let database: String = Input::new()
        .with_prompt("  Database")
        .default(existing.map(|c| c.database.clone()).unwrap_or_default())
        .interact_text()?;

    let user: String = Input::new()
        .with_prompt("  User")
        .default(
            existing
                .map(|c| c.user.clone())
                .unwrap_or_else(|| "postgres".to_string()),
        )
        .interact_text()?;

    let password_env = existing.and_then(|c| c.password_env.clone());
    let password = if password_env.is_some() {
        // Keep reading it from the environment; never write it into the file
        String::new()
    } else {
        let password = prompt_password("  Password", existing.is_some())?;
        if password.is_empty() {
            existing.map(|e| e.password.clone()).unwrap_or(password)
        } else {
            password
        }
    };

    let schema: String = Input::new()
        .with_prompt("  Schema")
        .default(
            existing
                .map(|c| c.schema.clone())
                .unwrap_or_else(|| "public".to_string()),
        )
        .interact_text()?;

    println!();

    Ok(EndpointConfig {
        host,
        port,
        database,
        user,
        password,
        password_env,
        schema,
    })
}

fn prompt_migration_config(existing: Option<&MigrationConfig>) -> WizardResult<MigrationConfig> {
    println!("Migration Settings");
    println!("------------------");

    let mut config = existing.cloned().unwrap_or_default();

    let backup_file: String = Input::new()
        .with_prompt("  Backup file")
        .default(config.backup_file.display().to_string())
        .interact_text()?;
    config.backup_file = PathBuf::from(backup_file);

    config.reset_schema = prompt_decision(
        "  Reset target schema before import",
        config.reset_schema,
    )?;
    config.remove_backup = prompt_decision(
        "  Remove backup file after import",
        config.remove_backup,
    )?;

    config.no_owner = Confirm::new()
        .with_prompt("  Skip ownership (pg_restore --no-owner)")
        .default(config.no_owner)
        .interact()?;

    println!();
    Ok(config)
}

fn prompt_decision(prompt: &str, current: Decision) -> WizardResult<Decision> {
    let options = &["Ask every run", "Always", "Never"];
    let default = match current {
        Decision::Ask => 0,
        Decision::Yes => 1,
        Decision::No => 2,
    };
    let selection = Select::new()
        .with_prompt(prompt)
        .items(options)
        .default(default)
        .interact()?;

    Ok(match selection {
        1 => Decision::Yes,
        2 => Decision::No,
        _ => Decision::Ask,
    })
}

fn prompt_password(prompt: &str, has_existing: bool) -> WizardResult<String> {
    if has_existing {
        let input: String = Password::new()
            .with_prompt(format!("{} (blank to keep existing)", prompt))
            .allow_empty_password(true)
            .interact()?;
        Ok(input)
    } else {
        let input: String = Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?;
        Ok(input)
    }
}

fn print_summary(config: &Config) {
    println!("Configuration Summary");
    println!("=====================");
    println!(
        "  Source: {} (user {})",
        config.source.display_name(),
        config.source.user
    );
    println!(
        "  Target: {} (user {}, schema {})",
        config.target.display_name(),
        config.target.user,
        config.target.schema
    );
    println!("  Backup file: {}", config.migration.backup_file.display());
    println!("  Reset schema: {:?}", config.migration.reset_schema);
    println!("  Remove backup: {:?}", config.migration.remove_backup);
    println!();
}

async fn test_connections(config: &Config) {
    println!("\nTesting connections...");

    let orchestrator = Orchestrator::new(config.clone());
    match orchestrator.health_check(CancellationToken::new()).await {
        Ok(result) => {
            for (label, endpoint) in [("Source", &result.source), ("Target", &result.target)] {
                match endpoint.error {
                    None => println!("  {}: OK ({}ms)", label, endpoint.latency_ms),
                    Some(ref err) => println!("  {}: FAILED - {}", label, err),
                }
            }
        }
        Err(e) => println!("  FAILED - {}", e),
    }
    println!();
}

fn write_config(config: &Config, path: &Path) -> WizardResult<()> {
    let header = r#"# PostgreSQL Dump/Restore Migration Configuration
# Generated by pg-dump-migrate init

"#;

    let yaml = serde_yaml::to_string(config).map_err(|e| WizardError::Config(e.to_string()))?;

    std::fs::write(path, format!("{}{}", header, yaml))?;

    Ok(())
}
