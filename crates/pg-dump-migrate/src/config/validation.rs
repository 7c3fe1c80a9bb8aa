//! Configuration validation.

use super::{Config, EndpointConfig};
use crate::error::{MigrateError, Result};

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes.
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_endpoint("source", &config.source)?;
    validate_endpoint("target", &config.target)?;

    // Cannot migrate to the same database
    if config.source.host == config.target.host
        && config.source.port == config.target.port
        && config.source.database == config.target.database
    {
        return Err(MigrateError::Config(
            "source and target cannot be the same database".into(),
        ));
    }

    if config.migration.backup_file.as_os_str().is_empty() {
        return Err(MigrateError::Config(
            "migration.backup_file is required".into(),
        ));
    }

    let tools = &config.migration.tools;
    for (name, value) in [
        ("pg_dump", &tools.pg_dump),
        ("pg_restore", &tools.pg_restore),
        ("psql", &tools.psql),
    ] {
        if value.is_empty() {
            return Err(MigrateError::Config(format!(
                "migration.tools.{} cannot be empty",
                name
            )));
        }
    }

    Ok(())
}

fn validate_endpoint(label: &str, endpoint: &EndpointConfig) -> Result<()> {
    if endpoint.host.is_empty() {
        return Err(MigrateError::Config(format!("{}.host is required", label)));
    }
    if endpoint.database.is_empty() {
        return Err(MigrateError::Config(format!(
            "{}.database is required",
            label
        )));
    }
    if endpoint.user.is_empty() {
        return Err(MigrateError::Config(format!("{}.user is required", label)));
    }
    if endpoint.port == 0 {
        return Err(MigrateError::Config(format!(
            "{}.port must be non-zero",
            label
        )));
    }
    validate_identifier(&endpoint.schema)
        .map_err(|msg| MigrateError::Config(format!("{}.schema: {}", label, msg)))
}

/// Validate a PostgreSQL identifier before it is quoted into DDL.
pub(crate) fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("identifier cannot be empty".to_string());
    }
    if name.contains('\0') {
        return Err(format!("identifier contains null byte: {:?}", name));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        ));
    }
    Ok(())
}
