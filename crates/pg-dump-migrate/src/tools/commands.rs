//! Command builders for each pipeline stage.

use super::{Tool, ToolCommand, PASSWORD_ENV};
use crate::config::{EndpointConfig, ToolPaths};
use std::path::Path;

/// Query used to prove an endpoint accepts authenticated connections.
pub const PROBE_QUERY: &str = "SELECT 1";

/// Quote a PostgreSQL identifier using double quotes.
pub fn quote_pg(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn connection_args(endpoint: &EndpointConfig) -> Vec<String> {
    vec![
        "--host".to_string(),
        endpoint.host.clone(),
        "--port".to_string(),
        endpoint.port.to_string(),
        "--username".to_string(),
        endpoint.user.clone(),
        "--dbname".to_string(),
        endpoint.database.clone(),
        // Fail instead of prompting on the terminal
        "--no-password".to_string(),
    ]
}

fn password_env(endpoint: &EndpointConfig) -> Vec<(String, String)> {
    if endpoint.password.is_empty() {
        Vec::new()
    } else {
        vec![(PASSWORD_ENV.to_string(), endpoint.password.clone())]
    }
}

fn psql(tools: &ToolPaths, endpoint: &EndpointConfig, sql: &str) -> ToolCommand {
    let mut args = connection_args(endpoint);
    args.extend(
        [
            "--no-psqlrc",
            "--quiet",
            "--tuples-only",
            "--set",
            "ON_ERROR_STOP=1",
            "--command",
            sql,
        ]
        .map(String::from),
    );
    ToolCommand {
        tool: Tool::Psql,
        program: tools.psql.clone(),
        args,
        env: password_env(endpoint),
    }
}

/// No-op query against an endpoint.
pub fn probe_command(tools: &ToolPaths, endpoint: &EndpointConfig) -> ToolCommand {
    psql(tools, endpoint, PROBE_QUERY)
}

/// Full custom-format dump (schema, data and large objects) of the source.
pub fn dump_command(tools: &ToolPaths, endpoint: &EndpointConfig, output: &Path) -> ToolCommand {
    let mut args = connection_args(endpoint);
    args.extend(["--format=custom", "--blobs", "--verbose", "--file"].map(String::from));
    args.push(output.display().to_string());
    ToolCommand {
        tool: Tool::PgDump,
        program: tools.pg_dump.clone(),
        args,
        env: password_env(endpoint),
    }
}

/// Drop the endpoint's schema with everything in it and create it again empty.
pub fn reset_command(tools: &ToolPaths, endpoint: &EndpointConfig) -> ToolCommand {
    let schema = quote_pg(&endpoint.schema);
    let sql = format!("DROP SCHEMA IF EXISTS {0} CASCADE; CREATE SCHEMA {0};", schema);
    psql(tools, endpoint, &sql)
}

/// Restore an archive into the target.
pub fn restore_command(
    tools: &ToolPaths,
    endpoint: &EndpointConfig,
    input: &Path,
    no_owner: bool,
) -> ToolCommand {
    let mut args = connection_args(endpoint);
    args.push("--verbose".to_string());
    if no_owner {
        args.push("--no-owner".to_string());
    }
    args.push(input.display().to_string());
    ToolCommand {
        tool: Tool::PgRestore,
        program: tools.pg_restore.clone(),
        args,
        env: password_env(endpoint),
    }
}
