//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.source.resolve_password("source")?;
        config.target.resolve_password("target")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl EndpointConfig {
    /// Fill an empty password from `password_env`, if configured.
    fn resolve_password(&mut self, label: &str) -> Result<()> {
        if !self.password.is_empty() {
            return Ok(());
        }
        let Some(var) = self.password_env.as_deref() else {
            return Ok(());
        };
        match std::env::var(var) {
            Ok(value) => {
                debug!("Read {} password from ${}", label, var);
                self.password = value;
                Ok(())
            }
            Err(_) => Err(MigrateError::Config(format!(
                "{}.password_env refers to unset variable {}",
                label, var
            ))),
        }
    }
}
