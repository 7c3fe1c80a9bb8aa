//! Connectivity results.

use crate::error::MigrateError;
use serde::{Deserialize, Serialize};

/// Outcome of probing one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    /// `host:port/database` of the endpoint.
    pub endpoint: String,

    /// Whether the probe query succeeded.
    pub connected: bool,

    /// Wall time of the probe in milliseconds.
    pub latency_ms: u64,

    /// Why the probe failed.
    pub error: Option<String>,
}

/// Result of the `health-check` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source: EndpointHealth,
    pub target: EndpointHealth,

    /// Both endpoints reachable.
    pub healthy: bool,
}

impl HealthCheckResult {
    pub fn new(source: EndpointHealth, target: EndpointHealth) -> Self {
        let healthy = source.connected && target.connected;
        Self {
            source,
            target,
            healthy,
        }
    }

    /// Connection error for the first unreachable endpoint, source first.
    pub fn failure(&self) -> Option<MigrateError> {
        [("source", &self.source), ("target", &self.target)]
            .into_iter()
            .find(|(_, endpoint)| !endpoint.connected)
            .map(|(label, endpoint)| {
                MigrateError::connection(label, endpoint.error.clone().unwrap_or_default())
            })
    }
}
