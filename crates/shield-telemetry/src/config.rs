//! Telemetry configuration from environment variables.

use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs
    pub service_name: String,

    /// `EnvFilter` directives, e.g. `info` or `cs_02_lease_lock=debug,warn`
    pub log_level: String,

    /// Whether to write logs at all
    pub console_output: bool,

    /// JSON lines instead of human-readable output
    pub json_logs: bool,

    /// Route output through the test harness capture
    #[serde(skip)]
    pub test_writer: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "cache-shield".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            test_writer: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OTEL_SERVICE_NAME`: Service name (default: cache-shield)
    /// - `CS_LOG_LEVEL` or `RUST_LOG`: Filter directives (default: info)
    /// - `CS_CONSOLE_OUTPUT`: Enable output (default: true)
    /// - `CS_JSON_LOGS`: JSON output (default: false, true in containers)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_container =
            lookup("KUBERNETES_SERVICE_HOST").is_some() || lookup("DOCKER_CONTAINER").is_some();

        Self {
            service_name: lookup("OTEL_SERVICE_NAME").unwrap_or_else(|| "cache-shield".to_string()),

            log_level: lookup("CS_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string()),

            console_output: lookup("CS_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: lookup("CS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            test_writer: false,
        }
    }

    /// Human-readable output captured by the test harness.
    pub fn for_tests(log_level: &str) -> Self {
        Self {
            service_name: "cache-shield-tests".to_string(),
            log_level: log_level.to_string(),
            console_output: true,
            json_logs: false,
            test_writer: true,
        }
    }
}
