//! # Shield Telemetry
//!
//! Log setup shared by Cache-Shield services and test suites: a
//! `tracing-subscriber` registry with an `EnvFilter` and either pretty or
//! JSON output.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shield_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `cache-shield` | Service name in startup logs |
//! | `CS_LOG_LEVEL` / `RUST_LOG` | `info` | Filter directives |
//! | `CS_CONSOLE_OUTPUT` | `true` | Write logs at all |
//! | `CS_JSON_LOGS` | `false` | JSON lines output |

mod config;
mod logging;
mod subscriber;

pub use config::TelemetryConfig;
pub use subscriber::build_env_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global subscriber described by `config`.
///
/// Returns a guard to hold for the lifetime of the application. Fails if
/// a global subscriber is already installed.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    subscriber::install(config)?;

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl TelemetryGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
