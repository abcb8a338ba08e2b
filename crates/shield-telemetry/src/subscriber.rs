//! `tracing-subscriber` registry setup.

use tracing_subscriber::layer::Layered;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::{TelemetryConfig, TelemetryError};

/// Parse the configured filter directives.
pub fn build_env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::Config(e.to_string()))
}

type OutputLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

fn fmt_layer(config: &TelemetryConfig) -> OutputLayer {
    let layer = tracing_subscriber::fmt::layer().with_target(true);

    match (config.json_logs, config.test_writer) {
        // JSON output for containers/production
        (true, false) => layer
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        (true, true) => layer.json().with_test_writer().boxed(),
        // Pretty output for development
        (false, false) => layer.with_ansi(true).boxed(),
        (false, true) => layer.with_ansi(false).with_test_writer().boxed(),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub(crate) fn install(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = build_env_filter(config)?;
    let output: Option<OutputLayer> = config.console_output.then(|| fmt_layer(config));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(output)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}
