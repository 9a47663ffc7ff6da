//! Logging initialization

use crate::{Result, ServerError};
use senti_core::Settings;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. `format` is
/// `json` or `text`.
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        "json" => subscriber.json().try_init(),
        "text" => subscriber.try_init(),
        other => {
            return Err(ServerError::Configuration(format!(
                "Unknown log format '{}', expected json or text",
                other
            )))
        }
    };

    result.map_err(|e| ServerError::Configuration(format!("Failed to initialize logging: {}", e)))
}

/// Install the subscriber described by `settings`
pub fn init_from_settings(settings: &Settings) -> Result<()> {
    init_logging(settings.log_level(), &settings.logging.format)
}
