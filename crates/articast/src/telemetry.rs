//! Installs the process-wide tracing subscriber.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("Failed to bridge `log` records into tracing: {0}")]
    LogBridge(String),

    #[error("A global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Picks the `RUST_LOG` value when present, the configured directive otherwise.
fn build_filter(directive: &str, env_override: Option<String>) -> Result<EnvFilter, TelemetryError> {
    let directive = env_override
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| directive.to_string());
    EnvFilter::try_new(&directive).map_err(|e| TelemetryError::InvalidFilter {
        directive,
        reason: e.to_string(),
    })
}

/// Installs an `EnvFilter` + fmt subscriber and routes `log` records into it.
///
/// Can only succeed once per process.
pub fn init_tracing(directive: &str, json: bool) -> Result<(), TelemetryError> {
    let filter = build_filter(directive, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    tracing_log::LogTracer::init().map_err(|e| TelemetryError::LogBridge(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer()))
    };
    installed.map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))
}

pub fn init_from_config(config: &LoggingConfig) -> Result<(), TelemetryError> {
    init_tracing(&config.filter, config.json)
}
