use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArticastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] crate::synthesis::SynthesisError),

    #[error("Feed error: {0}")]
    Feed(#[from] crate::feed::FeedError),

    #[error("Authentication error: {0}")]
    Auth(#[from] crate::auth::AuthError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] crate::telemetry::TelemetryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("I/O failure on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("Invalid article URL '{0}'")]
    InvalidUrl(String),

    #[error("No async runtime available to run the conversion")]
    RuntimeUnavailable,

    #[error("Failed to list audio files: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, ArticastError>;
