use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const SUPPORTED_VERSION: &str = "1.0";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config: Config = serde_json::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    if config.storage.root.trim().is_empty() {
        return Err(invalid("storage.root must not be empty"));
    }
    let base_url = config.storage.public_base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(format!(
            "storage.public_base_url must be an http(s) URL, got '{}'",
            config.storage.public_base_url
        )));
    }

    if config.synthesis.max_chunk_size == 0 {
        return Err(invalid("synthesis.max_chunk_size must be greater than 0"));
    }
    if config.synthesis.max_concurrency == 0 {
        return Err(invalid("synthesis.max_concurrency must be greater than 0"));
    }

    let auth = &config.auth;
    if auth.enabled {
        if auth.issuer().is_none() {
            return Err(invalid(
                "auth.issuer or auth.domain is required when auth is enabled",
            ));
        }
        if auth.jwks_url().is_none() {
            return Err(invalid(
                "auth.jwks_url or auth.domain is required when auth is enabled",
            ));
        }
        if auth.audience().is_none() {
            return Err(invalid("auth.audience is required when auth is enabled"));
        }
    } else if auth.default_user_id.trim().is_empty() {
        return Err(invalid(
            "auth.default_user_id must not be empty when auth is disabled",
        ));
    }

    Ok(())
}
