//! Credential lookup for the speech backend and any other keyed service.
//!
//! A credential can be configured three ways, consulted in this order:
//!
//! 1. inline in the config (`api_key`), handy for local runs
//! 2. a file path (`api_key_file`), for mounted secrets
//! 3. an environment variable name (`api_key_env_var`)
//!
//! Whichever source is used, the value is trimmed and wrapped in a
//! [`SecretString`] so it never shows up in `Debug` output or logs.

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No credential source configured (expected an inline value, a file, or an env var)")]
    NoSourceProvided,

    #[error("Failed to read credential file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Credential file '{path}' is empty")]
    EmptyFile { path: String },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolves a credential from the first configured source.
///
/// Empty strings count as "not configured", so a blank inline value falls
/// through to the file and then to the environment.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = present(direct) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = present(file_path) {
        let expanded = expand_home(path);
        let content = std::fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
            path: expanded.clone(),
            source: e,
        })?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SecretError::EmptyFile { path: expanded });
        }
        return Ok(SecretString::from(trimmed.to_string()));
    }

    if let Some(name) = present(env_var) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but "nothing configured" is `Ok(None)`.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    present(direct).is_some() || present(file_path).is_some() || present(env_var).is_some()
}

/// Expands a leading `~` or `~/` to the current user's home directory.
/// `~user/...` is left untouched.
fn expand_home(path: &str) -> String {
    if path != "~" && !path.starts_with("~/") {
        return path.to_string();
    }
    match std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        Some(home) => format!("{}{}", home.to_string_lossy(), &path[1..]),
        None => path.to_string(),
    }
}
