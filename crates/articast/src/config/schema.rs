use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::secrets::{resolve_secret, SecretError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub storage: StorageConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Seconds reported to clients as the expected conversion time.
    #[serde(default = "default_estimated_time")]
    pub estimated_time_secs: u64,
}

fn default_estimated_time() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory backing the filesystem blob store.
    pub root: String,
    /// Base URL under which stored objects are publicly reachable.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
}

fn default_max_chunk_size() -> usize {
    2048
}

fn default_max_concurrency() -> usize {
    crate::synthesis::DEFAULT_MAX_CONCURRENCY
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_endpoint() -> String {
    crate::synthesis::openai::DEFAULT_ENDPOINT.to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("OPENAI_KEY".to_string())
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            max_concurrency: default_max_concurrency(),
            model: default_model(),
            voice: default_voice(),
            endpoint: default_endpoint(),
            api_key: None,
            api_key_file: None,
            api_key_env_var: default_api_key_env_var(),
        }
    }
}

impl SynthesisConfig {
    pub fn resolve_api_key(&self) -> Result<SecretString, SecretError> {
        resolve_secret(
            self.api_key.as_deref(),
            self.api_key_file.as_deref(),
            self.api_key_env_var.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Identity-provider tenant, e.g. `example.eu.auth0.com`.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub jwks_url: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    /// Identity assigned to every request while auth is disabled.
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
}

fn default_true() -> bool {
    true
}

fn default_user_id() -> String {
    "default-user".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            domain: None,
            issuer: None,
            jwks_url: None,
            audience: None,
            default_user_id: default_user_id(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AuthConfig {
    /// Explicit `issuer`, otherwise `https://{domain}/`.
    pub fn issuer(&self) -> Option<String> {
        non_empty(&self.issuer)
            .map(str::to_string)
            .or_else(|| non_empty(&self.domain).map(|domain| format!("https://{}/", domain)))
    }

    /// Explicit `jwks_url`, otherwise the domain's well-known key-set document.
    pub fn jwks_url(&self) -> Option<String> {
        non_empty(&self.jwks_url).map(str::to_string).or_else(|| {
            non_empty(&self.domain)
                .map(|domain| format!("https://{}/.well-known/jwks.json", domain))
        })
    }

    pub fn audience(&self) -> Option<&str> {
        non_empty(&self.audience)
    }
}

/// Channel and episode defaults for generated podcast feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "default_site_link")]
    pub site_link: String,
    #[serde(default = "default_cover_image_url")]
    pub cover_image_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_episode_author")]
    pub episode_author: String,
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
    #[serde(default = "default_owner_email")]
    pub owner_email: String,
}

fn default_site_link() -> String {
    "https://article2audio.com".to_string()
}

fn default_cover_image_url() -> String {
    "https://article2audio.com/podcast_cover.jpg".to_string()
}

fn default_language() -> String {
    "en-us".to_string()
}

fn default_category() -> String {
    "Technology".to_string()
}

fn default_episode_author() -> String {
    "Article2Audio User".to_string()
}

fn default_owner_name() -> String {
    "User".to_string()
}

fn default_owner_email() -> String {
    "user@example.com".to_string()
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            site_link: default_site_link(),
            cover_image_url: default_cover_image_url(),
            language: default_language(),
            category: default_category(),
            episode_author: default_episode_author(),
            owner_name: default_owner_name(),
            owner_email: default_owner_email(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
