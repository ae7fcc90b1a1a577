pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;

/// Object name of a user's feed document.
pub const FEED_OBJECT_NAME: &str = "rss.xml";

/// Listing entry returned by [`BlobStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub created_at: DateTime<Utc>,
}

/// Keyed byte storage. Keys are `/`-separated and namespaced `{userId}/{file}`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `key`, replacing any previous object.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Objects whose key starts with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError>;
}

pub fn audio_key(user_id: &str, job_id: &str) -> String {
    format!("{}/{}.mp3", user_id, job_id)
}

pub fn feed_key(user_id: &str) -> String {
    format!("{}/{}", user_id, FEED_OBJECT_NAME)
}

pub fn user_prefix(user_id: &str) -> String {
    format!("{}/", user_id)
}

/// Public URL of `key` below `base_url`.
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key)
}

/// Rejects keys that could escape the store root or address a directory.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason: &str| StorageError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("key must be relative"));
    }
    if key.contains('\\') || key.contains('\0') {
        return Err(invalid("key contains a forbidden character"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(invalid("key contains an empty segment")),
            "." | ".." => return Err(invalid("key contains a relative segment")),
            _ => {}
        }
    }
    Ok(())
}

/// Same rules as [`validate_key`], but an empty prefix and a trailing `/`
/// are allowed.
pub fn validate_prefix(prefix: &str) -> Result<(), StorageError> {
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    if trimmed.is_empty() {
        return if prefix.is_empty() {
            Ok(())
        } else {
            Err(StorageError::InvalidKey {
                key: prefix.to_string(),
                reason: "prefix must be relative".to_string(),
            })
        };
    }
    validate_key(trimmed)
}
