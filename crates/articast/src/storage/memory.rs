use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{validate_key, validate_prefix, BlobStore, StoredObject};
use crate::error::StorageError;

struct Entry {
    bytes: Vec<u8>,
    created_at: DateTime<Utc>,
}

/// Process-local blob store, used by tests and single-process setups.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        match self.objects.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory blob store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        match self.objects.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Memory blob store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        self.write().insert(
            key.to_string(),
            Entry {
                bytes: bytes.to_vec(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        self.read()
            .get(key)
            .map(|entry| entry.bytes.clone())
            .ok_or_else(|| StorageError::NotFound {
                key: key.to_string(),
            })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.read().contains_key(key))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        validate_prefix(prefix)?;
        Ok(self
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| StoredObject {
                key: key.clone(),
                created_at: entry.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryBlobStore::new();
        store.put("u/a.mp3", b"abc").await.unwrap();

        assert_eq!(store.get("u/a.mp3").await.unwrap(), b"abc");
        assert!(store.exists("u/a.mp3").await.unwrap());
        assert!(!store.exists("u/b.mp3").await.unwrap());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryBlobStore::new();
        assert!(matches!(
            store.get("u/a.mp3").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_is_prefix_scoped() {
        let store = MemoryBlobStore::new();
        store.put("alice/1.mp3", b"1").await.unwrap();
        store.put("alice/rss.xml", b"2").await.unwrap();
        store.put("alicia/3.mp3", b"3").await.unwrap();
        store.put("bob/4.mp3", b"4").await.unwrap();

        let keys: Vec<String> = store
            .list("alice/")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, vec!["alice/1.mp3", "alice/rss.xml"]);
    }

    #[tokio::test]
    async fn test_invalid_key_rejected() {
        let store = MemoryBlobStore::new();
        assert!(store.put("../x", b"x").await.is_err());
        assert!(store.is_empty());
    }
}
