use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{validate_key, validate_prefix, BlobStore, StoredObject};
use crate::error::StorageError;

/// Marker for in-progress writes; such files are never listed.
const TEMP_MARKER: &str = ".partial-";

/// Blob store rooted at a local directory. Key segments map to path
/// components below the root.
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            key: key.to_string(),
            source,
        }
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|component| component.as_os_str().to_str())
            .collect();
        Some(segments?.join("/"))
    }
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_MARKER))
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let parent = path.parent().unwrap_or(&self.root).to_path_buf();
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(Self::io_error(key))?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("object");
        let temp_path = parent.join(format!(
            "{}{}-{}",
            TEMP_MARKER,
            uuid::Uuid::new_v4().simple(),
            file_name
        ));

        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(Self::io_error(key))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await {
                log::warn!(
                    "Failed to remove temporary file {}: {}",
                    temp_path.display(),
                    cleanup
                );
            }
            return Err(Self::io_error(key)(e));
        }

        log::debug!("Stored {} bytes at {}", bytes.len(), key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(Self::io_error(key)(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(key)(e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        validate_prefix(prefix)?;

        // Only the directory named by the prefix's complete segments can hold matches.
        let start = match prefix.rfind('/') {
            Some(pos) => prefix[..pos]
                .split('/')
                .fold(self.root.clone(), |path, segment| path.join(segment)),
            None => self.root.clone(),
        };

        let mut objects = Vec::new();
        let mut pending = vec![start];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(Self::io_error(prefix)(e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(Self::io_error(prefix))?
            {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(Self::io_error(prefix))?;

                if metadata.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !metadata.is_file() || is_temp_file(&path) {
                    continue;
                }

                let Some(key) = self.key_for(&path) else {
                    log::warn!("Skipping non UTF-8 path {}", path.display());
                    continue;
                };
                if !key.starts_with(prefix) {
                    continue;
                }

                let created = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .map_err(Self::io_error(prefix))?;
                objects.push(StoredObject {
                    key,
                    created_at: DateTime::<Utc>::from(created),
                });
            }
        }

        Ok(objects)
    }
}
