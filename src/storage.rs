//! Avatar blob storage
//!
//! Agents may carry an uploaded avatar image. Blobs are stored under a
//! per-owner prefix with a timestamped file name so replacements never
//! collide, and served back at `/avatars/{owner}/{file}`.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// File extensions accepted for avatar uploads
const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Abstraction over the avatar blob store
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Store a blob under a fresh key for the owner, returning the key
    async fn put(&self, owner_id: Uuid, extension: &str, bytes: &[u8])
    -> Result<String, StorageError>;

    /// Delete a blob by key; missing blobs are not an error
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL at which the blob is served
    fn public_url(&self, key: &str) -> String;
}

/// Derive a storage key for an owner and extension
///
/// Keys have the shape `{owner}/{owner}-{millis}.{ext}`; the millisecond
/// timestamp makes replacement uploads distinct.
pub fn build_avatar_key(owner_id: Uuid, extension: &str) -> Result<String, StorageError> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(StorageError::UnsupportedType(ext));
    }

    Ok(format!(
        "{}/{}-{}.{}",
        owner_id,
        owner_id,
        Utc::now().timestamp_millis(),
        ext
    ))
}

/// Extract the storage key from a previously issued public URL
///
/// Returns `None` for URLs that do not point into the avatar store, so
/// externally hosted avatar URLs are left alone on replace/delete.
pub fn key_from_public_url(url: &str) -> Option<String> {
    let (_, key) = url.split_once("/avatars/")?;
    if key.is_empty() || key.contains("..") {
        return None;
    }
    Some(key.to_string())
}

/// Filesystem-backed avatar storage
pub struct LocalAvatarStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalAvatarStorage {
    /// Create a storage instance rooted at `root`, serving under `base_url`
    pub fn new<P: AsRef<Path>>(root: P, base_url: &str) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        // Keys are service-generated, but reject traversal anyway since
        // delete paths can originate from stored URLs.
        if key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl AvatarStorage for LocalAvatarStorage {
    async fn put(
        &self,
        owner_id: Uuid,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let key = build_avatar_key(owner_id, extension)?;
        let path = self.resolve(&key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key, "Avatar blob already absent on delete");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/avatars/{}", self.base_url, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn avatar_key_shape() {
        let owner = Uuid::new_v4();
        let key = build_avatar_key(owner, "png").unwrap();

        let (prefix, file) = key.split_once('/').unwrap();
        assert_eq!(prefix, owner.to_string());
        assert!(file.starts_with(&format!("{}-", owner)));
        assert!(file.ends_with(".png"));
    }

    #[test]
    fn rejects_unsupported_extension() {
        let result = build_avatar_key(Uuid::new_v4(), "exe");
        assert!(matches!(result, Err(StorageError::UnsupportedType(_))));
    }

    #[test]
    fn key_roundtrips_through_public_url() {
        let storage = LocalAvatarStorage::new("/tmp/avatars", "https://personas.test");
        let owner = Uuid::new_v4();
        let key = format!("{}/{}-1700000000000.png", owner, owner);

        let url = storage.public_url(&key);
        assert_eq!(url, format!("https://personas.test/avatars/{}", key));
        assert_eq!(key_from_public_url(&url).as_deref(), Some(key.as_str()));
    }

    #[test]
    fn foreign_urls_produce_no_key() {
        assert!(key_from_public_url("https://cdn.example.com/image.png").is_none());
        assert!(key_from_public_url("https://evil.test/avatars/../secrets").is_none());
    }

    #[tokio::test]
    async fn put_and_delete_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = LocalAvatarStorage::new(dir.path(), "http://localhost:8080");
        let owner = Uuid::new_v4();

        let key = storage.put(owner, "png", b"fake image bytes").await.unwrap();
        let stored = dir.path().join(&key);
        assert!(stored.exists());

        storage.delete(&key).await.unwrap();
        assert!(!stored.exists());

        // Second delete of a missing blob is not an error
        storage.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn delete_rejects_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let storage = LocalAvatarStorage::new(dir.path(), "http://localhost:8080");

        let result = storage.delete("../outside.png").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
