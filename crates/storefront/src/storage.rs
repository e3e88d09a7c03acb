//! Object storage seam.
//!
//! Real object storage (S3/MinIO/...) is an external collaborator; the
//! engine only depends on this trait. [`LocalObjectStore`] is the
//! filesystem-backed implementation used in development, served as static
//! files by the HTTP layer.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from the object storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid object key: {0}")]
    InvalidKey(String),
}

/// Minimal object storage contract: upload returns the public URL.
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return the object's public URL.
    fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Delete the object under `key`. Deleting a missing object is not an
    /// error (the compensating path may race an earlier failure).
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Filesystem-backed object store for development and tests.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`, issuing URLs under `base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        // Keys are server-generated, but reject traversal anyway.
        if key.is_empty()
            || Path::new(key)
                .components()
                .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(key))
    }
}

impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        Ok(format!("{}/{key}", self.base_url))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory object store double for service tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{ObjectStore, StorageError};

    /// In-memory store that can be told to fail uploads.
    #[derive(Debug, Default)]
    pub struct MemoryObjectStore {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
        pub fail_uploads: bool,
    }

    impl ObjectStore for MemoryObjectStore {
        async fn upload(
            &self,
            key: &str,
            bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            if self.fail_uploads {
                return Err(StorageError::Io(std::io::Error::other("upload refused")));
            }
            self.objects
                .lock()
                .expect("lock poisoned")
                .insert(key.to_owned(), bytes);
            Ok(format!("mem://{key}"))
        }

        async fn delete(&self, key: &str) -> Result<(), StorageError> {
            self.objects.lock().expect("lock poisoned").remove(key);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traversal_keys_are_rejected() {
        let store = LocalObjectStore::new("/tmp/media", "http://localhost:3000/media");
        assert!(store.resolve("../etc/passwd").is_err());
        assert!(store.resolve("").is_err());
        assert!(store.resolve("stores/1/variants/2.png").is_ok());
    }

    #[tokio::test]
    async fn upload_then_delete_round_trips() {
        let dir = std::env::temp_dir().join(format!("vendora-store-{}", uuid::Uuid::new_v4()));
        let store = LocalObjectStore::new(&dir, "http://localhost:3000/media");

        let url = store
            .upload("stores/1/variants/9.png", vec![1, 2, 3], "image/png")
            .await
            .expect("upload");
        assert_eq!(url, "http://localhost:3000/media/stores/1/variants/9.png");
        assert!(dir.join("stores/1/variants/9.png").exists());

        store.delete("stores/1/variants/9.png").await.expect("delete");
        assert!(!dir.join("stores/1/variants/9.png").exists());

        // Deleting again is fine.
        store.delete("stores/1/variants/9.png").await.expect("idempotent");
    }
}
