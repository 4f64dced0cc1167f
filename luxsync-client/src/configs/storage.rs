use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::errors::StorageError;

/// String key-value blobs, the same contract a browser's local storage has.
#[async_trait::async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl LocalStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.data.write().await.clear();
        Ok(())
    }
}

/// A single JSON object on disk mapping keys to string blobs.
pub struct FileStorage {
    path: PathBuf,
    // serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `read_all`, but a corrupted file reads as empty so the next
    /// write replaces it. I/O errors still fail.
    async fn read_for_update(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_all().await {
            Err(StorageError::Corrupted(e)) => {
                warn!("Replacing corrupted storage file {}: {}", self.path.display(), e);
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    async fn write_all(&self, data: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        fs::rename(&tmp, &self.path).await?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_for_update().await?;
        data.insert(key.to_string(), value.to_string());
        self.write_all(&data).await
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut data = self.read_for_update().await?;
        if data.remove(key).is_some() {
            self.write_all(&data).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(&self.path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();

        storage.set_item("a", "1").await.unwrap();
        storage.set_item("b", "2").await.unwrap();
        assert_eq!(storage.get_item("a").await.unwrap().as_deref(), Some("1"));

        storage.remove_item("a").await.unwrap();
        assert_eq!(storage.get_item("a").await.unwrap(), None);

        storage.clear().await.unwrap();
        assert_eq!(storage.get_item("b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::new(&path);
        storage.set_item("status", "{\"x\":1}").await.unwrap();
        storage.set_item("other", "keep").await.unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get_item("status").await.unwrap().as_deref(),
            Some("{\"x\":1}")
        );

        reopened.remove_item("status").await.unwrap();
        assert_eq!(reopened.get_item("status").await.unwrap(), None);
        assert_eq!(reopened.get_item("other").await.unwrap().as_deref(), Some("keep"));

        reopened.clear().await.unwrap();
        assert!(!path.exists());
        reopened.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_storage_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(
            storage.get_item("status").await,
            Err(StorageError::Corrupted(_))
        ));

        storage.set_item("status", "fresh").await.unwrap();
        assert_eq!(storage.get_item("status").await.unwrap().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_file_storage_io_errors_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be cannot be read as one
        let path = dir.path().join("storage.json");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "data").unwrap();

        let storage = FileStorage::new(&path);
        assert!(matches!(storage.set_item("status", "x").await, Err(StorageError::Io(_))));
        assert!(matches!(storage.remove_item("status").await, Err(StorageError::Io(_))));
        assert!(path.join("keep").exists());
    }
}
