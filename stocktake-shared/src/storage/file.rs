/// File-backed durable store
///
/// Each key maps to `<dir>/<key>.json`, pretty-printed UTF-8. Writes go to a
/// sibling temp file first and are renamed into place, so readers only ever
/// see the old or the new document.
///
/// # Example
///
/// ```no_run
/// use stocktake_shared::storage::{FileStore, KeyValueStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FileStore::open("/var/lib/stocktake").await?;
/// store.set("users", &serde_json::json!([])).await?;
/// # Ok(())
/// # }
/// ```

use super::{validate_key, KeyValueStore, StorageError, StorageResult};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const EXTENSION: &str = "json";

/// Durable store writing one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `dir`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created
    pub async fn open(dir: impl AsRef<Path>) -> StorageResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StorageError::Io {
                key: dir.display().to_string(),
                source,
            })?;

        info!(dir = %dir.display(), "Opened file store");
        Ok(FileStore { dir })
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", key, EXTENSION))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<JsonValue>> {
        validate_key(key)?;

        let raw = match fs::read_to_string(self.path_for(key)).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key, "No document stored");
                return Ok(None);
            }
            Err(source) => {
                return Err(StorageError::Io {
                    key: key.to_string(),
                    source,
                })
            }
        };

        let value = serde_json::from_str(&raw).map_err(|source| StorageError::Serialization {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(value))
    }

    async fn set(&self, key: &str, value: &JsonValue) -> StorageResult<()> {
        validate_key(key)?;

        let body = serde_json::to_string_pretty(value).map_err(|source| {
            StorageError::Serialization {
                key: key.to_string(),
                source,
            }
        })?;

        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        let target = self.path_for(key);
        let staging = self.dir.join(format!(".{}.{}.tmp", key, EXTENSION));
        fs::write(&staging, body.as_bytes()).await.map_err(io_err)?;
        fs::rename(&staging, &target).await.map_err(io_err)?;

        debug!(key, bytes = body.len(), "Wrote document");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;

        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        let io_err = |source| StorageError::Io {
            key: self.dir.display().to_string(),
            source,
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut removed = 0usize;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_document = path.extension().map_or(false, |ext| ext == EXTENSION);
            if is_document && entry.file_type().await.map_err(io_err)?.is_file() {
                fs::remove_file(&path).await.map_err(io_err)?;
                removed += 1;
            }
        }

        info!(dir = %self.dir.display(), removed, "Cleared file store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn temp_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path()).await.expect("open store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_get_missing_key_is_absent() {
        let (_dir, store) = temp_store().await;
        assert_eq!(store.get("users").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (dir, store) = temp_store().await;
        let value = json!([{"id": "user_1", "email": "a@b.co"}]);

        store.set("users", &value).await.unwrap();
        assert_eq!(store.get("users").await.unwrap(), Some(value));

        // Stored as a pretty-printed document named after the key
        let raw = std::fs::read_to_string(dir.path().join("users.json")).unwrap();
        assert!(raw.contains('\n'));
        // No staging file is left behind
        assert!(!dir.path().join(".users.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (_dir, store) = temp_store().await;
        store.set("currentTab", &json!("inventory")).await.unwrap();
        store.set("currentTab", &json!("profile")).await.unwrap();
        assert_eq!(store.get("currentTab").await.unwrap(), Some(json!("profile")));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_dir, store) = temp_store().await;
        store.set("formData", &json!({})).await.unwrap();

        store.remove("formData").await.unwrap();
        store.remove("formData").await.unwrap();
        assert_eq!(store.get("formData").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_serialization_error() {
        let (dir, store) = temp_store().await;
        std::fs::write(dir.path().join("users.json"), "{not json").unwrap();

        let result = store.get("users").await;
        assert!(matches!(result, Err(StorageError::Serialization { .. })));
    }

    #[tokio::test]
    async fn test_clear_removes_documents_only() {
        let (dir, store) = temp_store().await;
        store.set("users", &json!([])).await.unwrap();
        store.set("inventoryItems", &json!([])).await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.get("users").await.unwrap(), None);
        assert_eq!(store.get("inventoryItems").await.unwrap(), None);
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let (_dir, store) = temp_store().await;
        let result = store.set("../escape", &json!(1)).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
