/// Key-value storage for the service layer
///
/// Every persisted collection is one JSON document under a string key.
/// Services depend only on the [`KeyValueStore`] trait so the durable
/// backend can be swapped (files on device, in-memory for tests).
///
/// # Modules
///
/// - [`file`]: Durable backend writing `<dir>/<key>.json` atomically
/// - [`memory`]: In-process backend for tests and ephemeral use
/// - [`mirror`]: Fast, best-effort store for small session-scoped values
///
/// # Layout
///
/// | Key | Store | Shape |
/// |---|---|---|
/// | `users` | durable | sequence of users |
/// | `inventoryItems` | durable | sequence of inventory items |
/// | `work_progress` | durable | sequence of work-progress snapshots |
/// | `currentUser` | mirror | single user or absent |
/// | `inventoryData`, `currentTab`, `formData` | mirror | UI-scoped fields |
///
/// # Example
///
/// ```
/// use stocktake_shared::storage::{KeyValueStore, MemoryStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// store.set("currentTab", &serde_json::json!("inventory")).await?;
/// assert_eq!(store.get("currentTab").await?, Some(serde_json::json!("inventory")));
///
/// // Missing keys are absent, not errors
/// assert_eq!(store.get("nothing").await?, None);
/// # Ok(())
/// # }
/// ```

pub mod file;
pub mod memory;
pub mod mirror;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use mirror::Mirror;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use tracing::{error, warn};

/// Storage keys shared by the services
pub mod keys {
    /// User registry (durable)
    pub const USERS: &str = "users";

    /// Inventory collection (durable)
    pub const INVENTORY_ITEMS: &str = "inventoryItems";

    /// Work-progress snapshots (durable)
    pub const WORK_PROGRESS: &str = "work_progress";

    /// Session mirror (fast store)
    pub const CURRENT_USER: &str = "currentUser";

    /// Cached inventory view (fast store)
    pub const INVENTORY_DATA: &str = "inventoryData";

    /// Active UI tab (fast store)
    pub const CURRENT_TAB: &str = "currentTab";

    /// In-progress form (fast store)
    pub const FORM_DATA: &str = "formData";
}

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying I/O failed (disk full, permissions, ...)
    #[error("Storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Value could not be serialized or a stored document could not be parsed
    #[error("Serialization failed for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Key is empty or would escape the storage directory
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key-value store contract
///
/// Values are JSON trees. A read of a missing key yields `Ok(None)`;
/// `remove` of a missing key succeeds. Writes replace the whole value and
/// are atomic from a reader's point of view.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the backend name (used in logs)
    fn name(&self) -> &str;

    /// Reads the value stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Option<JsonValue>>;

    /// Replaces the value stored under `key`
    async fn set(&self, key: &str, value: &JsonValue) -> StorageResult<()>;

    /// Removes `key` (idempotent)
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Removes every key owned by this store
    async fn clear(&self) -> StorageResult<()>;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the durable JSON documents
    pub data_dir: PathBuf,

    /// Whether the fast mirror is backed by files under `<data_dir>/session`
    ///
    /// Default: false (mirror lives in memory and is lost on exit)
    pub persist_session: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            persist_session: false,
        }
    }
}

impl StorageConfig {
    /// Directory used by a persisted session mirror
    pub fn session_dir(&self) -> PathBuf {
        self.data_dir.join("session")
    }
}

/// Rejects keys that are empty or could address anything outside the store
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key == "."
        || key.contains("..")
        || key.contains('/')
        || key.contains('\\')
        || key.contains('\0');

    if invalid {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Serializes `value` and writes it under `key`
pub async fn save_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> StorageResult<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_value(value).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &json).await
}

fn parse_collection<T: DeserializeOwned>(key: &str, value: JsonValue) -> StorageResult<Vec<T>> {
    serde_json::from_value::<Vec<T>>(value).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })
}

/// Reads a collection stored under `key` without writing anything
///
/// A missing key is an empty collection. A read or parse failure is logged
/// and the collection is treated as empty; the stored document is left
/// for the next locked write to repair.
pub async fn read_collection<T>(store: &dyn KeyValueStore, key: &str) -> Vec<T>
where
    T: DeserializeOwned,
{
    let parsed = match store.get(key).await {
        Ok(None) => return Vec::new(),
        Ok(Some(value)) => parse_collection(key, value),
        Err(e) => Err(e),
    };

    parsed.unwrap_or_else(|e| {
        warn!(store = store.name(), key, error = %e, "Failed to read collection, treating as empty");
        Vec::new()
    })
}

/// Loads a collection stored under `key` for modification
///
/// Same as [`read_collection`], except that a read or parse failure also
/// writes an empty collection back so the next read succeeds. Callers must
/// hold the lock that serializes writes to `key`.
pub async fn load_collection<T>(store: &dyn KeyValueStore, key: &str) -> Vec<T>
where
    T: DeserializeOwned + Serialize,
{
    let parsed = match store.get(key).await {
        Ok(None) => return Vec::new(),
        Ok(Some(value)) => parse_collection(key, value),
        Err(e) => Err(e),
    };

    match parsed {
        Ok(items) => items,
        Err(e) => {
            error!(store = store.name(), key, error = %e, "Failed to read collection, reseeding empty");
            let empty: Vec<T> = Vec::new();
            if let Err(e) = save_json(store, key, &empty).await {
                warn!(store = store.name(), key, error = %e, "Failed to reseed collection");
            }
            empty
        }
    }
}
