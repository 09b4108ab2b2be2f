/// Fast, best-effort store for session-scoped values
///
/// The mirror holds the signed-in user and the transient UI state the
/// work-progress snapshotter pushes back on restore. It never raises:
/// failures are logged and reads degrade to absent.

use super::{KeyValueStore, MemoryStore};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::warn;

/// Error-swallowing wrapper around a [`KeyValueStore`]
#[derive(Clone)]
pub struct Mirror {
    inner: Arc<dyn KeyValueStore>,
}

impl Mirror {
    /// Wraps an existing backend
    pub fn new(inner: Arc<dyn KeyValueStore>) -> Self {
        Mirror { inner }
    }

    /// Mirror that lives only as long as the process
    pub fn in_memory() -> Self {
        Mirror::new(Arc::new(MemoryStore::new()))
    }

    /// Reads a raw value, `None` on miss or failure
    pub async fn get(&self, key: &str) -> Option<JsonValue> {
        match self.inner.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(store = self.inner.name(), key, error = %e, "Mirror read failed");
                None
            }
        }
    }

    /// Reads and decodes a value, `None` on miss, failure or shape mismatch
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(key, error = %e, "Mirror value has unexpected shape");
                None
            }
        }
    }

    /// Writes a raw value, logging on failure
    pub async fn set(&self, key: &str, value: &JsonValue) {
        if let Err(e) = self.inner.set(key, value).await {
            warn!(store = self.inner.name(), key, error = %e, "Mirror write failed");
        }
    }

    /// Encodes and writes a value, logging on failure
    pub async fn set_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(json) => self.set(key, &json).await,
            Err(e) => warn!(key, error = %e, "Mirror value could not be serialized"),
        }
    }

    /// Removes a value, logging on failure
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.inner.remove(key).await {
            warn!(store = self.inner.name(), key, error = %e, "Mirror remove failed");
        }
    }
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("backend", &self.inner.name())
            .finish()
    }
}
