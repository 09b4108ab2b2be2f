/// Common test utilities for integration tests
///
/// Builds a complete service graph over in-memory stores:
/// - Shared durable store and fast mirror (inspectable by tests)
/// - Manual clock for expiry and timestamp checks
/// - Scripted federated identity provider
/// - Cheap Argon2 parameters so hashing stays fast
/// - A durable store whose writes can be made to fail

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value as JsonValue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stocktake_shared::auth::{Argon2Settings, AuthConfig, MockIdentityProvider};
use stocktake_shared::clock::ManualTimeSource;
use stocktake_shared::factory::{LocalServiceFactory, ServiceBuilder};
use stocktake_shared::storage::{
    KeyValueStore, MemoryStore, Mirror, StorageError, StorageResult,
};

/// Test context containing the wired services and their collaborators
#[allow(dead_code)]
pub struct TestContext {
    pub factory: LocalServiceFactory,
    pub store: Arc<MemoryStore>,
    pub mirror: Mirror,
    pub clock: Arc<ManualTimeSource>,
    pub provider: Arc<MockIdentityProvider>,
}

#[allow(dead_code)]
impl TestContext {
    /// Fresh, empty service graph
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let mirror = Mirror::in_memory();
        let clock = test_clock();
        let provider = Arc::new(MockIdentityProvider::new());

        let factory = build_factory(store.clone(), &mirror, &clock, &provider).await;

        TestContext {
            factory,
            store,
            mirror,
            clock,
            provider,
        }
    }

    /// New service graph over the same stores, as after a restart
    pub async fn restart(&self) -> LocalServiceFactory {
        build_factory(self.store.clone(), &self.mirror, &self.clock, &self.provider).await
    }
}

/// Service graph over a durable store that can start failing writes
#[allow(dead_code)]
pub struct FailingWritesContext {
    pub factory: LocalServiceFactory,
    pub store: Arc<FailingWritesStore>,
    pub mirror: Mirror,
}

#[allow(dead_code)]
impl FailingWritesContext {
    /// Writes succeed until [`FailingWritesStore::fail_writes`] is called
    pub async fn new() -> Self {
        let store = Arc::new(FailingWritesStore::new());
        let mirror = Mirror::in_memory();
        let factory = build_factory(
            store.clone(),
            &mirror,
            &test_clock(),
            &Arc::new(MockIdentityProvider::new()),
        )
        .await;

        FailingWritesContext {
            factory,
            store,
            mirror,
        }
    }
}

/// In-memory store that rejects `set`, `remove` and `clear` on demand,
/// the way a full disk would. Reads keep working.
pub struct FailingWritesStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl FailingWritesStore {
    pub fn new() -> Self {
        FailingWritesStore {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_write(&self, key: &str) -> StorageResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io {
                key: key.to_string(),
                source: std::io::Error::other("no space left on device"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FailingWritesStore {
    fn name(&self) -> &str {
        "failing-writes"
    }

    async fn get(&self, key: &str) -> StorageResult<Option<JsonValue>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &JsonValue) -> StorageResult<()> {
        self.check_write(key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.check_write(key)?;
        self.inner.remove(key).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.check_write("*")?;
        self.inner.clear().await
    }
}

fn test_clock() -> Arc<ManualTimeSource> {
    Arc::new(ManualTimeSource::new(
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
    ))
}

async fn build_factory(
    store: Arc<dyn KeyValueStore>,
    mirror: &Mirror,
    clock: &Arc<ManualTimeSource>,
    provider: &Arc<MockIdentityProvider>,
) -> LocalServiceFactory {
    ServiceBuilder::new(store)
        .mirror(mirror.clone())
        .clock(clock.clone())
        .identity_provider(provider.clone())
        .auth_config(test_auth_config())
        .build()
        .await
}

/// Auth configuration with minimal Argon2 cost
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        argon2: Argon2Settings {
            m_cost: 1024,
            t_cost: 1,
            p_cost: 1,
        },
        ..AuthConfig::default()
    }
}
