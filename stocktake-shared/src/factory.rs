/// Service factory
///
/// The single place the service graph is wired. Callers receive the three
/// services as trait objects and never see storage, the session controller
/// or the clock, so any of them can be substituted (tests build the graph
/// over an in-memory store, a manual clock and a scripted provider).
///
/// # Wiring
///
/// ```text
/// session::channel() ──handle──> LocalWorkProgressService
///        │                              │
///    controller                  (auto_save on sign-out)
///        └──────> LocalAuthService <────┘
/// LocalInventoryService (store + clock only)
/// ```
///
/// # Example
///
/// ```no_run
/// use stocktake_shared::factory::{ServiceBuilder, ServiceFactory};
/// use stocktake_shared::storage::StorageConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let factory = ServiceBuilder::from_storage_config(&StorageConfig::default())
///     .await?
///     .build()
///     .await;
///
/// let items = factory.inventory_service().list().await;
/// println!("{} items", items.len());
/// # Ok(())
/// # }
/// ```

use crate::auth::{
    session, AuthConfig, AuthService, FederatedConfig, IdentityProvider, LocalAuthService,
    UnconfiguredProvider,
};
use crate::clock::{SystemTimeSource, TimeSource};
use crate::inventory::{InventoryService, LocalInventoryService};
use crate::progress::{LocalWorkProgressService, WorkProgressService};
use crate::storage::{FileStore, KeyValueStore, MemoryStore, Mirror, StorageConfig, StorageResult};
use std::sync::Arc;
use tracing::info;

/// Hands out the services by capability
pub trait ServiceFactory: Send + Sync {
    fn auth_service(&self) -> Arc<dyn AuthService>;
    fn inventory_service(&self) -> Arc<dyn InventoryService>;
    fn work_progress_service(&self) -> Arc<dyn WorkProgressService>;
}

/// Builder for [`LocalServiceFactory`]
pub struct ServiceBuilder {
    store: Arc<dyn KeyValueStore>,
    mirror: Mirror,
    clock: Arc<dyn TimeSource>,
    provider: Arc<dyn IdentityProvider>,
    auth_config: AuthConfig,
    federated_config: FederatedConfig,
}

impl ServiceBuilder {
    /// Starts from a durable store with an in-memory mirror, the system
    /// clock and no federated provider
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        ServiceBuilder {
            store,
            mirror: Mirror::in_memory(),
            clock: Arc::new(SystemTimeSource),
            provider: Arc::new(UnconfiguredProvider),
            auth_config: AuthConfig::default(),
            federated_config: FederatedConfig::default(),
        }
    }

    /// Everything in memory; nothing survives the process
    pub fn in_memory() -> Self {
        ServiceBuilder::new(Arc::new(MemoryStore::new()))
    }

    /// File-backed store under `data_dir`, with a file-backed mirror when
    /// `persist_session` is set
    pub async fn from_storage_config(config: &StorageConfig) -> StorageResult<Self> {
        let store = FileStore::open(&config.data_dir).await?;
        let mut builder = ServiceBuilder::new(Arc::new(store));

        if config.persist_session {
            let session_store = FileStore::open(config.session_dir()).await?;
            builder = builder.mirror(Mirror::new(Arc::new(session_store)));
        }

        Ok(builder)
    }

    pub fn mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = config;
        self
    }

    pub fn federated_config(mut self, config: FederatedConfig) -> Self {
        self.federated_config = config;
        self
    }

    /// Wires the services, initialises the provider and restores any
    /// mirrored session
    pub async fn build(self) -> LocalServiceFactory {
        let (controller, handle) = session::channel();

        let progress: Arc<dyn WorkProgressService> = Arc::new(LocalWorkProgressService::new(
            Arc::clone(&self.store),
            self.mirror.clone(),
            handle,
            Arc::clone(&self.clock),
        ));

        let auth = LocalAuthService::new(
            Arc::clone(&self.store),
            self.mirror.clone(),
            controller,
            Arc::clone(&self.clock),
            self.auth_config,
        )
        .with_identity_provider(self.provider)
        .with_progress_capture(Arc::clone(&progress));

        let restored = auth.initialize(&self.federated_config).await;

        let inventory: Arc<dyn InventoryService> = Arc::new(LocalInventoryService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
        ));

        info!(
            store = self.store.name(),
            session_restored = restored.is_some(),
            "Services initialized"
        );

        LocalServiceFactory {
            auth: Arc::new(auth),
            inventory,
            progress,
        }
    }
}

/// Factory over the store-backed services
#[derive(Clone)]
pub struct LocalServiceFactory {
    auth: Arc<dyn AuthService>,
    inventory: Arc<dyn InventoryService>,
    progress: Arc<dyn WorkProgressService>,
}

impl LocalServiceFactory {
    /// Builder over a durable store
    pub fn builder(store: Arc<dyn KeyValueStore>) -> ServiceBuilder {
        ServiceBuilder::new(store)
    }
}

impl ServiceFactory for LocalServiceFactory {
    fn auth_service(&self) -> Arc<dyn AuthService> {
        Arc::clone(&self.auth)
    }

    fn inventory_service(&self) -> Arc<dyn InventoryService> {
        Arc::clone(&self.inventory)
    }

    fn work_progress_service(&self) -> Arc<dyn WorkProgressService> {
        Arc::clone(&self.progress)
    }
}
