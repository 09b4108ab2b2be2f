/// Inventory service
///
/// The catalog is a single ordered collection under `inventoryItems`.
/// Reads return owned copies; writes build a new record, swap it into a
/// freshly loaded collection and persist the whole collection, all under
/// the collection lock.
///
/// # Example
///
/// ```no_run
/// use stocktake_shared::inventory::{InventoryService, LocalInventoryService};
/// use stocktake_shared::models::{CreateItem, Dimensions, LengthUnit};
///
/// # async fn example(inventory: LocalInventoryService) -> Result<(), Box<dyn std::error::Error>> {
/// let item = inventory
///     .add(CreateItem::new("Plywood", 2).with_dimensions(Dimensions::new(4.0, 2.0, 0.0, LengthUnit::Foot)))
///     .await?;
/// assert_eq!(item.total_surface_area.unwrap().formatted, "16.00 ft²");
/// # Ok(())
/// # }
/// ```

use super::{record, InventoryResult};
use crate::clock::TimeSource;
use crate::models::{CreateItem, InventoryItem, UpdateItem};
use crate::storage::{keys, load_collection, read_collection, save_json, KeyValueStore};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Inventory capability
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Every item in insertion order
    async fn list(&self) -> Vec<InventoryItem>;

    /// Item by id
    async fn get(&self, id: &str) -> Option<InventoryItem>;

    /// Adds an item, assigning id, timestamps and surface area
    async fn add(&self, item: CreateItem) -> InventoryResult<InventoryItem>;

    /// Applies a patch; `Ok(None)` if no item has this id
    async fn update(&self, id: &str, patch: UpdateItem) -> InventoryResult<Option<InventoryItem>>;

    /// Removes an item; `Ok(false)` if no item had this id
    async fn delete(&self, id: &str) -> InventoryResult<bool>;

    /// Case-insensitive substring search over name, description and category
    async fn search(&self, query: &str) -> Vec<InventoryItem>;

    /// Items whose category equals `category` exactly
    async fn items_by_category(&self, category: &str) -> Vec<InventoryItem>;

    /// Sum of quantities
    async fn total_item_count(&self) -> u64;

    /// Sum of `price * quantity`, unpriced items counting as zero
    async fn total_value(&self) -> f64;
}

/// Inventory service backed by the key-value store
pub struct LocalInventoryService {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn TimeSource>,
    lock: Mutex<()>,
}

impl LocalInventoryService {
    /// Creates the service
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn TimeSource>) -> Self {
        LocalInventoryService {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Vec<InventoryItem> {
        read_collection(self.store.as_ref(), keys::INVENTORY_ITEMS).await
    }

    /// Only call with `lock` held
    async fn load_for_write(&self) -> Vec<InventoryItem> {
        load_collection(self.store.as_ref(), keys::INVENTORY_ITEMS).await
    }

    async fn persist(&self, items: &[InventoryItem]) -> InventoryResult<()> {
        save_json(self.store.as_ref(), keys::INVENTORY_ITEMS, items)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist inventory");
                e.into()
            })
    }
}

#[async_trait]
impl InventoryService for LocalInventoryService {
    async fn list(&self) -> Vec<InventoryItem> {
        self.read().await
    }

    async fn get(&self, id: &str) -> Option<InventoryItem> {
        self.read().await.into_iter().find(|item| item.id == id)
    }

    async fn add(&self, item: CreateItem) -> InventoryResult<InventoryItem> {
        let created = record::new_item(item, Uuid::now_v7().to_string(), self.clock.now())?;

        let _guard = self.lock.lock().await;
        let mut items = self.load_for_write().await;
        items.push(created.clone());
        self.persist(&items).await?;

        info!(item_id = %created.id, quantity = created.quantity, "Inventory item added");
        Ok(created)
    }

    async fn update(&self, id: &str, patch: UpdateItem) -> InventoryResult<Option<InventoryItem>> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_for_write().await;

        let Some(idx) = items.iter().position(|item| item.id == id) else {
            debug!(item_id = id, "Update for unknown item ignored");
            return Ok(None);
        };

        let updated = record::apply_patch(&items[idx], &patch, self.clock.now())?;
        items[idx] = updated.clone();
        self.persist(&items).await?;

        info!(item_id = id, "Inventory item updated");
        Ok(Some(updated))
    }

    async fn delete(&self, id: &str) -> InventoryResult<bool> {
        let _guard = self.lock.lock().await;
        let items = self.load_for_write().await;

        let before = items.len();
        let remaining: Vec<InventoryItem> = items.into_iter().filter(|item| item.id != id).collect();
        if remaining.len() == before {
            debug!(item_id = id, "Delete for unknown item ignored");
            return Ok(false);
        }

        self.persist(&remaining).await?;
        info!(item_id = id, "Inventory item deleted");
        Ok(true)
    }

    async fn search(&self, query: &str) -> Vec<InventoryItem> {
        let needle = query.to_lowercase();
        self.read()
            .await
            .into_iter()
            .filter(|item| item.matches(&needle))
            .collect()
    }

    async fn items_by_category(&self, category: &str) -> Vec<InventoryItem> {
        self.read()
            .await
            .into_iter()
            .filter(|item| item.category.as_deref() == Some(category))
            .collect()
    }

    async fn total_item_count(&self) -> u64 {
        self.read()
            .await
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    async fn total_value(&self) -> f64 {
        self.read().await.iter().map(InventoryItem::line_value).sum()
    }
}
