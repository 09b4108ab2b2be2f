/// Inventory catalog
///
/// # Modules
///
/// - [`service`]: The [`InventoryService`] trait and its store-backed implementation
/// - [`record`]: Pure item construction and patching
/// - [`surface_area`]: Derived surface-area calculation

pub mod record;
pub mod service;
pub mod surface_area;

pub use service::{InventoryService, LocalInventoryService};

use crate::storage::StorageError;

/// Error type for inventory operations
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Input rejected before any mutation
    #[error("Invalid item: {0}")]
    Validation(String),

    /// Collection could not be persisted
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Inventory result type alias
pub type InventoryResult<T> = Result<T, InventoryError>;
