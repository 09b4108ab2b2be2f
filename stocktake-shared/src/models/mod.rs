/// Persisted records for Stocktake
///
/// Plain data types; the services own the collections and every mutation.
///
/// # Models
///
/// - `user`: Registered accounts (email or federated)
/// - `inventory`: Catalog entries and their derived surface area
/// - `work_progress`: Per-user snapshot of transient UI state
///
/// All records serialize with camelCase field names so documents written
/// by earlier releases of the app load unchanged.

pub mod inventory;
pub mod user;
pub mod work_progress;

pub use inventory::{
    CreateItem, Dimensions, InventoryItem, LengthUnit, SurfaceArea, UpdateItem, Weight,
};
pub use user::{AuthMethod, User};
pub use work_progress::{AppState, WorkProgress};
