/// Work-progress snapshotter
///
/// Captures the transient UI state (active tab, half-filled form, cached
/// inventory view) for the signed-in user and pushes it back into the fast
/// mirror on restore. At most one snapshot exists per user; every save
/// replaces it.
///
/// None of the operations surface errors. A missing user or a failed write
/// is logged and the caller carries on, so auto-save can run on sign-out
/// without ever blocking it.
///
/// # Example
///
/// ```no_run
/// use stocktake_shared::progress::WorkProgressService;
///
/// # async fn example(progress: &dyn WorkProgressService) {
/// progress.save(serde_json::json!({"currentTab": "add-item"})).await;
/// progress.restore().await;
/// # }
/// ```

pub mod service;

pub use service::{LocalWorkProgressService, WorkProgressService};
