/// Work-progress service
///
/// Keeps at most one snapshot per user in the `work_progress` collection.
/// `save` upserts the signed-in user's snapshot; `auto_save` builds the
/// payload from the live UI fields in the fast mirror, which is what
/// sign-out calls. `restore` copies a snapshot's projections back into the
/// mirror. Writes load, modify and persist the collection under the
/// collection lock; failures are logged and reported as `false`, never
/// raised.
///
/// ```text
/// sign-out ──> auto_save ──> save ──> work_progress[user_id] = snapshot
/// restore  <── work_progress[user_id] ──> mirror (inventoryData, currentTab, formData)
/// ```

use crate::auth::SessionHandle;
use crate::clock::TimeSource;
use crate::models::{work_progress::DEFAULT_TAB, AppState, WorkProgress};
use crate::storage::{keys, load_collection, read_collection, save_json, KeyValueStore, Mirror};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Work-progress capability
#[async_trait]
pub trait WorkProgressService: Send + Sync {
    /// Upserts the current user's snapshot; `false` if nothing was saved
    async fn save(&self, data: JsonValue) -> bool;

    /// Snapshot for `user_id`, or for the current user when omitted
    async fn get(&self, user_id: Option<&str>) -> Option<WorkProgress>;

    /// Deletes the snapshot for `user_id`, or for the current user when omitted
    async fn clear(&self, user_id: Option<&str>);

    /// Writes the current user's snapshot back into the fast mirror;
    /// `false` if there was nothing to restore
    async fn restore(&self) -> bool;

    /// Captures the live UI state from the fast mirror and saves it
    async fn auto_save(&self) -> bool;

    /// Every stored snapshot
    async fn all_progress(&self) -> Vec<WorkProgress>;

    /// Snapshots saved within `[start, end]`
    async fn progress_between(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Vec<WorkProgress>;
}

/// Snapshotter backed by the key-value store
pub struct LocalWorkProgressService {
    store: Arc<dyn KeyValueStore>,
    mirror: Mirror,
    session: SessionHandle,
    clock: Arc<dyn TimeSource>,
    lock: Mutex<()>,
}

impl LocalWorkProgressService {
    /// Creates the service; the session handle supplies the current user
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        mirror: Mirror,
        session: SessionHandle,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        LocalWorkProgressService {
            store,
            mirror,
            session,
            clock,
            lock: Mutex::new(()),
        }
    }

    async fn read(&self) -> Vec<WorkProgress> {
        read_collection(self.store.as_ref(), keys::WORK_PROGRESS).await
    }

    /// Only call with `lock` held
    async fn load_for_write(&self) -> Vec<WorkProgress> {
        load_collection(self.store.as_ref(), keys::WORK_PROGRESS).await
    }

    fn target_user(&self, user_id: Option<&str>) -> Option<String> {
        user_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| self.session.current_user_id())
    }

    /// Live UI state, with defaults for anything missing
    async fn app_state(&self) -> AppState {
        let inventory_data = match self.mirror.get(keys::INVENTORY_DATA).await {
            Some(JsonValue::Array(items)) => items,
            _ => Vec::new(),
        };
        let current_tab = self
            .mirror
            .get_as::<String>(keys::CURRENT_TAB)
            .await
            .filter(|tab| !tab.is_empty())
            .unwrap_or_else(|| DEFAULT_TAB.to_string());
        let form_data = match self.mirror.get(keys::FORM_DATA).await {
            Some(value) if !value.is_null() => value,
            _ => JsonValue::Object(Default::default()),
        };

        AppState {
            inventory_data,
            current_tab,
            form_data,
            timestamp: self.clock.now(),
        }
    }
}

#[async_trait]
impl WorkProgressService for LocalWorkProgressService {
    async fn save(&self, data: JsonValue) -> bool {
        let Some(user_id) = self.session.current_user_id() else {
            warn!("No user signed in, work progress not saved");
            return false;
        };

        let snapshot = WorkProgress::capture(user_id.clone(), data, self.clock.now());

        let _guard = self.lock.lock().await;
        let mut snapshots = self.load_for_write().await;
        match snapshots.iter().position(|p| p.user_id == user_id) {
            Some(idx) => snapshots[idx] = snapshot,
            None => snapshots.push(snapshot),
        }

        match save_json(self.store.as_ref(), keys::WORK_PROGRESS, &snapshots).await {
            Ok(()) => {
                debug!(user_id = %user_id, "Work progress saved");
                true
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to persist work progress");
                false
            }
        }
    }

    async fn get(&self, user_id: Option<&str>) -> Option<WorkProgress> {
        let target = self.target_user(user_id)?;
        self.read().await.into_iter().find(|p| p.user_id == target)
    }

    async fn clear(&self, user_id: Option<&str>) {
        let Some(target) = self.target_user(user_id) else {
            return;
        };

        let _guard = self.lock.lock().await;
        let snapshots = self.load_for_write().await;
        let before = snapshots.len();
        let remaining: Vec<WorkProgress> =
            snapshots.into_iter().filter(|p| p.user_id != target).collect();
        if remaining.len() == before {
            return;
        }

        match save_json(self.store.as_ref(), keys::WORK_PROGRESS, &remaining).await {
            Ok(()) => info!(user_id = %target, "Work progress cleared"),
            Err(e) => error!(user_id = %target, error = %e, "Failed to clear work progress"),
        }
    }

    async fn restore(&self) -> bool {
        let Some(user_id) = self.session.current_user_id() else {
            return false;
        };
        let Some(snapshot) = self.get(Some(&user_id)).await else {
            debug!(user_id = %user_id, "No work progress to restore");
            return false;
        };

        if let Some(inventory_data) = &snapshot.inventory_data {
            self.mirror.set_as(keys::INVENTORY_DATA, inventory_data).await;
        }
        if let Some(tab) = &snapshot.current_tab {
            self.mirror.set_as(keys::CURRENT_TAB, tab).await;
        }
        if let Some(form_data) = &snapshot.form_data {
            self.mirror.set(keys::FORM_DATA, form_data).await;
        }

        info!(user_id = %user_id, last_saved = %snapshot.last_saved, "Work progress restored");
        true
    }

    async fn auto_save(&self) -> bool {
        if !self.session.is_authenticated() {
            return false;
        }

        let state = self.app_state().await;
        match serde_json::to_value(&state) {
            Ok(data) => self.save(data).await,
            Err(e) => {
                error!(error = %e, "Failed to capture application state");
                false
            }
        }
    }

    async fn all_progress(&self) -> Vec<WorkProgress> {
        self.read().await
    }

    async fn progress_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<WorkProgress> {
        self.read()
            .await
            .into_iter()
            .filter(|p| p.last_saved >= start && p.last_saved <= end)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{session, SessionController};
    use crate::clock::ManualTimeSource;
    use crate::models::{AuthMethod, User};
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    struct Harness {
        progress: LocalWorkProgressService,
        controller: SessionController,
        mirror: Mirror,
        store: Arc<MemoryStore>,
        clock: Arc<ManualTimeSource>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let mirror = Mirror::in_memory();
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 7, 4, 12, 0, 0).unwrap(),
        ));
        let (controller, handle) = session::channel();
        let progress =
            LocalWorkProgressService::new(store.clone(), mirror.clone(), handle, clock.clone());

        Harness {
            progress,
            controller,
            mirror,
            store,
            clock,
        }
    }

    fn sign_in(controller: &SessionController, id: &str) {
        controller.set(&User {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_string(),
            image_url: None,
            registered_at: Utc::now(),
            auth_method: AuthMethod::Email,
            password: None,
            reset_token: None,
            reset_token_expiry: None,
        });
    }

    #[tokio::test]
    async fn test_save_without_user_is_silent() {
        let h = harness();
        assert!(!h.progress.save(json!({"currentTab": "add"})).await);
        assert!(h.progress.all_progress().await.is_empty());
        assert!(h.progress.get(None).await.is_none());
    }

    #[tokio::test]
    async fn test_save_upserts_per_user() {
        let h = harness();
        sign_in(&h.controller, "user_a");

        assert!(h.progress.save(json!({"currentTab": "add"})).await);
        h.clock.advance(Duration::minutes(1));
        assert!(h.progress.save(json!({"currentTab": "reports"})).await);

        let all = h.progress.all_progress().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].current_tab.as_deref(), Some("reports"));
        assert_eq!(all[0].last_saved, h.clock.now());
    }

    #[tokio::test]
    async fn test_projections_default() {
        let h = harness();
        sign_in(&h.controller, "user_a");
        h.progress.save(json!({"note": "half done"})).await;

        let snapshot = h.progress.get(None).await.unwrap();
        assert_eq!(snapshot.inventory_data, Some(vec![]));
        assert_eq!(snapshot.current_tab.as_deref(), Some("inventory"));
        assert_eq!(snapshot.form_data, Some(json!({})));
        assert_eq!(snapshot.data, json!({"note": "half done"}));
    }

    #[tokio::test]
    async fn test_get_and_clear_by_explicit_user() {
        let h = harness();
        sign_in(&h.controller, "user_a");
        h.progress.save(json!({"currentTab": "a"})).await;
        sign_in(&h.controller, "user_b");
        h.progress.save(json!({"currentTab": "b"})).await;

        assert_eq!(
            h.progress.get(Some("user_a")).await.unwrap().current_tab.as_deref(),
            Some("a")
        );

        h.progress.clear(Some("user_a")).await;
        assert!(h.progress.get(Some("user_a")).await.is_none());
        assert!(h.progress.get(None).await.is_some());

        h.progress.clear(None).await;
        assert!(h.progress.all_progress().await.is_empty());
    }

    #[tokio::test]
    async fn test_restore_writes_mirror() {
        let h = harness();
        sign_in(&h.controller, "user_a");
        h.progress
            .save(json!({
                "inventoryData": [{"name": "Plywood"}],
                "currentTab": "add-item",
                "formData": {"name": "Ply"}
            }))
            .await;

        assert!(h.progress.restore().await);
        assert_eq!(
            h.mirror.get(keys::INVENTORY_DATA).await,
            Some(json!([{"name": "Plywood"}]))
        );
        assert_eq!(h.mirror.get(keys::CURRENT_TAB).await, Some(json!("add-item")));
        assert_eq!(h.mirror.get(keys::FORM_DATA).await, Some(json!({"name": "Ply"})));
    }

    #[tokio::test]
    async fn test_restore_without_snapshot() {
        let h = harness();
        assert!(!h.progress.restore().await);

        sign_in(&h.controller, "user_a");
        assert!(!h.progress.restore().await);
        assert!(h.mirror.get(keys::CURRENT_TAB).await.is_none());
    }

    #[tokio::test]
    async fn test_auto_save_reads_mirror() {
        let h = harness();
        sign_in(&h.controller, "user_a");
        h.mirror.set(keys::CURRENT_TAB, &json!("reports")).await;
        h.mirror.set(keys::FORM_DATA, &json!({"qty": 3})).await;

        assert!(h.progress.auto_save().await);

        let snapshot = h.progress.get(None).await.unwrap();
        assert_eq!(snapshot.current_tab.as_deref(), Some("reports"));
        assert_eq!(snapshot.form_data, Some(json!({"qty": 3})));
        assert_eq!(snapshot.inventory_data, Some(vec![]));
        assert_eq!(snapshot.data["timestamp"], json!(h.clock.now()));
    }

    #[tokio::test]
    async fn test_auto_save_without_user() {
        let h = harness();
        assert!(!h.progress.auto_save().await);
        assert_eq!(h.store.get(keys::WORK_PROGRESS).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_progress_between_is_inclusive() {
        let h = harness();
        let start = h.clock.now();

        sign_in(&h.controller, "user_a");
        h.progress.save(json!({})).await;

        h.clock.advance(Duration::hours(1));
        sign_in(&h.controller, "user_b");
        h.progress.save(json!({})).await;
        let end = h.clock.now();

        h.clock.advance(Duration::hours(1));
        sign_in(&h.controller, "user_c");
        h.progress.save(json!({})).await;

        let found = h.progress.progress_between(start, end).await;
        let ids: Vec<&str> = found.iter().map(|p| p.user_id.as_str()).collect();
        assert_eq!(ids, vec!["user_a", "user_b"]);
    }
}
