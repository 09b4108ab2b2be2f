/// Work-progress snapshot model
///
/// One snapshot per user, replaced on every save. `data` is whatever the UI
/// handed in; `inventory_data`, `current_tab` and `form_data` are
/// projections of it that restore writes back into the fast mirror.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Tab restored when a snapshot does not name one
pub const DEFAULT_TAB: &str = "inventory";

/// Per-user snapshot of transient UI state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkProgress {
    pub user_id: String,
    pub last_saved: DateTime<Utc>,
    pub data: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory_data: Option<Vec<JsonValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_tab: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<JsonValue>,
}

impl WorkProgress {
    /// Builds a snapshot from raw UI data
    ///
    /// Missing projections fall back to an empty list, [`DEFAULT_TAB`] and
    /// an empty object.
    pub fn capture(user_id: impl Into<String>, data: JsonValue, at: DateTime<Utc>) -> Self {
        let inventory_data = match data.get("inventoryData") {
            Some(JsonValue::Array(items)) => items.clone(),
            _ => Vec::new(),
        };

        let current_tab = data
            .get("currentTab")
            .and_then(JsonValue::as_str)
            .filter(|tab| !tab.is_empty())
            .unwrap_or(DEFAULT_TAB)
            .to_string();

        let form_data = match data.get("formData") {
            Some(value) if !value.is_null() => value.clone(),
            _ => JsonValue::Object(Default::default()),
        };

        WorkProgress {
            user_id: user_id.into(),
            last_saved: at,
            data,
            inventory_data: Some(inventory_data),
            current_tab: Some(current_tab),
            form_data: Some(form_data),
        }
    }
}

/// Live UI state gathered from the fast mirror for auto-save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub inventory_data: Vec<JsonValue>,
    pub current_tab: String,
    pub form_data: JsonValue,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_capture_projects_fields() {
        let data = json!({
            "inventoryData": [{"id": "a"}],
            "currentTab": "add-items",
            "formData": {"name": "Plywood"}
        });

        let progress = WorkProgress::capture("user_1", data.clone(), at());

        assert_eq!(progress.user_id, "user_1");
        assert_eq!(progress.data, data);
        assert_eq!(progress.inventory_data, Some(vec![json!({"id": "a"})]));
        assert_eq!(progress.current_tab.as_deref(), Some("add-items"));
        assert_eq!(progress.form_data, Some(json!({"name": "Plywood"})));
    }

    #[test]
    fn test_capture_defaults() {
        let progress = WorkProgress::capture("user_1", json!({}), at());

        assert_eq!(progress.inventory_data, Some(vec![]));
        assert_eq!(progress.current_tab.as_deref(), Some(DEFAULT_TAB));
        assert_eq!(progress.form_data, Some(json!({})));
    }

    #[test]
    fn test_app_state_serializes_like_ui_data() {
        let state = AppState {
            inventory_data: vec![],
            current_tab: "inventory".to_string(),
            form_data: json!({}),
            timestamp: at(),
        };

        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("inventoryData").is_some());
        assert!(json.get("currentTab").is_some());
        assert!(json.get("formData").is_some());
    }
}
