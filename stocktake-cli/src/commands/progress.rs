//! Work-progress commands.
//!
//! # Usage
//!
//! ```bash
//! stocktake progress save --tab add-item --form '{"name":"Ply"}'
//! stocktake progress show
//! stocktake progress restore
//! stocktake progress clear
//! ```

use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use stocktake_shared::progress::WorkProgressService;

/// Save a snapshot for the signed-in user.
pub async fn save(
    progress: &dyn WorkProgressService,
    tab: Option<String>,
    form: Option<String>,
) -> anyhow::Result<()> {
    // Without explicit fields this is the same capture sign-out performs
    if tab.is_none() && form.is_none() {
        if !progress.auto_save().await {
            anyhow::bail!("Work progress not saved (are you signed in?)");
        }
        println!("Work progress saved");
        return Ok(());
    }

    let mut data = json!({});
    if let Some(tab) = tab {
        data["currentTab"] = JsonValue::String(tab);
    }
    if let Some(form) = form {
        data["formData"] = serde_json::from_str(&form)
            .map_err(|e| anyhow::anyhow!("--form must be JSON: {}", e))?;
    }

    if !progress.save(data).await {
        anyhow::bail!("Work progress not saved (are you signed in?)");
    }
    println!("Work progress saved");
    Ok(())
}

/// Print a snapshot as JSON.
pub async fn show(progress: &dyn WorkProgressService, user: Option<&str>) -> anyhow::Result<()> {
    match progress.get(user).await {
        Some(snapshot) => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        None => println!("No work progress"),
    }
    Ok(())
}

/// Push the signed-in user's snapshot back into the session store.
pub async fn restore(progress: &dyn WorkProgressService) -> anyhow::Result<()> {
    if progress.restore().await {
        println!("Work progress restored");
    } else {
        println!("Nothing to restore");
    }
    Ok(())
}

/// Delete a snapshot.
pub async fn clear(progress: &dyn WorkProgressService, user: Option<&str>) -> anyhow::Result<()> {
    progress.clear(user).await;
    println!("Work progress cleared");
    Ok(())
}

/// List snapshots, optionally within a time window.
pub async fn list(
    progress: &dyn WorkProgressService,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> anyhow::Result<()> {
    let snapshots = match (since, until) {
        (None, None) => progress.all_progress().await,
        (since, until) => {
            let start = since.unwrap_or(DateTime::<Utc>::MIN_UTC);
            let end = until.unwrap_or(DateTime::<Utc>::MAX_UTC);
            progress.progress_between(start, end).await
        }
    };

    if snapshots.is_empty() {
        println!("No work progress");
    }
    for snapshot in snapshots {
        println!(
            "{}  {}  tab={}",
            snapshot.user_id,
            snapshot.last_saved.to_rfc3339(),
            snapshot.current_tab.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
