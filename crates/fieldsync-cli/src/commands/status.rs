use fieldsync_core::{PinManager, QueueStatus};
use serde::Serialize;

use crate::commands::common::{format_timestamp, probe_reachability, AppContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct StatusView {
    profile: String,
    db_path: String,
    api_base_url: Option<String>,
    /// `None` when no API is configured to probe
    api_reachable: Option<bool>,
    queue: QueueStatus,
    pinned: usize,
}

pub async fn run_status(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let store = ctx.store();
    let queue = store.queue_status().await?;
    let pinned = PinManager::new(store).all_pinned().await?.len();

    let api_reachable = match ctx.settings.api_base_url.as_deref() {
        Some(url) => Some(probe_reachability(&reqwest::Client::new(), url).await),
        None => None,
    };

    let view = StatusView {
        profile: ctx.profile.clone(),
        db_path: ctx.db_path.display().to_string(),
        api_base_url: ctx.settings.api_base_url.clone(),
        api_reachable,
        queue,
        pinned,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Profile:   {}", view.profile);
    println!("Store:     {}", view.db_path);
    println!(
        "API:       {}",
        match (&view.api_base_url, view.api_reachable) {
            (Some(url), Some(true)) => format!("{url} (reachable)"),
            (Some(url), _) => format!("{url} (unreachable)"),
            (None, _) => "not configured".to_string(),
        }
    );
    println!(
        "Pending:   {} ({} at retry limit)",
        view.queue.pending, view.queue.exhausted
    );
    if let Some(oldest) = view.queue.oldest_created_at {
        println!("Oldest:    {}", format_timestamp(oldest));
    }
    println!("Pinned:    {}", view.pinned);
    Ok(())
}
