use std::future::Future;
use std::time::Duration;

use fieldsync_core::{NetworkMonitor, NetworkStatus};
use tokio::time::MissedTickBehavior;

use crate::commands::common::{format_timestamp, probe_reachability, AppContext};
use crate::error::CliError;

/// Feed reachability probes into the monitor until Ctrl-C.
///
/// Auto-drain runs on the configured interval while reachable and once on
/// every offline-to-online transition.
pub async fn run_watch(ctx: &AppContext, probe_interval_ms: u64) -> Result<(), CliError> {
    watch_until(ctx, probe_interval_ms, async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::warn!("Could not listen for Ctrl-C: {error}");
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Run the watch loop until `shutdown` completes.
pub async fn watch_until(
    ctx: &AppContext,
    probe_interval_ms: u64,
    shutdown: impl Future<Output = ()>,
) -> Result<(), CliError> {
    let base_url = ctx
        .settings
        .api_base_url
        .clone()
        .ok_or(CliError::ApiNotConfigured)?;
    if probe_interval_ms == 0 {
        return Err(CliError::Config(
            "probe interval must be positive".to_string(),
        ));
    }

    let client = reqwest::Client::new();
    let initial = if probe_reachability(&client, &base_url).await {
        NetworkStatus::Online
    } else {
        NetworkStatus::Offline
    };
    let monitor = NetworkMonitor::new(initial);
    let service = ctx.service(monitor.clone())?;
    service.start().await?;

    let mut snapshots = service.tracker().subscribe();
    let mut probe = tokio::time::interval(Duration::from_millis(probe_interval_ms));
    probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
    println!("Watching {base_url} (Ctrl-C to stop)");

    // Created once so a signal that lands during a probe is not lost.
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = probe.tick() => {
                monitor.set_online(probe_reachability(&client, &base_url).await);
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let last_sync = snapshot
                    .last_sync_at
                    .map_or_else(|| "never".to_string(), format_timestamp);
                println!(
                    "{} | pending {} | last sync {last_sync}",
                    if snapshot.is_online { "online " } else { "offline" },
                    snapshot.pending_sync
                );
            }
        }
    }

    service.shutdown().await;
    Ok(())
}
