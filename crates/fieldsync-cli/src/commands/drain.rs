use fieldsync_core::{NetworkMonitor, NetworkStatus};

use crate::commands::common::AppContext;
use crate::error::CliError;

pub async fn run_drain(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    if ctx.settings.api_base_url.is_none() {
        tracing::warn!("No API base URL configured; only absolute endpoint overrides can be delivered");
    }

    let service = ctx.service(NetworkMonitor::new(NetworkStatus::Online))?;
    let report = service.process_queue().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Synced {}, failed {} ({} at retry limit), {} remaining",
            report.synced, report.failed, report.exhausted, report.remaining
        );
    }
    Ok(())
}
