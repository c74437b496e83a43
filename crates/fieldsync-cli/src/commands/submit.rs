use fieldsync_core::sync::DeliveryError;
use fieldsync_core::{
    EndpointResolver, HttpRemoteWriter, NetworkMonitor, NetworkStatus, RemoteWriter, SubmitError,
    SubmitOutcome,
};
use serde::Serialize;

use crate::commands::common::{
    normalize_operation_type, probe_reachability, resolve_json_input, AppContext,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct SubmitResult {
    status: &'static str,
    operation_type: String,
    entry_id: Option<String>,
}

pub async fn run_submit(
    ctx: &AppContext,
    operation_type: &str,
    payload: Option<String>,
    force_offline: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let operation_type = normalize_operation_type(operation_type)?;
    let payload = resolve_json_input("payload", payload)?;

    let status = if force_offline {
        NetworkStatus::Offline
    } else {
        let base_url = ctx
            .settings
            .api_base_url
            .as_deref()
            .ok_or(CliError::ApiNotConfigured)?;
        let client = reqwest::Client::new();
        if probe_reachability(&client, base_url).await {
            NetworkStatus::Online
        } else {
            NetworkStatus::Offline
        }
    };

    let service = ctx.service(NetworkMonitor::new(status))?;
    let remote = HttpRemoteWriter::from_settings(&ctx.settings)?;
    let resolver = EndpointResolver::from_settings(&ctx.settings);

    let outcome = service
        .interceptor()
        .submit(&operation_type, payload, |data| {
            let resolver = &resolver;
            let remote = &remote;
            let operation_type = &operation_type;
            async move {
                let url = resolver
                    .resolve(operation_type)
                    .map_err(|error| DeliveryError::Unroutable(error.to_string()))?;
                remote.post_json(&url, &data).await
            }
        })
        .await
        .map_err(|error| match error {
            SubmitError::Write(error) => CliError::WriteFailed(error.to_string()),
            SubmitError::Enqueue(error) => CliError::OfflineSaveFailed(error.to_string()),
        })?;

    let result = match outcome {
        SubmitOutcome::Completed(()) => SubmitResult {
            status: "sent",
            operation_type,
            entry_id: None,
        },
        SubmitOutcome::SavedOffline(id) => SubmitResult {
            status: "saved_offline",
            operation_type,
            entry_id: Some(id.to_string()),
        },
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let Some(id) = &result.entry_id {
        println!("Saved offline, pending sync: {id}");
    } else {
        println!("Sent {}", result.operation_type);
    }
    Ok(())
}
