use fieldsync_core::NewSyncEntry;

use crate::commands::common::{
    entry_to_item, normalize_operation_type, parse_json, resolve_json_input, AppContext,
};
use crate::error::CliError;

pub async fn run_enqueue(
    ctx: &AppContext,
    operation_type: &str,
    payload: Option<String>,
    meta: Option<String>,
    as_json: bool,
) -> Result<(), CliError> {
    let operation_type = normalize_operation_type(operation_type)?;
    let payload = resolve_json_input("payload", payload)?;
    let mut entry = NewSyncEntry::new(operation_type, payload);
    if let Some(meta) = meta {
        entry = entry.with_meta(parse_json("meta", &meta)?);
    }

    let entry = ctx.store().enqueue(entry).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&entry_to_item(&entry))?);
    } else {
        println!("{}", entry.id);
    }
    Ok(())
}
