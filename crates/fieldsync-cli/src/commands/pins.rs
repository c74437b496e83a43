use fieldsync_core::PinManager;

use crate::commands::common::{
    format_pin_lines, normalize_entity_id, resolve_json_input, AppContext,
};
use crate::error::CliError;

fn pin_manager(ctx: &AppContext) -> PinManager {
    PinManager::new(ctx.store())
}

pub async fn run_pin(
    ctx: &AppContext,
    entity_id: &str,
    snapshot: Option<String>,
) -> Result<(), CliError> {
    let entity_id = normalize_entity_id(entity_id)?;
    let snapshot = match resolve_json_input("snapshot", snapshot) {
        Ok(value) => Some(value),
        Err(CliError::MissingPayload) => None,
        Err(error) => return Err(error),
    };

    pin_manager(ctx).pin(&entity_id, snapshot).await?;
    println!("{entity_id}");
    Ok(())
}

pub async fn run_unpin(ctx: &AppContext, entity_id: &str) -> Result<(), CliError> {
    let entity_id = normalize_entity_id(entity_id)?;
    pin_manager(ctx).unpin(&entity_id).await?;
    println!("{entity_id}");
    Ok(())
}

pub async fn run_pins(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let pins = pin_manager(ctx).all_pinned().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&pins)?);
        return Ok(());
    }

    if pins.is_empty() {
        println!("Nothing pinned.");
        return Ok(());
    }
    for line in format_pin_lines(&pins) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_pinned(ctx: &AppContext, entity_id: &str, as_json: bool) -> Result<(), CliError> {
    let entity_id = normalize_entity_id(entity_id)?;
    let pin = pin_manager(ctx)
        .get(&entity_id)
        .await?
        .ok_or_else(|| CliError::NotPinned(entity_id.clone()))?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&pin)?);
    } else {
        match &pin.snapshot_data {
            Some(snapshot) => println!("{}", serde_json::to_string_pretty(snapshot)?),
            None => println!("{entity_id} is pinned without a snapshot"),
        }
    }
    Ok(())
}
