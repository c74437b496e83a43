use crate::cli::QueueCommands;
use crate::commands::common::{entry_to_item, format_entry_lines, resolve_entry_id, AppContext};
use crate::error::CliError;

pub async fn run_queue(ctx: &AppContext, command: QueueCommands) -> Result<(), CliError> {
    match command {
        QueueCommands::List { failed, json } => run_queue_list(ctx, failed, json).await,
        QueueCommands::Remove { id } => run_queue_remove(ctx, &id).await,
        QueueCommands::Retry { id } => run_queue_retry(ctx, &id).await,
        QueueCommands::Clear { yes } => run_queue_clear(ctx, yes).await,
    }
}

pub async fn run_queue_list(ctx: &AppContext, failed_only: bool, as_json: bool) -> Result<(), CliError> {
    let store = ctx.store();
    let entries = if failed_only {
        store.failed_entries().await?
    } else {
        store.queue_entries().await?
    };

    if as_json {
        let items = entries.iter().map(entry_to_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Queue is empty.");
        return Ok(());
    }
    for line in format_entry_lines(&entries) {
        println!("{line}");
    }
    Ok(())
}

/// Remove by ID or unique prefix; a full stored key also reaches unreadable rows.
pub async fn run_queue_remove(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let store = ctx.store();
    match resolve_entry_id(id, &store).await {
        Ok(id) => {
            store.remove_entry(&id).await?;
            println!("{id}");
            Ok(())
        }
        Err(CliError::EntryNotFound(key)) => {
            if store.purge_entry(&key).await? {
                println!("{key}");
                Ok(())
            } else {
                Err(CliError::EntryNotFound(key))
            }
        }
        Err(error) => Err(error),
    }
}

pub async fn run_queue_retry(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let store = ctx.store();
    let id = resolve_entry_id(id, &store).await?;
    store.reset_entry(&id).await?;
    println!("{id}");
    Ok(())
}

pub async fn run_queue_clear(ctx: &AppContext, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ClearNotConfirmed);
    }
    let removed = ctx.store().clear_queue().await?;
    println!("Removed {removed} queued writes");
    Ok(())
}
