//! Fieldsync CLI - queue field-service writes while offline and sync them later.

use clap::Parser;

mod cli;
mod commands;
mod config_profiles;
mod error;

use cli::{Cli, Commands};
use commands::common::AppContext;
use commands::config::run_config;
use commands::drain::run_drain;
use commands::enqueue::run_enqueue;
use commands::pins::{run_pin, run_pinned, run_pins, run_unpin};
use commands::queue::run_queue;
use commands::status::run_status;
use commands::submit::run_submit;
use commands::watch::run_watch;
use error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "fieldsync=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();
    let db_path = cli.db_path;

    let ctx = || AppContext::load(db_path.clone(), profile);

    match cli.command {
        Commands::Enqueue {
            operation_type,
            payload,
            meta,
            json,
        } => run_enqueue(&ctx()?, &operation_type, payload, meta, json).await?,
        Commands::Submit {
            operation_type,
            payload,
            offline,
            json,
        } => run_submit(&ctx()?, &operation_type, payload, offline, json).await?,
        Commands::Queue { command } => run_queue(&ctx()?, command).await?,
        Commands::Drain { json } => run_drain(&ctx()?, json).await?,
        Commands::Pin {
            entity_id,
            snapshot,
        } => run_pin(&ctx()?, &entity_id, snapshot).await?,
        Commands::Unpin { entity_id } => run_unpin(&ctx()?, &entity_id).await?,
        Commands::Pins { json } => run_pins(&ctx()?, json).await?,
        Commands::Pinned { entity_id, json } => run_pinned(&ctx()?, &entity_id, json).await?,
        Commands::Status { json } => run_status(&ctx()?, json).await?,
        Commands::Watch { probe_interval_ms } => run_watch(&ctx()?, probe_interval_ms).await?,
        Commands::Config { command } => run_config(command, profile, ctx)?,
    }

    Ok(())
}
