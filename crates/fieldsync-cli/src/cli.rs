use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Queue field-service writes offline and sync them when the network returns")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local offline store
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name holding API and sync settings
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Queue a write for later delivery
    Enqueue {
        /// Operation type, e.g. job-create
        operation_type: String,
        /// JSON payload (read from stdin when omitted)
        payload: Option<String>,
        /// Local-only JSON context stored with the entry
        #[arg(long, value_name = "JSON")]
        meta: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send a write now, or queue it when the API is unreachable
    Submit {
        /// Operation type, e.g. job-create
        operation_type: String,
        /// JSON payload (read from stdin when omitted)
        payload: Option<String>,
        /// Skip the reachability probe and queue the write
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect and maintain the sync queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Deliver queued writes now
    Drain {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep a record available offline
    Pin {
        /// Entity identifier, e.g. a job id
        entity_id: String,
        /// JSON snapshot of the entity (read from stdin when omitted)
        snapshot: Option<String>,
    },
    /// Stop keeping a record available offline
    Unpin {
        /// Entity identifier
        entity_id: String,
    },
    /// List pinned records
    Pins {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one pinned record
    Pinned {
        /// Entity identifier
        entity_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue and connectivity status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Probe the API and drain automatically whenever it is reachable
    Watch {
        /// Milliseconds between reachability probes
        #[arg(long, default_value = "5000", value_name = "MS")]
        probe_interval_ms: u64,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued writes, oldest first
    List {
        /// Only show entries that reached the retry ceiling
        #[arg(long)]
        failed: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one queued write
    Remove {
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Reset attempts so a failed write is retried
    Retry {
        /// Entry ID or unique ID prefix
        id: String,
    },
    /// Delete every queued write
    Clear {
        /// Confirm deletion of undelivered writes
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Remote API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Bearer token sent with queued writes
        #[arg(long, value_name = "TOKEN")]
        auth_token: Option<String>,
        /// Endpoint override as TYPE=PATH (repeatable)
        #[arg(long = "endpoint", value_name = "TYPE=PATH")]
        endpoints: Vec<String>,
        /// Per-write timeout in milliseconds
        #[arg(long, value_name = "MS")]
        request_timeout_ms: Option<u64>,
        /// Auto-drain period in milliseconds
        #[arg(long, value_name = "MS")]
        drain_interval_ms: Option<u64>,
        /// Pending-count poll period in milliseconds
        #[arg(long, value_name = "MS")]
        poll_interval_ms: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved settings for a profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
