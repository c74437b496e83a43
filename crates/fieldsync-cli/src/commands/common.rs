use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use fieldsync_core::util::normalize_text_option;
use fieldsync_core::{
    EntryId, LocalStore, NetworkMonitor, OfflineSyncService, PinnedEntity, SyncQueueEntry,
    SyncSettings, MAX_RETRIES,
};
use serde::Serialize;
use serde_json::Value;

use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Resolved settings and paths for one CLI invocation.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub profile: String,
    pub db_path: PathBuf,
    pub settings: SyncSettings,
}

impl AppContext {
    pub fn load(db_path: Option<PathBuf>, profile: Option<&str>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile = config.resolve_profile_name(profile);
        let settings = config
            .profile(&profile)
            .map(crate::config_profiles::CliProfile::to_settings)
            .unwrap_or_default();
        let settings = apply_env_overrides(settings, |key| env::var(key).ok()).normalized()?;

        Ok(Self {
            profile,
            db_path: resolve_db_path(db_path),
            settings,
        })
    }

    pub fn store(&self) -> LocalStore {
        LocalStore::at_path(&self.db_path)
    }

    pub fn service(&self, monitor: NetworkMonitor) -> Result<OfflineSyncService, CliError> {
        Ok(OfflineSyncService::open_path(
            &self.db_path,
            monitor,
            &self.settings,
        )?)
    }
}

pub fn apply_env_overrides(
    mut settings: SyncSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> SyncSettings {
    if let Some(url) = normalize_text_option(lookup("FIELDSYNC_API_BASE_URL")) {
        settings.api_base_url = Some(url);
    }
    if let Some(token) = normalize_text_option(lookup("FIELDSYNC_API_TOKEN")) {
        settings.auth_token = Some(token);
    }
    settings
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("FIELDSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldsync")
        .join("offline.db")
}

/// Parse a JSON argument, falling back to piped stdin.
pub fn resolve_json_input(label: &str, raw: Option<String>) -> Result<Value, CliError> {
    let raw = match normalize_text_option(raw) {
        Some(raw) => raw,
        None => read_piped_stdin()?.ok_or(CliError::MissingPayload)?,
    };
    parse_json(label, &raw)
}

pub fn parse_json(label: &str, raw: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|error| CliError::InvalidJson(format!("{label}: {error}")))
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn normalize_operation_type(value: &str) -> Result<String, CliError> {
    normalize_content(value).ok_or(CliError::EmptyOperationType)
}

pub fn normalize_entity_id(value: &str) -> Result<String, CliError> {
    normalize_content(value).ok_or(CliError::EmptyEntityId)
}

/// Resolve a full entry ID or a unique prefix of one.
pub async fn resolve_entry_id(query: &str, store: &LocalStore) -> Result<EntryId, CliError> {
    let query = normalize_content(query).ok_or(CliError::EmptyEntryId)?;
    if let Ok(id) = query.parse::<EntryId>() {
        return store
            .get_entry(&id)
            .await?
            .map(|entry| entry.id)
            .ok_or(CliError::EntryNotFound(query));
    }

    let matching_ids = store
        .queue_entries()
        .await?
        .into_iter()
        .map(|entry| entry.id)
        .filter(|id| id.as_str().starts_with(&query))
        .collect::<Vec<_>>();

    match matching_ids.as_slice() {
        [] => Err(CliError::EntryNotFound(query)),
        [id] => Ok(*id),
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(|id| short_id(*id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousEntryId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Whether the API answers at all. Any HTTP status counts as reachable.
pub async fn probe_reachability(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(_) => true,
        Err(error) => {
            tracing::debug!("Reachability probe of {url} failed: {error}");
            false
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueueEntryItem {
    pub id: String,
    #[serde(rename = "type")]
    pub operation_type: String,
    pub payload: Value,
    pub meta: Option<Value>,
    pub created_at: i64,
    pub created_at_iso: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub exhausted: bool,
}

pub fn entry_to_item(entry: &SyncQueueEntry) -> QueueEntryItem {
    QueueEntryItem {
        id: entry.id.to_string(),
        operation_type: entry.operation_type.clone(),
        payload: entry.payload.clone(),
        meta: entry.meta.clone(),
        created_at: entry.created_at,
        created_at_iso: format_timestamp(entry.created_at),
        attempts: entry.attempts,
        last_error: entry.last_error.clone(),
        exhausted: entry.is_exhausted(),
    }
}

pub fn format_entry_lines(entries: &[SyncQueueEntry]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    entries
        .iter()
        .map(|entry| {
            let short_id = short_id(entry.id);
            let kind = &entry.operation_type;
            let age = format_relative_time(entry.created_at, now_ms);
            let attempts = format!("{}/{MAX_RETRIES}", entry.attempts);
            match &entry.last_error {
                Some(error) => {
                    format!("{short_id:<13}  {kind:<20}  {age:<10}  {attempts:<5}  {error}")
                }
                None => format!("{short_id:<13}  {kind:<20}  {age:<10}  {attempts}"),
            }
        })
        .collect()
}

pub fn format_pin_lines(pins: &[PinnedEntity]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    pins.iter()
        .map(|pin| {
            let updated = format_relative_time(pin.updated_at, now_ms);
            let snapshot = if pin.snapshot_data.is_some() {
                "snapshot"
            } else {
                "no snapshot"
            };
            format!("{:<24}  {updated:<10}  {snapshot}", pin.entity_id)
        })
        .collect()
}

pub fn short_id(id: EntryId) -> String {
    id.to_string().chars().take(13).collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
