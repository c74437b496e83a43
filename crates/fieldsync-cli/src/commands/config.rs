use std::collections::BTreeMap;

use fieldsync_core::util::normalize_text_option;
use fieldsync_core::EndpointResolver;
use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::AppContext;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub struct ConfigInit {
    pub profile: Option<String>,
    pub api_base_url: Option<String>,
    pub auth_token: Option<String>,
    pub endpoints: Vec<String>,
    pub request_timeout_ms: Option<u64>,
    pub drain_interval_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub no_activate: bool,
}

pub fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    ctx: impl FnOnce() -> Result<AppContext, CliError>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            auth_token,
            endpoints,
            request_timeout_ms,
            drain_interval_ms,
            poll_interval_ms,
            no_activate,
        } => {
            let init = ConfigInit {
                profile: profile.or_else(|| global_profile.map(str::to_string)),
                api_base_url,
                auth_token,
                endpoints,
                request_timeout_ms,
                drain_interval_ms,
                poll_interval_ms,
                no_activate,
            };
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = apply_config_init(&mut config, init)?;
            let path = config.save().map_err(CliError::Config)?;
            println!("Saved profile '{profile_name}' to {}", path.display());
            Ok(())
        }
        ConfigCommands::Show { json } => run_config_show(&ctx()?, json),
    }
}

/// Merge `init` into `config`; returns the profile name that was written.
pub fn apply_config_init(
    config: &mut CliProfilesConfig,
    init: ConfigInit,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(init.profile.as_deref());
    let overrides = parse_endpoint_overrides(&init.endpoints)?;

    let mut profile = config.profile(&profile_name).cloned().unwrap_or_default();
    if let Some(url) = normalize_text_option(init.api_base_url) {
        profile.api_base_url = Some(url);
    }
    if let Some(token) = normalize_text_option(init.auth_token) {
        profile.auth_token = Some(token);
    }
    profile.endpoints.extend(overrides);
    if init.request_timeout_ms.is_some() {
        profile.request_timeout_ms = init.request_timeout_ms;
    }
    if init.drain_interval_ms.is_some() {
        profile.drain_interval_ms = init.drain_interval_ms;
    }
    if init.poll_interval_ms.is_some() {
        profile.poll_interval_ms = init.poll_interval_ms;
    }
    validate_profile(&profile)?;

    *config.profile_mut_or_default(&profile_name) = profile;
    if !init.no_activate || config.active_profile.is_none() {
        config.active_profile = Some(profile_name.clone());
    }
    Ok(profile_name)
}

/// Parse repeated `TYPE=PATH` arguments.
pub fn parse_endpoint_overrides(raw: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    raw.iter()
        .map(|item| {
            let (kind, path) = item.split_once('=').ok_or_else(|| {
                CliError::Config(format!("endpoint '{item}' must look like TYPE=PATH"))
            })?;
            let kind = kind.trim();
            let path = path.trim();
            if kind.is_empty() || path.is_empty() {
                return Err(CliError::Config(format!(
                    "endpoint '{item}' must look like TYPE=PATH"
                )));
            }
            Ok((kind.to_string(), path.to_string()))
        })
        .collect()
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    profile
        .to_settings()
        .normalized()
        .map(drop)
        .map_err(|error| CliError::Config(error.to_string()))
}

#[derive(Debug, Serialize)]
struct SettingsView {
    profile: String,
    db_path: String,
    api_base_url: Option<String>,
    auth_token: Option<&'static str>,
    request_timeout_ms: u64,
    drain_interval_ms: u64,
    poll_interval_ms: u64,
    endpoints: BTreeMap<String, String>,
}

fn run_config_show(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let settings = &ctx.settings;
    let view = SettingsView {
        profile: ctx.profile.clone(),
        db_path: ctx.db_path.display().to_string(),
        api_base_url: settings.api_base_url.clone(),
        auth_token: settings.auth_token.as_ref().map(|_| "[REDACTED]"),
        request_timeout_ms: settings.request_timeout_ms,
        drain_interval_ms: settings.drain_interval_ms,
        poll_interval_ms: settings.poll_interval_ms,
        endpoints: EndpointResolver::from_settings(settings)
            .routes()
            .map(|(kind, path)| (kind.to_string(), path.to_string()))
            .collect(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Profile:          {}", view.profile);
    println!("Store:            {}", view.db_path);
    println!(
        "API base URL:     {}",
        view.api_base_url.as_deref().unwrap_or("not configured")
    );
    println!(
        "Auth token:       {}",
        view.auth_token.unwrap_or("not configured")
    );
    println!("Request timeout:  {} ms", view.request_timeout_ms);
    println!("Drain interval:   {} ms", view.drain_interval_ms);
    println!("Poll interval:    {} ms", view.poll_interval_ms);
    println!("Endpoints:");
    for (kind, path) in &view.endpoints {
        println!("  {kind:<20} {path}");
    }
    Ok(())
}
