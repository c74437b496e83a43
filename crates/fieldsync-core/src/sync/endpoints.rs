//! Routing of operation types to remote write endpoints.

use std::collections::BTreeMap;

use crate::config::SyncSettings;
use crate::util::{is_http_url, join_url};
use crate::{Error, Result};

/// Built-in `type -> path` routes.
pub const DEFAULT_ENDPOINTS: &[(&str, &str)] = &[
    ("job-create", "/rest/jobs"),
    ("job-update", "/rest/jobs/update"),
    ("job-note", "/rest/job-notes"),
    ("forklift-create", "/rest/forklifts"),
    ("forklift-rental", "/rest/forklift-rentals"),
    ("inventory-adjust", "/rest/inventory/adjustments"),
    ("invoice-create", "/rest/invoices"),
    ("leave-request", "/rest/leave-requests"),
    ("timesheet-entry", "/rest/timesheets"),
];

/// Resolves an operation type to the URL its payload is POSTed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    base_url: Option<String>,
    routes: BTreeMap<String, String>,
}

impl EndpointResolver {
    pub fn new(base_url: Option<String>, overrides: &BTreeMap<String, String>) -> Self {
        let mut routes: BTreeMap<String, String> = DEFAULT_ENDPOINTS
            .iter()
            .map(|(kind, path)| ((*kind).to_string(), (*path).to_string()))
            .collect();
        routes.extend(
            overrides
                .iter()
                .map(|(kind, path)| (kind.clone(), path.clone())),
        );
        Self { base_url, routes }
    }

    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self::new(settings.api_base_url.clone(), &settings.endpoints)
    }

    /// Path (or absolute URL) configured for `kind`, falling back to `/rest/<kind>`.
    ///
    /// The fallback encodes `kind` as a single path segment.
    pub fn path_for(&self, kind: &str) -> String {
        self.routes
            .get(kind)
            .cloned()
            .unwrap_or_else(|| format!("/rest/{}", urlencoding::encode(kind)))
    }

    /// Absolute URL for `kind`.
    pub fn resolve(&self, kind: &str) -> Result<String> {
        let path = self.path_for(kind);
        if is_http_url(&path) {
            return Ok(path);
        }

        let base = self.base_url.as_deref().ok_or_else(|| {
            Error::InvalidInput(format!("no API base URL configured for {path}"))
        })?;
        Ok(join_url(base, &path))
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.routes
            .iter()
            .map(|(kind, path)| (kind.as_str(), path.as_str()))
    }
}
