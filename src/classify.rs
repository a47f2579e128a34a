//! Turns catalogue rows into inventory hosts.
//!
//! Hosts are sorted into an environment group (`DEV`, `TEST1`, `TEST2`) and a
//! role group (`WEB`/`APP` plus their patching groups) from markers in the host
//! name and the application-region tag. Anything that cannot be sorted lands
//! in `UNKNOWN`.

use std::fmt;

use serde_json::{json, Value};

use crate::config::ClassifierSettings;
use crate::models::{HostRecord, ObjectRow};

/// Group for hosts that could not be sorted into an environment.
pub const UNKNOWN_GROUP: &str = "UNKNOWN";
pub const UNKNOWN_ENVIRONMENT: &str = "UNKNOWN_ENVIRONMENT";

/// Environment marker, group name, and `env_name` value. First match wins.
const ENVIRONMENTS: [(&str, &str, &str); 3] = [
    ("DEV", "DEV", "DEV_ENVIRONMENT"),
    ("TEST1", "TEST1", "TEST1_ENVIRONMENT"),
    ("TEST2", "TEST2", "TEST2_ENVIRONMENT"),
];

/// Name markers and the groups they put a host into. First match wins.
const ROLES: [(&[&str], &[&str]); 2] = [
    (&["HTTP", "WEB"], &["WEB", "WEB_PATCHING"]),
    (&["APP", "TOMCAT"], &["APP", "TOMCAT_PATCHING"]),
];

/// Why a row's tags could not be read.
#[derive(Debug)]
pub enum TagError {
    /// Tags were stored as a string that is not valid JSON.
    Undecodable(serde_json::Error),
    /// Tags decoded to something other than a JSON object.
    UnexpectedType(&'static str),
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagError::Undecodable(e) => write!(f, "error decoding JSON from tags: {}", e),
            TagError::UnexpectedType(kind) => write!(f, "unexpected type for tags data: {}", kind),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Finds the application-region tag: the first tag under `$values` whose
/// `tag` value starts with `prefix`.
///
/// `tags` may be a JSON object or a string holding encoded JSON. Missing or
/// null tags yield `Ok(None)`.
pub fn extract_app_region(tags: Option<&Value>, prefix: &str) -> Result<Option<String>, TagError> {
    let decoded;
    let object = match tags {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(map)) => map,
        Some(Value::String(raw)) => {
            decoded = serde_json::from_str::<Value>(raw).map_err(TagError::Undecodable)?;
            match &decoded {
                Value::Object(map) => map,
                Value::Null => return Ok(None),
                other => return Err(TagError::UnexpectedType(json_kind(other))),
            }
        }
        Some(other) => return Err(TagError::UnexpectedType(json_kind(other))),
    };

    let region = object
        .get("$values")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|tag| tag.get("tag").and_then(Value::as_str))
        .find(|tag| tag.starts_with(prefix))
        .map(str::to_string);

    Ok(region)
}

/// Environment group and `env_name` for a host name, if any marker matches.
fn environment_for(hostname: &str) -> Option<(&'static str, &'static str)> {
    ENVIRONMENTS
        .iter()
        .find(|(marker, _, _)| hostname.contains(marker))
        .map(|(_, group, env_name)| (*group, *env_name))
}

/// Role groups for a host name, if any marker matches.
fn roles_for(hostname: &str) -> &'static [&'static str] {
    ROLES
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| hostname.contains(m)))
        .map(|(_, groups)| *groups)
        .unwrap_or(&[])
}

/// Whether a host belongs to one of the sortable environments at all.
fn is_classified(hostname: &str, app_region: Option<&str>) -> bool {
    let region = app_region.unwrap_or("");
    hostname.contains("TEST") || ENVIRONMENTS.iter().any(|(marker, _, _)| region.contains(marker))
}

/// Classifies a single row. Returns `None` when the row has a blank name or
/// unreadable tags.
pub fn classify_row(row: &ObjectRow, settings: &ClassifierSettings) -> Option<HostRecord> {
    if row.object_name.trim().is_empty() {
        tracing::warn!("Skipping object {}: blank object name", row.object_id);
        return None;
    }

    let app_region = match extract_app_region(row.tags.as_ref(), &settings.tag_prefix) {
        Ok(region) => region,
        Err(e) => {
            tracing::warn!(
                "Skipping {} (object {}): {}",
                row.object_name,
                row.object_id,
                e
            );
            return None;
        }
    };

    let hostname = row.object_name.as_str();
    let mut host = HostRecord::new(hostname);

    let (job_name, env_name) = if is_classified(hostname, app_region.as_deref()) {
        match environment_for(hostname) {
            Some((group, env_name)) => {
                host.groups.insert(group.to_string());
                host.groups
                    .extend(roles_for(hostname).iter().map(|g| g.to_string()));
                (settings.job_name.as_str(), env_name)
            }
            None => {
                tracing::debug!("{} has no environment marker; leaving ungrouped", hostname);
                (settings.job_name.as_str(), UNKNOWN_ENVIRONMENT)
            }
        }
    } else {
        host.groups.insert(UNKNOWN_GROUP.to_string());
        (settings.fallback_job_name.as_str(), UNKNOWN_ENVIRONMENT)
    };

    host = host
        .with_var("job_name", job_name)
        .with_var("env_name", env_name)
        .with_var("server_description", settings.server_description.as_str())
        .with_var("connected_hosts", json!([]))
        .with_var("datasource", json!(row.datasource_name))
        .with_var("object_id", row.object_id.as_str())
        .with_var("app_region", json!(app_region));

    Some(host)
}

/// Classifies every row, dropping the ones with blank names or unreadable tags.
pub fn classify_rows(rows: &[ObjectRow], settings: &ClassifierSettings) -> Vec<HostRecord> {
    let hosts: Vec<HostRecord> = rows
        .iter()
        .filter_map(|row| classify_row(row, settings))
        .collect();

    if hosts.len() < rows.len() {
        tracing::warn!(
            "Skipped {} unusable rows out of {}",
            rows.len() - hosts.len(),
            rows.len()
        );
    }

    hosts
}
