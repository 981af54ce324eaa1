use std::collections::BTreeMap;
use std::env;

use super::types::{ConfigError, Environment};

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

/// Parses `id=url,id=url` (or a JSON object) into an algorithm endpoint map.
pub(super) fn parse_algorithm_endpoints(
    value: Option<String>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(BTreeMap::new());
    };

    if raw.trim_start().starts_with('{') {
        let parsed: BTreeMap<String, String> = serde_json::from_str(&raw)
            .map_err(|_| ConfigError::InvalidAlgorithmEndpoint(raw.clone()))?;
        return Ok(parsed
            .into_iter()
            .map(|(id, url)| (id.trim().to_string(), url.trim().trim_end_matches('/').to_string()))
            .collect());
    }

    let mut endpoints = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((id, url)) = entry.split_once('=') else {
            return Err(ConfigError::InvalidAlgorithmEndpoint(entry.to_string()));
        };
        let id = id.trim();
        let url = url.trim().trim_end_matches('/');
        if id.is_empty() || url.is_empty() {
            return Err(ConfigError::InvalidAlgorithmEndpoint(entry.to_string()));
        }
        endpoints.insert(id.to_string(), url.to_string());
    }

    Ok(endpoints)
}
