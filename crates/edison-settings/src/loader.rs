//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`EdisonSettings::default()`]
//! 2. If `~/.edison/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `EDISON_*` environment variable overrides
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::EdisonSettings;

/// Resolve the path to the settings file (`~/.edison/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".edison").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<EdisonSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<EdisonSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<EdisonSettings> {
    let defaults = serde_json::to_value(EdisonSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `EDISON_*` environment variable overrides.
///
/// Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut EdisonSettings) {
    if let Some(v) = read_env_string("EDISON_WS_URL") {
        settings.feed.ws_url = v;
    }
    if let Some(v) = read_env_u64("EDISON_CONNECT_TIMEOUT_MS", 1000, 600_000) {
        settings.feed.connect_timeout_ms = v;
    }
    if let Some(v) = read_env_string("EDISON_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Reject settings the adapter cannot work with.
pub fn validate(settings: &EdisonSettings) -> Result<()> {
    let url = settings.feed.ws_url.as_str();
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(SettingsError::InvalidValue(format!(
            "feed.wsUrl must be a ws:// or wss:// URL, got {url:?}"
        )));
    }
    if settings.feed.connect_timeout_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "feed.connectTimeoutMs must be positive".into(),
        ));
    }
    Ok(())
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}
