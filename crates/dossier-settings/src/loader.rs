//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DossierSettings::default()`]
//! 2. If `~/.dossier/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `DOSSIER_*` environment overrides
//! 4. [`DossierSettings::validate`]

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::DossierSettings;

/// Env var overriding `stream.apiBaseUrl`.
pub const ENV_API_BASE_URL: &str = "DOSSIER_API_BASE_URL";
/// Env var overriding `stream.maxReconnectAttempts`.
pub const ENV_MAX_RECONNECT_ATTEMPTS: &str = "DOSSIER_MAX_RECONNECT_ATTEMPTS";
/// Env var overriding `stream.reconnectDelayMs`.
pub const ENV_RECONNECT_DELAY_MS: &str = "DOSSIER_RECONNECT_DELAY_MS";
/// Env var overriding `logging.level`.
pub const ENV_LOG_LEVEL: &str = "DOSSIER_LOG_LEVEL";

/// Resolve the path to the settings file (`~/.dossier/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".dossier").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DossierSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DossierSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<DossierSettings> {
    let defaults = serde_json::to_value(DossierSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DossierSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
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

/// Apply `DOSSIER_*` overrides read through `env`.
///
/// Empty values are ignored. Numbers outside their range are ignored with a
/// warning, leaving the file/default value in place.
pub fn apply_overrides(settings: &mut DossierSettings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    if let Some(v) = read(ENV_API_BASE_URL) {
        settings.stream.api_base_url = v;
    }
    if let Some(v) = read(ENV_MAX_RECONNECT_ATTEMPTS) {
        match parse_u32_range(&v, 0, 100) {
            Some(n) => settings.stream.max_reconnect_attempts = n,
            None => warn!(key = ENV_MAX_RECONNECT_ATTEMPTS, value = %v, "invalid u32 env var, ignoring"),
        }
    }
    if let Some(v) = read(ENV_RECONNECT_DELAY_MS) {
        match parse_u64_range(&v, 1, 600_000) {
            Some(n) => settings.stream.reconnect_delay_ms = n,
            None => warn!(key = ENV_RECONNECT_DELAY_MS, value = %v, "invalid u64 env var, ignoring"),
        }
    }
    if let Some(v) = read(ENV_LOG_LEVEL) {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u32` within an inclusive range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}
