//! Settings types.

use dossier_core::ReconnectPolicy;
use dossier_core::backoff::{DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY_MS};
use dossier_core::logging::DEFAULT_LOG_LEVEL;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Base API address used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

const ALLOWED_SCHEMES: [&str; 4] = ["http://", "https://", "ws://", "wss://"];

/// Root settings document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DossierSettings {
    /// Settings schema version.
    pub version: String,
    /// Event stream connection settings.
    pub stream: StreamSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

impl Default for DossierSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            stream: StreamSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl DossierSettings {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.stream.validate()
    }
}

/// Event stream connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// HTTP(S) base address of the backend API; upgraded to WS(S) when dialing.
    pub api_base_url: String,
    /// Reconnect ceiling per disconnect episode.
    pub max_reconnect_attempts: u32,
    /// Base reconnect delay in milliseconds (attempt `n` waits `n ×` this).
    pub reconnect_delay_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl StreamSettings {
    /// Reconnect policy described by these settings.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.max_reconnect_attempts, self.reconnect_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !ALLOWED_SCHEMES.iter().any(|s| url.starts_with(s)) {
            return Err(SettingsError::InvalidValue(format!(
                "stream.apiBaseUrl must start with http://, https://, ws:// or wss:// (got {url:?})"
            )));
        }
        if self.reconnect_delay_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "stream.reconnectDelayMs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_value(DossierSettings::default()).unwrap();
        assert_eq!(json["stream"]["apiBaseUrl"], DEFAULT_API_BASE_URL);
        assert_eq!(json["stream"]["maxReconnectAttempts"], 5);
        assert_eq!(json["stream"]["reconnectDelayMs"], 3000);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: DossierSettings =
            serde_json::from_str(r#"{"stream": {"reconnectDelayMs": 500}}"#).unwrap();
        assert_eq!(settings.stream.reconnect_delay_ms, 500);
        assert_eq!(settings.stream.max_reconnect_attempts, 5);
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn reconnect_policy_from_settings() {
        let stream = StreamSettings {
            max_reconnect_attempts: 2,
            reconnect_delay_ms: 100,
            ..StreamSettings::default()
        };
        assert_eq!(stream.reconnect_policy(), ReconnectPolicy::new(2, 100));
    }

    #[test]
    fn validate_accepts_all_schemes() {
        for url in ["http://a", "https://a", "ws://a", "wss://a"] {
            let mut settings = DossierSettings::default();
            settings.stream.api_base_url = url.to_string();
            assert!(settings.validate().is_ok(), "rejected {url}");
        }
    }

    #[test]
    fn validate_rejects_missing_scheme() {
        let mut settings = DossierSettings::default();
        settings.stream.api_base_url = "localhost:8000".to_string();
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_zero_delay() {
        let mut settings = DossierSettings::default();
        settings.stream.reconnect_delay_ms = 0;
        assert_matches!(settings.validate(), Err(SettingsError::InvalidValue(_)));
    }
}
