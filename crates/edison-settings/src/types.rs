//! Settings schema.

use serde::{Deserialize, Serialize};

use edison_core::constants::DEFAULT_WS_URL;

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdisonSettings {
    /// Telemetry server connection.
    pub feed: FeedSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Telemetry server connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedSettings {
    /// WebSocket URL of the telemetry server.
    pub ws_url: String,
    /// WebSocket handshake timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            ws_url: DEFAULT_WS_URL.to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive (overridden by `RUST_LOG`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}
