//! Adapter configuration.

use std::time::Duration;

use edison_core::constants::DEFAULT_WS_URL;

/// Where and how to connect to the telemetry server.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// WebSocket URL (default `ws://localhost:8081`).
    pub url: String,
    /// Upper bound on the WebSocket handshake.
    pub connect_timeout: Duration,
}

impl AdapterConfig {
    /// Config for `url` with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Replace the handshake timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
