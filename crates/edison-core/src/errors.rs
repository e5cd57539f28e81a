//! Error types for the telemetry feed.

use thiserror::Error;

/// Why a pending dictionary or history request could not be answered.
///
/// Cloneable so a single failure can be delivered to every holder of a
/// shared pending future.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The WebSocket handshake failed.
    #[error("failed to connect to {url}: {reason}")]
    Connect {
        /// Server URL.
        url: String,
        /// Underlying transport error.
        reason: String,
    },

    /// The WebSocket handshake did not finish in time.
    #[error("timed out after {timeout_ms}ms connecting to {url}")]
    Timeout {
        /// Server URL.
        url: String,
        /// How long we waited.
        timeout_ms: u64,
    },

    /// The connection was closed (by the server, or the adapter was dropped).
    #[error("telemetry feed disconnected")]
    Disconnected,

    /// The transport reported an error mid-stream.
    #[error("transport error: {0}")]
    Transport(String),
}

/// An inbound frame that could not be decoded.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The payload is not JSON.
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload has no string `type` discriminator.
    #[error("frame has no `type` field")]
    MissingType,

    /// A history frame without a string `id`.
    #[error("{kind} frame has no string `id`")]
    MissingId {
        /// The frame's `type`.
        kind: String,
    },

    /// A known frame type whose body does not have the expected shape.
    #[error("malformed {kind} frame: {source}")]
    Malformed {
        /// The frame's `type`.
        kind: String,
        /// Decoding failure.
        source: serde_json::Error,
    },
}
