//! Well-known identifiers shared between the adapter and host glue.

/// Fallback WebSocket URL of the telemetry server.
pub const DEFAULT_WS_URL: &str = "ws://localhost:8081";

/// Namespace prefix for every object identifier this plugin owns.
pub const NAMESPACE: &str = "Edison";

/// Telemetry source key that routes host requests to this plugin.
pub const TELEMETRY_SOURCE: &str = "Edison.source";

/// Identifier of the root board object.
pub const ROOT_ID: &str = "Edison:board";

/// Object type keys.
pub const BOARD_TYPE: &str = "Edison.board";
/// Subsystem object type key.
pub const SUBSYSTEM_TYPE: &str = "Edison.subsystem";
/// Measurement object type key.
pub const MEASUREMENT_TYPE: &str = "Edison.measurement";

/// Build the namespaced object identifier for a dictionary entry.
pub fn object_id(identifier: &str) -> String {
    format!("{NAMESPACE}:{identifier}")
}

/// Strip the namespace prefix from an object identifier.
pub fn strip_namespace(object_id: &str) -> Option<&str> {
    object_id
        .strip_prefix(NAMESPACE)
        .and_then(|rest| rest.strip_prefix(':'))
}
