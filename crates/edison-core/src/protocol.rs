//! Wire protocol between the adapter and the telemetry server.
//!
//! Client → server messages are bare text commands (`"history pwr.v"`).
//! Server → client messages are JSON objects discriminated by `type`:
//!
//! ```text
//! {"type": "dictionary", "value": {...}}
//! {"type": "history", "id": "pwr.v", "value": [{"timestamp": 1, "value": 3.3}]}
//! {"type": "data", "id": "pwr.v", "value": {"timestamp": 2, "value": 3.4}}
//! ```
//!
//! History and data frames keep every field the server sent. Any other
//! `type` decodes to [`Frame::Unknown`] so newer servers do not break older
//! clients.

use std::fmt;

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::dictionary::Dictionary;
use crate::errors::FrameError;

// ─────────────────────────────────────────────────────────────────────────────
// Commands (client → server)
// ─────────────────────────────────────────────────────────────────────────────

/// A text command sent to the telemetry server.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    /// Request the measurement dictionary.
    Dictionary,
    /// Request the stored history of one measurement.
    History(String),
    /// Start live updates for one measurement.
    Subscribe(String),
    /// Stop live updates for one measurement.
    Unsubscribe(String),
}

impl Command {
    /// The command verb as it appears on the wire.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Dictionary => "dictionary",
            Self::History(_) => "history",
            Self::Subscribe(_) => "subscribe",
            Self::Unsubscribe(_) => "unsubscribe",
        }
    }

    /// The measurement id this command targets, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Dictionary => None,
            Self::History(id) | Self::Subscribe(id) | Self::Unsubscribe(id) => Some(id),
        }
    }

    /// Parse wire text back into a command.
    ///
    /// The first space separates the verb from the id. Returns `None` for
    /// unknown verbs and for id-carrying verbs without an id.
    pub fn parse(text: &str) -> Option<Self> {
        let (verb, rest) = match text.split_once(' ') {
            Some((verb, rest)) => (verb, Some(rest)),
            None => (text, None),
        };
        let id = rest.filter(|id| !id.is_empty()).map(str::to_owned);
        match verb {
            "dictionary" => Some(Self::Dictionary),
            "history" => id.map(Self::History),
            "subscribe" => id.map(Self::Subscribe),
            "unsubscribe" => id.map(Self::Unsubscribe),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{} {id}", self.verb()),
            None => f.write_str(self.verb()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames (server → client)
// ─────────────────────────────────────────────────────────────────────────────

/// One timestamped telemetry sample.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// Sampled value; numeric for most measurements.
    pub value: Value,
}

impl TelemetryPoint {
    /// Create a point.
    pub fn new(timestamp: i64, value: impl Into<Value>) -> Self {
        Self {
            timestamp,
            value: value.into(),
        }
    }
}

/// Response to a `history <id>` command.
///
/// The whole frame is kept as the server sent it; only `id` is required.
/// [`HistoryFrame::points`] reads the conventional `value` array.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryFrame {
    id: String,
    fields: Map<String, Value>,
}

impl HistoryFrame {
    /// Build a frame in the server's usual shape.
    pub fn new(id: impl Into<String>, points: Vec<TelemetryPoint>) -> Self {
        let id = id.into();
        let mut fields = Map::new();
        let _ = fields.insert("type".into(), Value::from("history"));
        let _ = fields.insert("id".into(), Value::from(id.as_str()));
        let _ = fields.insert("value".into(), json!(points));
        Self { id, fields }
    }

    /// Measurement id the history belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// One field of the frame as received.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Every field of the frame as received, `type` and `id` included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Entries of the `value` array that decode as points, oldest first.
    ///
    /// A missing or non-array `value` yields no points.
    pub fn points(&self) -> Vec<TelemetryPoint> {
        match self.fields.get("value") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| TelemetryPoint::deserialize(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Serialize for HistoryFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Live push from the server, kept whole.
///
/// Usually `{"type": "data", "id": .., "value": {timestamp, value}}`, but
/// listeners receive every field the server sent, even without an `id`.
#[derive(Clone, Debug, PartialEq)]
pub struct DataFrame {
    fields: Map<String, Value>,
}

impl DataFrame {
    /// Build a frame in the server's usual shape.
    pub fn new(id: impl Into<String>, point: TelemetryPoint) -> Self {
        let mut fields = Map::new();
        let _ = fields.insert("type".into(), Value::from("data"));
        let _ = fields.insert("id".into(), Value::from(id.into()));
        let _ = fields.insert("value".into(), json!(point));
        Self { fields }
    }

    /// Measurement id, if the frame carries a string one.
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }

    /// The `value` field decoded as a point.
    pub fn point(&self) -> Option<TelemetryPoint> {
        self.fields
            .get("value")
            .and_then(|value| TelemetryPoint::deserialize(value).ok())
    }

    /// One field of the frame as received.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Every field of the frame as received, `type` included.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Serialize for DataFrame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// A decoded server frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// The measurement dictionary.
    Dictionary {
        /// The catalog itself.
        value: Dictionary,
    },
    /// A history response.
    History(HistoryFrame),
    /// A live data push.
    Data(DataFrame),
    /// A frame whose `type` this client does not know.
    Unknown {
        /// The unrecognized `type` value.
        kind: String,
    },
}

impl Frame {
    /// Decode one text frame.
    ///
    /// Only the dictionary body is decoded strictly. History frames need a
    /// string `id`; data frames need nothing beyond their `type`.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(fields) = value else {
            return Err(FrameError::MissingType);
        };
        let kind = fields
            .get("type")
            .and_then(Value::as_str)
            .ok_or(FrameError::MissingType)?
            .to_owned();

        match kind.as_str() {
            "dictionary" => {
                let body = fields.get("value").cloned().unwrap_or(Value::Null);
                let value = serde_json::from_value(body)
                    .map_err(|source| FrameError::Malformed { kind, source })?;
                Ok(Self::Dictionary { value })
            }
            "history" => {
                let Some(id) = fields.get("id").and_then(Value::as_str) else {
                    return Err(FrameError::MissingId { kind });
                };
                let id = id.to_owned();
                Ok(Self::History(HistoryFrame { id, fields }))
            }
            "data" => Ok(Self::Data(DataFrame { fields })),
            _ => Ok(Self::Unknown { kind }),
        }
    }

    /// The frame's `type` discriminator.
    pub fn kind(&self) -> &str {
        match self {
            Self::Dictionary { .. } => "dictionary",
            Self::History(_) => "history",
            Self::Data(_) => "data",
            Self::Unknown { kind } => kind,
        }
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Dictionary { value } => {
                json!({ "type": "dictionary", "value": value }).serialize(serializer)
            }
            Self::History(frame) => frame.serialize(serializer),
            Self::Data(frame) => frame.serialize(serializer),
            Self::Unknown { kind } => Err(S::Error::custom(format!(
                "cannot serialize frame of unknown type {kind}"
            ))),
        }
    }
}
