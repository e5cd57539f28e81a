//! Index-based series view over telemetry points.

use serde_json::Value;

use crate::protocol::{DataFrame, HistoryFrame, TelemetryPoint};

/// An ordered run of samples exposed by index.
///
/// The domain is the timestamp, the range is the sampled value. Indexing
/// past the end yields `None` instead of panicking.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetrySeries {
    points: Vec<TelemetryPoint>,
}

impl TelemetrySeries {
    /// Wrap a sequence of points.
    pub fn new(points: Vec<TelemetryPoint>) -> Self {
        Self { points }
    }

    /// Number of points.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Timestamp of the point at `index`.
    pub fn domain_value(&self, index: usize) -> Option<i64> {
        self.points.get(index).map(|p| p.timestamp)
    }

    /// Value of the point at `index`.
    pub fn range_value(&self, index: usize) -> Option<&Value> {
        self.points.get(index).map(|p| &p.value)
    }

    /// The wrapped points.
    pub fn points(&self) -> &[TelemetryPoint] {
        &self.points
    }
}

impl From<&HistoryFrame> for TelemetrySeries {
    fn from(frame: &HistoryFrame) -> Self {
        Self::new(frame.points())
    }
}

/// One point, or none if the frame's `value` is not a point.
impl From<&DataFrame> for TelemetrySeries {
    fn from(frame: &DataFrame) -> Self {
        Self::new(frame.point().into_iter().collect())
    }
}
