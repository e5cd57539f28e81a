//! The seam host-side providers consume.

use edison_core::{Dictionary, HistoryFrame};

use crate::adapter::TelemetryFeedAdapter;
use crate::state::{DataListener, Pending};

/// Anything that can answer dictionary/history requests and push live data.
///
/// Implemented by [`TelemetryFeedAdapter`]; providers take an
/// `Arc<dyn TelemetrySource>` so they can be exercised without a socket.
pub trait TelemetrySource: Send + Sync {
    /// The measurement dictionary (memoized).
    fn dictionary(&self) -> Pending<Dictionary>;

    /// History for one measurement (deduplicated while in flight).
    fn history(&self, id: &str) -> Pending<HistoryFrame>;

    /// Start live updates for `id`.
    fn subscribe(&self, id: &str);

    /// Stop live updates for `id`.
    fn unsubscribe(&self, id: &str);

    /// Register a listener for every live data frame.
    fn on_data(&self, listener: DataListener);
}

impl TelemetrySource for TelemetryFeedAdapter {
    fn dictionary(&self) -> Pending<Dictionary> {
        TelemetryFeedAdapter::dictionary(self)
    }

    fn history(&self, id: &str) -> Pending<HistoryFrame> {
        TelemetryFeedAdapter::history(self, id)
    }

    fn subscribe(&self, id: &str) {
        TelemetryFeedAdapter::subscribe(self, id);
    }

    fn unsubscribe(&self, id: &str) {
        TelemetryFeedAdapter::unsubscribe(self, id);
    }

    fn on_data(&self, listener: DataListener) {
        self.add_listener(listener);
    }
}
