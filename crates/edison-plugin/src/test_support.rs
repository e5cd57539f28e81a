//! In-memory [`TelemetrySource`] for provider tests.

use std::sync::Arc;

use futures::future::{FutureExt, ready};
use parking_lot::Mutex;

use edison_adapter::{DataListener, Pending, TelemetrySource};
use edison_core::{
    DataFrame, Dictionary, FeedError, HistoryFrame, Measurement, Subsystem, TelemetryPoint,
};

pub(crate) fn sample_dictionary() -> Dictionary {
    let measurement = |id: &str, name: &str, value_type: &str, units: &str| Measurement {
        identifier: id.into(),
        name: name.into(),
        value_type: value_type.into(),
        units: units.into(),
    };
    Dictionary {
        identifier: "edison".into(),
        name: "Intel Edison".into(),
        subsystems: vec![
            Subsystem {
                identifier: "pwr".into(),
                name: "Power".into(),
                measurements: vec![
                    measurement("pwr.v", "Voltage", "float", "V"),
                    measurement("pwr.c", "Current", "float", "A"),
                ],
            },
            Subsystem {
                identifier: "sys".into(),
                name: "System".into(),
                measurements: vec![measurement("sys.state", "State", "string", "")],
            },
        ],
    }
}

/// Answers immediately and records every command.
pub(crate) struct FakeSource {
    dictionary: Result<Dictionary, FeedError>,
    commands: Mutex<Vec<String>>,
    listeners: Mutex<Vec<DataListener>>,
}

impl FakeSource {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_dictionary(Ok(sample_dictionary()))
    }

    pub(crate) fn with_dictionary(dictionary: Result<Dictionary, FeedError>) -> Arc<Self> {
        Arc::new(Self {
            dictionary,
            commands: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Push a live frame through every registered listener.
    pub(crate) fn emit(&self, id: &str, timestamp: i64, value: f64) {
        self.emit_frame(&DataFrame::new(id, TelemetryPoint::new(timestamp, value)));
    }

    /// Push an arbitrary live frame through every registered listener.
    pub(crate) fn emit_frame(&self, frame: &DataFrame) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(frame);
        }
    }
}

impl TelemetrySource for FakeSource {
    fn dictionary(&self) -> Pending<Dictionary> {
        self.commands.lock().push("dictionary".into());
        ready(self.dictionary.clone().map(Arc::new)).boxed().shared()
    }

    fn history(&self, id: &str) -> Pending<HistoryFrame> {
        self.commands.lock().push(format!("history {id}"));
        let frame = HistoryFrame::new(
            id,
            vec![TelemetryPoint::new(1, 1.0), TelemetryPoint::new(2, 2.0)],
        );
        ready(Ok(Arc::new(frame))).boxed().shared()
    }

    fn subscribe(&self, id: &str) {
        self.commands.lock().push(format!("subscribe {id}"));
    }

    fn unsubscribe(&self, id: &str) {
        self.commands.lock().push(format!("unsubscribe {id}"));
    }

    fn on_data(&self, listener: DataListener) {
        self.listeners.lock().push(listener);
    }
}
