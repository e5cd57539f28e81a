//! Request bookkeeping shared between the adapter handle and its connection
//! task.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use edison_core::{DataFrame, Dictionary, FeedError, Frame, HistoryFrame};

/// A cloneable, single-resolution result shared by every caller that asked
/// for the same thing.
pub type Pending<T> = Shared<BoxFuture<'static, Result<Arc<T>, FeedError>>>;

/// Callback invoked for every live data frame.
pub type DataListener = Arc<dyn Fn(&DataFrame) + Send + Sync>;

type Resolver<T> = oneshot::Sender<Result<Arc<T>, FeedError>>;

/// Create an unresolved [`Pending`] and the sender that resolves it.
///
/// Dropping the sender without sending resolves to [`FeedError::Disconnected`].
fn pending<T: Send + Sync + 'static>() -> (Resolver<T>, Pending<T>) {
    let (tx, rx) = oneshot::channel();
    let future = async move { rx.await.unwrap_or(Err(FeedError::Disconnected)) }
        .boxed()
        .shared();
    (tx, future)
}

/// A [`Pending`] that is already failed.
pub(crate) fn failed<T: Send + Sync + 'static>(err: FeedError) -> Pending<T> {
    futures::future::ready(Err(err)).boxed().shared()
}

struct PendingHistory {
    resolver: Resolver<HistoryFrame>,
    future: Pending<HistoryFrame>,
}

/// Outstanding requests and listeners for one connection.
pub(crate) struct FeedState {
    dictionary: Option<Resolver<Dictionary>>,
    histories: HashMap<String, PendingHistory>,
    listeners: Vec<DataListener>,
    closed: Option<FeedError>,
}

/// A data frame plus the listeners to run it through, taken out of the lock.
pub(crate) struct Delivery {
    frame: DataFrame,
    listeners: Vec<DataListener>,
}

impl Delivery {
    /// Invoke every listener in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run and
    /// the connection stays up.
    pub(crate) fn deliver(self) {
        for (index, listener) in self.listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(&self.frame))).is_err() {
                warn!(index, id = ?self.frame.id(), "data listener panicked");
            }
        }
    }
}

impl FeedState {
    /// Fresh state plus the connection's one dictionary future.
    pub(crate) fn new() -> (Self, Pending<Dictionary>) {
        let (resolver, dictionary) = pending();
        let state = Self {
            dictionary: Some(resolver),
            histories: HashMap::new(),
            listeners: Vec::new(),
            closed: None,
        };
        (state, dictionary)
    }

    /// Why the connection ended, if it has.
    pub(crate) fn closed(&self) -> Option<&FeedError> {
        self.closed.as_ref()
    }

    /// The in-flight history request for `id`, if one exists.
    pub(crate) fn pending_history(&self, id: &str) -> Option<Pending<HistoryFrame>> {
        self.histories.get(id).map(|p| p.future.clone())
    }

    /// Start tracking a history request for `id`.
    pub(crate) fn track_history(&mut self, id: String) -> Pending<HistoryFrame> {
        let (resolver, future) = pending();
        let _ = self.histories.insert(
            id,
            PendingHistory {
                resolver,
                future: future.clone(),
            },
        );
        future
    }

    pub(crate) fn add_listener(&mut self, listener: DataListener) {
        self.listeners.push(listener);
    }

    /// Route one decoded frame.
    ///
    /// Data frames are returned as a [`Delivery`] so listeners run after the
    /// caller releases the lock.
    pub(crate) fn route(&mut self, frame: Frame) -> Option<Delivery> {
        match frame {
            Frame::Dictionary { value } => {
                match self.dictionary.take() {
                    Some(resolver) => {
                        debug!(name = %value.name, "dictionary received");
                        let _ = resolver.send(Ok(Arc::new(value)));
                    }
                    None => debug!("ignoring repeated dictionary frame"),
                }
                None
            }
            Frame::History(history) => {
                match self.histories.remove(history.id()) {
                    Some(pending) => {
                        debug!(id = %history.id(), "history received");
                        let _ = pending.resolver.send(Ok(Arc::new(history)));
                    }
                    None => debug!(id = %history.id(), "dropping unmatched history frame"),
                }
                None
            }
            Frame::Data(frame) => Some(Delivery {
                frame,
                listeners: self.listeners.clone(),
            }),
            Frame::Unknown { kind } => {
                debug!(%kind, "ignoring frame of unknown type");
                None
            }
        }
    }

    /// Fail everything outstanding with `reason`.
    ///
    /// Later requests fail immediately with the same reason. A dictionary that
    /// already resolved stays resolved.
    pub(crate) fn close(&mut self, reason: FeedError) {
        if let Some(resolver) = self.dictionary.take() {
            let _ = resolver.send(Err(reason.clone()));
        }
        for (_, pending) in self.histories.drain() {
            let _ = pending.resolver.send(Err(reason.clone()));
        }
        self.closed = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edison_core::TelemetryPoint;
    use edison_core::logging::capture_logs;
    use parking_lot::Mutex;
    use tracing::Level;

    fn history(id: &str) -> Frame {
        Frame::History(HistoryFrame::new(id, vec![TelemetryPoint::new(1, 2.0)]))
    }

    fn dictionary(name: &str) -> Frame {
        Frame::Dictionary {
            value: Dictionary {
                identifier: "edison".into(),
                name: name.into(),
                subsystems: Vec::new(),
            },
        }
    }

    #[test]
    fn dictionary_resolves_once() {
        let (mut state, dict) = FeedState::new();
        assert!(dict.clone().now_or_never().is_none());

        assert!(state.route(dictionary("first")).is_none());
        assert!(state.route(dictionary("second")).is_none());

        let resolved = dict.now_or_never().unwrap().unwrap();
        assert_eq!(resolved.name, "first");
    }

    #[test]
    fn history_resolves_and_clears_entry() {
        let (mut state, _dict) = FeedState::new();
        let future = state.track_history("X".into());
        assert!(state.pending_history("X").is_some());

        let _ = state.route(history("X"));

        assert!(state.pending_history("X").is_none());
        let frame = future.now_or_never().unwrap().unwrap();
        assert_eq!(frame.id(), "X");
    }

    #[test]
    fn pending_history_is_shared() {
        let (mut state, _dict) = FeedState::new();
        let first = state.track_history("X".into());
        let second = state.pending_history("X").unwrap();

        let _ = state.route(history("X"));

        let a = first.now_or_never().unwrap().unwrap();
        let b = second.now_or_never().unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn unmatched_history_is_dropped() {
        let (mut state, _dict) = FeedState::new();
        let other = state.track_history("Y".into());

        assert!(state.route(history("X")).is_none());

        assert!(other.now_or_never().is_none());
        assert!(state.pending_history("Y").is_some());
    }

    #[test]
    fn data_frame_snapshots_listeners_in_order() {
        let (mut state, _dict) = FeedState::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            state.add_listener(Arc::new(move |frame: &DataFrame| {
                seen.lock().push(format!("{tag}:{}", frame.id().unwrap_or("-")));
            }));
        }

        let delivery = state
            .route(Frame::Data(DataFrame::new("pwr.v", TelemetryPoint::new(5, 1.0))))
            .unwrap();
        delivery.deliver();

        assert_eq!(*seen.lock(), vec!["a:pwr.v", "b:pwr.v"]);
    }

    #[test]
    fn panicking_listener_does_not_stop_the_rest() {
        let (logs, _guard) = capture_logs();
        let (mut state, _dict) = FeedState::new();
        let seen = Arc::new(Mutex::new(0));
        let broken: DataListener = Arc::new(|_| panic!("listener bug"));
        state.add_listener(broken);
        let counter = Arc::clone(&seen);
        state.add_listener(Arc::new(move |_: &DataFrame| *counter.lock() += 1));

        for _ in 0..2 {
            state
                .route(Frame::Data(DataFrame::new("pwr.v", TelemetryPoint::new(1, 1.0))))
                .unwrap()
                .deliver();
        }

        assert_eq!(*seen.lock(), 2);
        assert_eq!(logs.count_at_level(Level::WARN), 2);
        assert!(logs.has_event(Level::WARN, "data listener panicked"));
    }

    #[test]
    fn history_with_any_body_resolves_and_clears_entry() {
        let (mut state, _dict) = FeedState::new();
        let future = state.track_history("X".into());

        let frame = Frame::parse(r#"{"type":"history","id":"X","value":[{"t":1,"v":2}]}"#).unwrap();
        let _ = state.route(frame);

        assert!(state.pending_history("X").is_none());
        let resolved = future.now_or_never().unwrap().unwrap();
        assert!(resolved.points().is_empty());
        assert_eq!(resolved.get("value").unwrap()[0]["v"], 2);
    }

    #[test]
    fn unknown_frame_has_no_effect() {
        let (mut state, dict) = FeedState::new();
        let future = state.track_history("X".into());

        assert!(state.route(Frame::Unknown { kind: "unknown_future_type".into() }).is_none());

        assert!(dict.now_or_never().is_none());
        assert!(future.now_or_never().is_none());
    }

    #[test]
    fn close_fails_outstanding_requests() {
        let (mut state, dict) = FeedState::new();
        let future = state.track_history("X".into());

        state.close(FeedError::Disconnected);

        assert_eq!(dict.now_or_never().unwrap(), Err(FeedError::Disconnected));
        assert_eq!(future.now_or_never().unwrap(), Err(FeedError::Disconnected));
        assert_eq!(state.closed(), Some(&FeedError::Disconnected));
    }

    #[test]
    fn close_keeps_resolved_dictionary() {
        let (mut state, dict) = FeedState::new();
        let _ = state.route(dictionary("kept"));

        state.close(FeedError::Transport("reset".into()));

        assert_eq!(dict.now_or_never().unwrap().unwrap().name, "kept");
    }

    #[test]
    fn dropped_state_resolves_disconnected() {
        let (state, dict) = FeedState::new();
        drop(state);
        assert_eq!(dict.now_or_never().unwrap(), Err(FeedError::Disconnected));
    }

    #[test]
    fn failed_is_immediately_ready() {
        let future: Pending<HistoryFrame> = failed(FeedError::Disconnected);
        assert_eq!(future.now_or_never().unwrap(), Err(FeedError::Disconnected));
    }
}
