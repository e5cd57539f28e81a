//! The telemetry feed adapter handle.

use std::future::Future;
use std::sync::Arc;

use futures::{Sink, Stream};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;

use edison_core::{Command, DataFrame, Dictionary, FeedError, HistoryFrame};

use crate::config::AdapterConfig;
use crate::connection::{self, SharedState};
use crate::state::{DataListener, FeedState, Pending, failed};

/// Client for one telemetry server connection.
///
/// Construction spawns the connection task on the current Tokio runtime and
/// returns immediately; calls made before the socket opens are queued behind
/// the initial dictionary request. Dropping the adapter tears the connection
/// down.
///
/// No request has a timeout: while the connection stays up, a request the
/// server never answers stays pending. When the connection ends, everything
/// outstanding resolves to the [`FeedError`] that ended it. There is no
/// reconnect.
pub struct TelemetryFeedAdapter {
    state: SharedState,
    dictionary: Pending<Dictionary>,
    outbound: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl TelemetryFeedAdapter {
    /// Connect to the server at `url`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(url: impl Into<String>) -> Self {
        Self::connect_with(AdapterConfig::new(url))
    }

    /// Connect using an explicit configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect_with(config: AdapterConfig) -> Self {
        Self::spawn(move |state, outbound| connection::connect_and_run(config, state, outbound))
    }

    /// Speak the feed protocol over an already-open WebSocket.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn with_transport<S>(transport: S) -> Self
    where
        S: Stream<Item = Result<Message, WsError>>
            + Sink<Message, Error = WsError>
            + Send
            + Unpin
            + 'static,
    {
        Self::spawn(move |state, outbound| connection::run(transport, state, outbound))
    }

    fn spawn<F, Fut>(start: F) -> Self
    where
        F: FnOnce(SharedState, mpsc::UnboundedReceiver<Command>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (state, dictionary) = FeedState::new();
        let state = Arc::new(Mutex::new(state));
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(start(Arc::clone(&state), outbound_rx));

        Self {
            state,
            dictionary,
            outbound,
            task: Some(task),
        }
    }

    /// The measurement dictionary.
    ///
    /// Every call returns a clone of the same future; it resolves once, when
    /// the server's dictionary frame arrives.
    pub fn dictionary(&self) -> Pending<Dictionary> {
        self.dictionary.clone()
    }

    /// History for measurement `id`.
    ///
    /// Sends `history <id>` unless a request for `id` is already in flight,
    /// in which case the in-flight future is returned and nothing is sent.
    /// The entry is cleared when the response arrives, so a later call
    /// issues a fresh request.
    pub fn history(&self, id: &str) -> Pending<HistoryFrame> {
        let mut state = self.state.lock();
        if let Some(in_flight) = state.pending_history(id) {
            debug!(id, "joining in-flight history request");
            return in_flight;
        }
        if let Some(reason) = state.closed() {
            return failed(reason.clone());
        }
        // Sent under the lock so a concurrent close cannot miss the entry.
        if !self.send(Command::History(id.to_owned())) {
            return failed(FeedError::Disconnected);
        }
        state.track_history(id.to_owned())
    }

    /// Start live updates for `id`. No acknowledgment is tracked.
    pub fn subscribe(&self, id: &str) {
        let _ = self.send(Command::Subscribe(id.to_owned()));
    }

    /// Stop live updates for `id`. No acknowledgment is tracked.
    pub fn unsubscribe(&self, id: &str) {
        let _ = self.send(Command::Unsubscribe(id.to_owned()));
    }

    /// Register `listener` for every subsequent data frame, for any id.
    ///
    /// Listeners run in registration order on the connection task and cannot
    /// be removed; filtering by id is up to the listener.
    pub fn on_data<F>(&self, listener: F)
    where
        F: Fn(&DataFrame) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(listener));
    }

    pub(crate) fn add_listener(&self, listener: DataListener) {
        self.state.lock().add_listener(listener);
    }

    /// Whether the connection has ended.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed().is_some()
    }

    /// Flush queued commands, close the socket, and wait for the
    /// connection task to finish.
    pub async fn shutdown(mut self) {
        // Dropping the only sender ends the pump once the queue drains.
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.outbound, closed));
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, command: Command) -> bool {
        match self.outbound.send(command) {
            Ok(()) => true,
            Err(mpsc::error::SendError(command)) => {
                debug!(%command, "connection task gone, dropping command");
                false
            }
        }
    }
}

impl Drop for TelemetryFeedAdapter {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
