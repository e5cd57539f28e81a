//! Connection task: owns the WebSocket, writes queued commands, routes frames.

use std::sync::Arc;

use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, trace, warn};

use edison_core::{Command, FeedError, Frame};

use crate::config::AdapterConfig;
use crate::state::FeedState;

pub(crate) type SharedState = Arc<Mutex<FeedState>>;

/// Connect to `config.url`, then run the protocol until the connection ends.
pub(crate) async fn connect_and_run(
    config: AdapterConfig,
    state: SharedState,
    outbound: mpsc::UnboundedReceiver<Command>,
) {
    let url = config.url;
    let handshake = tokio::time::timeout(config.connect_timeout, connect_async(url.as_str()));

    match handshake.await {
        Ok(Ok((ws, _response))) => {
            info!(%url, "connected to telemetry server");
            run(ws, state, outbound).await;
        }
        Ok(Err(e)) => {
            warn!(%url, error = %e, "failed to connect to telemetry server");
            state.lock().close(FeedError::Connect {
                url,
                reason: e.to_string(),
            });
        }
        Err(_) => {
            let timeout_ms = u64::try_from(config.connect_timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(%url, timeout_ms, "timed out connecting to telemetry server");
            state.lock().close(FeedError::Timeout { url, timeout_ms });
        }
    }
}

/// Run the protocol over an open WebSocket until it ends, then fail whatever
/// is still outstanding.
pub(crate) async fn run<S>(
    transport: S,
    state: SharedState,
    mut outbound: mpsc::UnboundedReceiver<Command>,
) where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    let reason = pump(transport, &state, &mut outbound).await;
    info!(%reason, "telemetry feed closed");
    state.lock().close(reason);
}

async fn pump<S>(
    transport: S,
    state: &Mutex<FeedState>,
    outbound: &mut mpsc::UnboundedReceiver<Command>,
) -> FeedError
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    let (mut ws_tx, mut ws_rx) = transport.split();

    // The dictionary request always goes first, exactly once per connection.
    if let Err(e) = send_command(&mut ws_tx, &Command::Dictionary).await {
        return e;
    }

    loop {
        tokio::select! {
            command = outbound.recv() => {
                let Some(command) = command else {
                    // Adapter handle dropped.
                    let _ = ws_tx.close().await;
                    return FeedError::Disconnected;
                };
                if let Err(e) = send_command(&mut ws_tx, &command).await {
                    return e;
                }
            }
            message = ws_rx.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => handle_text(state, &text),
                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => handle_text(state, text),
                        Err(_) => warn!(len = bytes.len(), "dropping non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "server sent close");
                        return FeedError::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "telemetry transport error");
                        return FeedError::Transport(e.to_string());
                    }
                    None => return FeedError::Disconnected,
                }
            }
        }
    }
}

async fn send_command<W>(ws_tx: &mut W, command: &Command) -> Result<(), FeedError>
where
    W: Sink<Message, Error = WsError> + Unpin,
{
    debug!(%command, "sending command");
    ws_tx
        .send(Message::text(command.to_string()))
        .await
        .map_err(|e| {
            warn!(%command, error = %e, "failed to send command");
            FeedError::Transport(e.to_string())
        })
}

/// Decode and route one text frame. Malformed frames are logged and dropped.
fn handle_text(state: &Mutex<FeedState>, text: &str) {
    let frame = match Frame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "dropping malformed frame");
            return;
        }
    };
    trace!(kind = frame.kind(), "frame received");

    // Bind first so the lock is released before listeners run.
    let delivery = state.lock().route(frame);
    if let Some(delivery) = delivery {
        delivery.deliver();
    }
}
