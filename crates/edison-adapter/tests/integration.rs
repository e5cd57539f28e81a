//! End-to-end tests against a scripted telemetry server over real TCP.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use edison_adapter::{AdapterConfig, TelemetryFeedAdapter, TelemetrySource};
use edison_core::{
    Command, DataFrame, Dictionary, FeedError, Frame, HistoryFrame, Measurement, Subsystem,
    TelemetryPoint,
};

const TIMEOUT: Duration = Duration::from_secs(5);

fn board_dictionary() -> Dictionary {
    Dictionary {
        identifier: "edison".into(),
        name: "Intel Edison".into(),
        subsystems: vec![Subsystem {
            identifier: "pwr".into(),
            name: "Power".into(),
            measurements: vec![Measurement {
                identifier: "pwr.v".into(),
                name: "Voltage".into(),
                value_type: "float".into(),
                units: "V".into(),
            }],
        }],
    }
}

/// Boot a one-connection server that answers like the Edison hub and
/// reports every command it receives.
async fn boot_hub() -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    let _hub = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let _ = tx.send(text.as_str().to_owned());

            let reply = match Command::parse(&text) {
                Some(Command::Dictionary) => Some(Frame::Dictionary {
                    value: board_dictionary(),
                }),
                Some(Command::History(id)) => Some(Frame::History(HistoryFrame::new(
                    id,
                    vec![TelemetryPoint::new(1, 1.0), TelemetryPoint::new(2, 1.1)],
                ))),
                Some(Command::Subscribe(id)) => Some(Frame::Data(DataFrame::new(
                    id,
                    TelemetryPoint::new(3, 1.2),
                ))),
                _ => None,
            };
            if let Some(frame) = reply {
                let text = serde_json::to_string(&frame).unwrap();
                if ws.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    (format!("ws://{addr}"), rx)
}

async fn recv_command(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
    timeout(TIMEOUT, rx.recv())
        .await
        .expect("timeout waiting for command")
        .expect("hub stopped")
}

#[tokio::test]
async fn e2e_dictionary_resolves() {
    let (url, mut commands) = boot_hub().await;
    let adapter = TelemetryFeedAdapter::connect(url);

    let dict = timeout(TIMEOUT, adapter.dictionary()).await.unwrap().unwrap();
    assert_eq!(*dict, board_dictionary());
    assert_eq!(recv_command(&mut commands).await, "dictionary");
}

#[tokio::test]
async fn e2e_calls_before_open_are_queued_in_order() {
    let (url, mut commands) = boot_hub().await;
    let adapter = TelemetryFeedAdapter::connect(url);

    let history = adapter.history("pwr.v");
    adapter.subscribe("pwr.v");
    adapter.unsubscribe("pwr.v");

    assert_eq!(recv_command(&mut commands).await, "dictionary");
    assert_eq!(recv_command(&mut commands).await, "history pwr.v");
    assert_eq!(recv_command(&mut commands).await, "subscribe pwr.v");
    assert_eq!(recv_command(&mut commands).await, "unsubscribe pwr.v");

    let frame = timeout(TIMEOUT, history).await.unwrap().unwrap();
    assert_eq!(frame.points().len(), 2);
}

#[tokio::test]
async fn e2e_live_data_reaches_listener() {
    let (url, _commands) = boot_hub().await;
    let adapter = TelemetryFeedAdapter::connect(url);
    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.on_data(move |frame| {
        let _ = tx.send(frame.clone());
    });

    adapter.subscribe("pwr.v");

    let frame = timeout(TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(frame.id(), Some("pwr.v"));
    assert_eq!(frame.point(), Some(TelemetryPoint::new(3, 1.2)));
}

#[tokio::test]
async fn e2e_usable_through_trait_object() {
    let (url, _commands) = boot_hub().await;
    let source: Arc<dyn TelemetrySource> = Arc::new(TelemetryFeedAdapter::connect(url));

    let history = timeout(TIMEOUT, source.history("pwr.v")).await.unwrap().unwrap();
    assert_eq!(history.id(), "pwr.v");
    let dict = timeout(TIMEOUT, source.dictionary()).await.unwrap().unwrap();
    assert_eq!(dict.name, "Intel Edison");
}

#[tokio::test]
async fn connect_refused_fails_pending_requests() {
    // Grab a free port, then release it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let adapter = TelemetryFeedAdapter::connect(format!("ws://{addr}"));
    let history = adapter.history("pwr.v");

    let err = timeout(TIMEOUT, adapter.dictionary()).await.unwrap().unwrap_err();
    assert_matches!(err, FeedError::Connect { url, .. } if url == format!("ws://{addr}"));
    assert_matches!(
        timeout(TIMEOUT, history).await.unwrap(),
        Err(FeedError::Connect { .. })
    );
    assert!(adapter.is_closed());
}

#[tokio::test]
async fn handshake_timeout_fails_pending_requests() {
    // Accepts TCP (via the backlog) but never answers the upgrade.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config =
        AdapterConfig::new(format!("ws://{addr}")).with_connect_timeout(Duration::from_millis(200));
    let adapter = TelemetryFeedAdapter::connect_with(config);

    let err = timeout(TIMEOUT, adapter.dictionary()).await.unwrap().unwrap_err();
    assert_matches!(err, FeedError::Timeout { timeout_ms: 200, .. });
    drop(listener);
}
