//! End-to-end test against a real WebSocket server on localhost.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use counterlink_core::message::Message;
use counterlink_core::status::ConnectionStatus;
use counterlink_ws::{ChannelConfig, RealtimeChannel};

/// Accepts one connection, answers a single `add`, then closes normally.
async fn spawn_counter_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(frame)) = ws.next().await {
            let WsMessage::Text(text) = frame else { continue };
            let request: Value = serde_json::from_str(&text).unwrap();
            if request["type"] != "add" {
                continue;
            }
            let sum = request["data"]["a"].as_i64().unwrap() + request["data"]["b"].as_i64().unwrap();
            let reply = json!({"type": "add", "data": {"result": sum}});
            ws.send(WsMessage::Text(reply.to_string().into())).await.unwrap();
            ws.close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "done".into(),
            }))
            .await
            .unwrap();
            break;
        }
        // Drain until the client acknowledges the close.
        while let Some(Ok(_)) = ws.next().await {}
    });

    format!("ws://{addr}/")
}

async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<ConnectionStatus>,
    wanted: ConnectionStatus,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(status) = rx.recv().await {
            if status == wanted {
                return;
            }
        }
        panic!("status stream ended before {wanted}");
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"));
}

#[tokio::test]
async fn add_round_trip_over_websocket() {
    let url = spawn_counter_server().await;
    let channel = RealtimeChannel::new(url, ChannelConfig::default());

    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let _statuses = channel.on_status_change(move |s| {
        let _ = status_tx.send(*s);
    });
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<Message>();
    let _messages = channel.on_message(move |m| {
        let _ = msg_tx.send(m.clone());
    });

    channel.connect();
    wait_for(&mut status_rx, ConnectionStatus::Connected).await;

    channel.send_add_numbers(5, 3).unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(5), msg_rx.recv())
        .await
        .expect("no reply")
        .expect("message stream closed");
    assert!(reply.is("add"));
    assert_eq!(reply.data, Some(json!({"result": 8})));

    wait_for(&mut status_rx, ConnectionStatus::Disconnected).await;
    assert_eq!(channel.reconnect_attempts(), 0);
}

#[tokio::test]
async fn unreachable_endpoint_is_terminal() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let channel = RealtimeChannel::new(format!("ws://{addr}/"), ChannelConfig::default());
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let _statuses = channel.on_status_change(move |s| {
        let _ = status_tx.send(*s);
    });

    channel.connect();
    wait_for(&mut status_rx, ConnectionStatus::Disconnected).await;

    assert_eq!(channel.reconnect_attempts(), 5);
    assert!(!channel.is_connected());
}
