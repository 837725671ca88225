//! `tokio-tungstenite` implementation of [`Connector`].

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use counterlink_core::error::ChannelError;
use counterlink_core::transport::{Connector, Outbound, TransportEvent, TransportLink};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Opens plain or TLS WebSocket connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<TransportLink, ChannelError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ChannelError::WebSocket(e.to_string()))?;

        let (link, out_rx, in_tx) = TransportLink::pair();
        tokio::spawn(pump(ws_stream, out_rx, in_tx));
        Ok(link)
    }
}

/// Background task that owns the socket for one connection.
///
/// Ends after reporting exactly one `Closed` event, or when the channel asks
/// it to close.
async fn pump(
    ws_stream: WsStream,
    mut out_rx: mpsc::UnboundedReceiver<Outbound>,
    in_tx: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut sink, mut stream) = ws_stream.split();

    loop {
        tokio::select! {
            cmd = out_rx.recv() => {
                match cmd {
                    Some(Outbound::Text(text)) => {
                        if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                            let _ = in_tx.send(TransportEvent::Error(format!("send failed: {e}")));
                            let _ = in_tx.send(TransportEvent::Closed {
                                code: None,
                                reason: e.to_string(),
                            });
                            return;
                        }
                    }
                    None | Some(Outbound::Close) => {
                        // Close errors are irrelevant once the channel let go.
                        let _ = sink.send(WsMessage::Close(None)).await;
                        let _ = sink.close().await;
                        return;
                    }
                }
            }
            msg = stream.next() => {
                match msg {
                    None => {
                        let _ = in_tx.send(TransportEvent::Closed {
                            code: None,
                            reason: "stream ended".into(),
                        });
                        return;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WS receive error");
                        let _ = in_tx.send(TransportEvent::Error(e.to_string()));
                        let _ = in_tx.send(TransportEvent::Closed {
                            code: None,
                            reason: e.to_string(),
                        });
                        return;
                    }
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = in_tx.send(TransportEvent::Text(text.to_string()));
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        let (code, reason) = match frame {
                            Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                            // 1005: close frame without a status code
                            None => (Some(1005), String::new()),
                        };
                        let _ = in_tx.send(TransportEvent::Closed { code, reason });
                        return;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = sink.send(WsMessage::Pong(data)).await;
                    }
                    Some(Ok(_)) => {
                        tracing::debug!("ignoring non-text WS frame");
                    }
                }
            }
        }
    }
}
