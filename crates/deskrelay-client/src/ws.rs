//! WebSocket `Transport` backed by `tokio-tungstenite`.
//!
//! `open` performs the HTTP upgrade (bearer header included) and spawns a
//! pump task that owns the socket: outbound frames come in over the session
//! channel, inbound text frames and the close event go out as
//! [`TransportEvent`]s. Dropping the session's sender closes the socket
//! best-effort.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;

use deskrelay_core::error::ClientError;
use deskrelay_core::transport::{Transport, TransportEvent, TransportSession};

/// Production WebSocket transport.
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<TransportSession, ClientError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ClientError::Transport(e.to_string()))?;
            request.headers_mut().insert(name, value);
        }

        let (ws, _) = connect_async(request)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        tracing::debug!(url = %url, "websocket connected");

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel::<TransportEvent>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = out_rx.recv() => match outbound {
                        // Session handle dropped — close politely and stop.
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            return;
                        }
                        Some(text) => {
                            if let Err(e) = sink.send(Message::Text(text.into())).await {
                                let _ = ev_tx.send(TransportEvent::Closed {
                                    code: None,
                                    reason: e.to_string(),
                                });
                                return;
                            }
                        }
                    },
                    inbound = stream.next() => match inbound {
                        None => {
                            let _ = ev_tx.send(TransportEvent::Closed {
                                code: None,
                                reason: "stream ended".into(),
                            });
                            return;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "websocket receive error");
                            let _ = ev_tx.send(TransportEvent::Closed {
                                code: None,
                                reason: e.to_string(),
                            });
                            return;
                        }
                        Some(Ok(Message::Text(text))) => {
                            if ev_tx.send(TransportEvent::Frame(text.to_string())).is_err() {
                                // Receiver dropped
                                return;
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let code = frame.as_ref().map(|f| u16::from(f.code));
                            let reason =
                                frame.map(|f| f.reason.to_string()).unwrap_or_default();
                            let _ = ev_tx.send(TransportEvent::Closed { code, reason });
                            return;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            // Keep the socket's own keep-alive working.
                            let _ = sink.send(Message::Pong(data)).await;
                        }
                        Some(Ok(_)) => {} // binary / pong — ignore
                    },
                }
            }
        });

        Ok(TransportSession { outgoing: out_tx, incoming: ev_rx })
    }
}
