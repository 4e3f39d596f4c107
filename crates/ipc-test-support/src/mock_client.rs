//! A raw WebSocket test client, deliberately untyped.
//!
//! Grounded on `examples/iwismer-rusty-timer/crates/rt-test-utils/src/mock_ws_client.rs`'s
//! `MockWsClient` (connect, send/recv text frames, close) — generalized here
//! to carry arbitrary `serde_json::Value` frames rather than a fixed
//! `WsMessage` enum, since integration tests need to send deliberately
//! malformed envelopes to exercise the validator and the auth handshake.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct MockClient {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

#[derive(Debug)]
pub enum MockClientError {
    Ws(String),
    Json(String),
    ClosedByServer,
    StreamEnded,
}

impl std::fmt::Display for MockClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockClientError::Ws(s) => write!(f, "websocket error: {s}"),
            MockClientError::Json(s) => write!(f, "json error: {s}"),
            MockClientError::ClosedByServer => write!(f, "connection closed by server"),
            MockClientError::StreamEnded => write!(f, "connection stream ended"),
        }
    }
}

impl std::error::Error for MockClientError {}

impl MockClient {
    pub async fn connect(url: &str) -> Result<Self, MockClientError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| MockClientError::Ws(e.to_string()))?;
        let (write, read) = ws.split();
        Ok(Self { write, read })
    }

    /// Send a raw JSON value as a single text frame, bypassing any
    /// envelope validity checks — callers construct deliberately malformed
    /// bodies to exercise hub-side rejection.
    pub async fn send_value(&mut self, value: &Value) -> Result<(), MockClientError> {
        let text = serde_json::to_string(value).map_err(|e| MockClientError::Json(e.to_string()))?;
        self.write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| MockClientError::Ws(e.to_string()))
    }

    /// Send raw text verbatim — for exercising `ERR_INVALID_JSON`.
    pub async fn send_text(&mut self, text: &str) -> Result<(), MockClientError> {
        self.write
            .send(Message::Text(text.to_owned().into()))
            .await
            .map_err(|e| MockClientError::Ws(e.to_string()))
    }

    /// Convenience: build and send a well-formed envelope from its parts.
    pub async fn send_envelope(
        &mut self,
        from: &str,
        to: &str,
        topic: &str,
        trace_id: &str,
        reply_to: Option<&str>,
        payload: Value,
    ) -> Result<(), MockClientError> {
        let envelope = serde_json::json!({
            "v": 1,
            "id": Uuid::new_v4().to_string(),
            "ts": "2026-02-16T00:00:00Z",
            "from": from,
            "to": to,
            "topic": topic,
            "reply_to": reply_to,
            "trace_id": trace_id,
            "payload": payload,
        });
        self.send_value(&envelope).await
    }

    pub async fn recv_value(&mut self) -> Result<Value, MockClientError> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).map_err(|e| MockClientError::Json(e.to_string()));
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) => return Err(MockClientError::ClosedByServer),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(MockClientError::Ws(e.to_string())),
                None => return Err(MockClientError::StreamEnded),
            }
        }
    }

    /// Like [`Self::recv_value`] but fails instead of hanging forever if
    /// the server never replies.
    pub async fn recv_value_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Value, MockClientError> {
        tokio::time::timeout(timeout, self.recv_value())
            .await
            .map_err(|_| MockClientError::StreamEnded)?
    }

    pub async fn close(&mut self) -> Result<(), MockClientError> {
        self.write
            .send(Message::Close(None))
            .await
            .map_err(|e| MockClientError::Ws(e.to_string()))
    }
}
