//! Peer client protocol.
//!
//! Every non-hub service (UI shell, planner, executor, voice, skin) speaks
//! the same five steps to the hub: connect, `auth.hello`, await `auth.ok`,
//! concurrent read-dispatch + heartbeat, reconnect-with-backoff on failure.
//! The reconnect loop's backoff schedule is a linear `base * attempt`
//! delay, capped so a down hub never spins a peer into a tight loop.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use ipc_protocol::{
    parse_and_validate, topics, AuthHello, AuthOk, Envelope, ErrorPayload, HubError,
};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Static configuration for one peer's connection to the hub.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// `ws://host:port/ws` endpoint of the hub.
    pub hub_url: String,
    /// This peer's own service name, sent as `auth.hello.service` and as
    /// every outbound envelope's `from`.
    pub service: String,
    /// Shared secret compared against the hub's configured token.
    pub token: String,
    /// Informational capability tags; the hub does not act on these.
    pub capabilities: Option<Vec<String>>,
    /// How often to send `hb.ping` in the authenticated steady state.
    /// Must stay below the hub's liveness timeout (20 s); defaults to 5 s.
    pub heartbeat_period: Duration,
    /// Base delay for the reconnect backoff; actual delay is
    /// `backoff_base * attempt`, capped at `backoff_max`.
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl PeerConfig {
    #[must_use]
    pub fn new(hub_url: impl Into<String>, service: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            hub_url: hub_url.into(),
            service: service.into(),
            token: token.into(),
            capabilities: None,
            heartbeat_period: Duration::from_secs(5),
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(10),
        }
    }
}

/// Everything that can go wrong on the peer side of the protocol.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("failed to connect to hub: {0}")]
    Connect(String),
    #[error("websocket error: {0}")]
    Ws(String),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("hub rejected auth: {} - {}", .0.code, .0.message)]
    AuthRejected(ErrorPayload),
    #[error("hub closed the connection or disconnected")]
    Disconnected,
    #[error("failed to serialize envelope: {0}")]
    Serialization(String),
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// An authenticated connection to the hub. Constructed only by
/// [`PeerConnection::connect`], which performs the handshake — so holding
/// one is proof auth already succeeded.
pub struct PeerConnection {
    ws: WsStream,
    service: String,
    session_token: Option<String>,
}

impl PeerConnection {
    /// Open the transport, send `auth.hello`, and wait for a matching
    /// `auth.ok`. An `ipc.error` rejection (or a transport close before one
    /// arrives) is surfaced as an error — callers reconnect via [`run`],
    /// not by retrying this method directly.
    pub async fn connect(cfg: &PeerConfig) -> Result<Self, PeerError> {
        use tokio_tungstenite::connect_async;

        let (mut ws, _response) = connect_async(cfg.hub_url.as_str())
            .await
            .map_err(|e| PeerError::Connect(e.to_string()))?;

        let trace_id = Uuid::new_v4().to_string();
        let hello_payload = AuthHello {
            service: cfg.service.clone(),
            token: cfg.token.clone(),
            capabilities: cfg.capabilities.clone(),
        };
        let hello = Envelope::new(
            cfg.service.clone(),
            topics::HUB_NAME,
            topics::AUTH_HELLO,
            trace_id.clone(),
            None,
            Envelope::payload_of(&hello_payload),
        );
        send_envelope(&mut ws, &hello).await?;

        let reply = recv_envelope(&mut ws).await?;
        match reply.topic.as_str() {
            t if t == topics::AUTH_OK && reply.reply_to.as_deref() == Some(hello.id.as_str()) => {
                let ok: AuthOk = parse_payload(&reply)?;
                info!(service = %cfg.service, "authenticated with hub");
                Ok(Self {
                    ws,
                    service: cfg.service.clone(),
                    session_token: ok.session_token,
                })
            }
            t if t == topics::AUTH_ERROR || t == topics::IPC_ERROR => {
                let err: ErrorPayload = parse_payload(&reply)?;
                Err(PeerError::AuthRejected(err))
            }
            other => Err(PeerError::Protocol(format!(
                "expected auth.ok, got topic {other}"
            ))),
        }
    }

    /// Session token the hub handed back in `auth.ok`, if any.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    /// Send an envelope addressed to `to` on `topic`, carrying `payload`,
    /// with a fresh `id`/`ts` and `from = self.service`.
    pub async fn send(
        &mut self,
        to: &str,
        topic: &str,
        trace_id: &str,
        reply_to: Option<String>,
        payload: serde_json::Map<String, Value>,
    ) -> Result<(), PeerError> {
        let env = Envelope::new(self.service.clone(), to, topic, trace_id, reply_to, payload);
        send_envelope(&mut self.ws, &env).await
    }

    /// Send `hb.ping` with an empty payload.
    pub async fn send_heartbeat(&mut self) -> Result<(), PeerError> {
        let env = Envelope::new(
            self.service.clone(),
            topics::HUB_NAME,
            topics::HB_PING,
            Uuid::new_v4().to_string(),
            None,
            serde_json::Map::new(),
        );
        send_envelope(&mut self.ws, &env).await
    }

    /// Receive and validate the next inbound envelope, blocking until one
    /// arrives. Transparently answers WS-level pings; a WS close or EOF is
    /// reported as [`PeerError::Disconnected`].
    pub async fn recv(&mut self) -> Result<Envelope, PeerError> {
        recv_envelope(&mut self.ws).await
    }

    /// Close the transport with a normal closure frame.
    pub async fn close(&mut self) -> Result<(), PeerError> {
        self.ws
            .close(None)
            .await
            .map_err(|e| PeerError::Ws(e.to_string()))
    }
}

async fn send_envelope(ws: &mut WsStream, env: &Envelope) -> Result<(), PeerError> {
    let text = serde_json::to_string(env).map_err(|e| PeerError::Serialization(e.to_string()))?;
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| PeerError::Ws(e.to_string()))
}

async fn recv_envelope(ws: &mut WsStream) -> Result<Envelope, PeerError> {
    loop {
        match ws.next().await {
            None => return Err(PeerError::Disconnected),
            Some(Err(e)) => return Err(PeerError::Ws(e.to_string())),
            Some(Ok(Message::Text(text))) => {
                return parse_and_validate(&text).map_err(|e: HubError| {
                    PeerError::Protocol(format!("invalid envelope from hub: {e}"))
                });
            }
            Some(Ok(Message::Close(_))) => return Err(PeerError::Disconnected),
            Some(Ok(Message::Ping(data))) => {
                let _ = ws.send(Message::Pong(data)).await;
            }
            Some(Ok(_)) => continue,
        }
    }
}

fn parse_payload<T: serde::de::DeserializeOwned>(env: &Envelope) -> Result<T, PeerError> {
    serde_json::from_value(Value::Object(env.payload.clone()))
        .map_err(|e| PeerError::Protocol(format!("malformed payload: {e}")))
}

/// Dispatch target for inbound envelopes in the steady state. Implemented by
/// whatever business logic a concrete service wraps around this client.
pub trait EnvelopeHandler: Send {
    /// Called for every validated inbound envelope except `hb.pong`, which
    /// [`run`] already consumes to drive liveness bookkeeping.
    fn handle(&mut self, env: Envelope);
}

impl<F: FnMut(Envelope) + Send> EnvelopeHandler for F {
    fn handle(&mut self, env: Envelope) {
        self(env);
    }
}

/// Run the full peer lifecycle: connect, authenticate, steady-state
/// read-dispatch + heartbeat, and reconnect with backoff on any failure.
/// Returns only if `shutdown` resolves; a down hub is retried forever.
///
/// Inbound frames and the heartbeat timer race in the same `select!`, so a
/// slow peer handler never delays the next `hb.ping`.
pub async fn run<H: EnvelopeHandler>(
    cfg: PeerConfig,
    mut handler: H,
    mut shutdown: tokio::sync::oneshot::Receiver<()>,
) {
    let mut attempt: u32 = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(service = %cfg.service, "peer client shutting down");
                return;
            }
            conn = PeerConnection::connect(&cfg) => {
                match conn {
                    Ok(conn) => {
                        attempt = 0;
                        if steady_state(conn, &cfg, &mut handler, &mut shutdown).await {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(service = %cfg.service, error = %e, "connect/auth failed");
                    }
                }
            }
        }

        attempt += 1;
        let delay = std::cmp::min(cfg.backoff_base * attempt, cfg.backoff_max);
        debug!(service = %cfg.service, attempt, delay_ms = delay.as_millis() as u64, "reconnecting after backoff");
        tokio::select! {
            _ = &mut shutdown => return,
            () = tokio::time::sleep(delay) => {}
        }
    }
}

/// Returns `true` if the caller should stop entirely (shutdown requested),
/// `false` if it should fall through to the reconnect loop.
async fn steady_state<H: EnvelopeHandler>(
    mut conn: PeerConnection,
    cfg: &PeerConfig,
    handler: &mut H,
    shutdown: &mut tokio::sync::oneshot::Receiver<()>,
) -> bool {
    let mut heartbeat = tokio::time::interval(cfg.heartbeat_period);
    heartbeat.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = conn.close().await;
                return true;
            }
            _ = heartbeat.tick() => {
                if let Err(e) = conn.send_heartbeat().await {
                    warn!(service = %cfg.service, error = %e, "heartbeat send failed");
                    return false;
                }
            }
            received = conn.recv() => {
                match received {
                    Ok(env) if env.topic == topics::HB_PONG => {
                        debug!(service = %cfg.service, "hb.pong received");
                    }
                    Ok(env) => handler.handle(env),
                    Err(e) => {
                        warn!(service = %cfg.service, error = %e, "connection lost");
                        return false;
                    }
                }
            }
        }
    }
}
