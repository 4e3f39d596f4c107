//! Per-connection state machine: awaiting_auth → authenticated → closing.
//!
//! A timed handshake recv, then a `tokio::select!` loop racing inbound
//! frames against an outbound command channel so the connection task is
//! the only writer on its own socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use ipc_protocol::{
    parse_and_validate, topics, AuthOk, Envelope, ErrorPayload, HubError,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::authenticate;
use crate::registry::Registry;
use crate::router::{Router, RouteOutcome};
use crate::session::{Outbound, SessionHandle};

/// Authentication must complete within this long of the first inbound byte.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Drive one accepted connection through its whole lifecycle. Returns once
/// the transport is closed, by either side.
pub async fn handle(
    ws: WebSocketStream<TcpStream>,
    registry: Registry,
    router: Router,
    token: String,
) {
    let mut ws = ws;

    let (service_name, session, mut outbound_rx) =
        match authenticate_connection(&mut ws, &registry, &token).await {
            Some(triple) => triple,
            None => return,
        };

    info!(service = %service_name, "peer authenticated");

    loop {
        tokio::select! {
            inbound = ws.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        session.touch();
                        handle_authenticated_frame(&mut ws, &router, &service_name, &text).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(service = %service_name, error = %e, "websocket error");
                        break;
                    }
                }
            }
            out = outbound_rx.recv() => {
                match out {
                    Some(Outbound::Forward(text)) => {
                        if ws.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Outbound::Close { code, reason }) => {
                        let _ = send_close(&mut ws, code, reason).await;
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    registry.drop_if_current(&service_name, &session).await;
    info!(service = %service_name, "peer disconnected");
}

/// The hello timeout/validation/token check and the registry registration
/// step. Returns `None` if the connection was closed during the handshake
/// for any reason.
async fn authenticate_connection(
    ws: &mut WebSocketStream<TcpStream>,
    registry: &Registry,
    token: &str,
) -> Option<(String, SessionHandle, tokio::sync::mpsc::Receiver<Outbound>)> {
    let first = match tokio::time::timeout(AUTH_TIMEOUT, ws.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) | Ok(None) => return None,
        Ok(Some(Ok(_))) => {
            reject_handshake(ws, &HubError::AuthRequired, "unknown".to_owned()).await;
            return None;
        }
        Ok(Some(Err(_))) => return None,
        Err(_) => {
            let _ = send_close(ws, 1008, "auth_timeout".to_owned()).await;
            return None;
        }
    };

    let envelope = match parse_and_validate(&first) {
        Ok(env) => env,
        Err(e) => {
            reject_handshake(ws, &e, "unknown".to_owned()).await;
            return None;
        }
    };

    let service_name = match authenticate(&envelope, token) {
        Ok(name) => name,
        Err(e) => {
            reject_handshake(ws, &e, envelope.from.clone()).await;
            return None;
        }
    };

    let (handle, rx) = SessionHandle::new(service_name.clone());
    if registry.register(&service_name, handle.clone()).await.is_err() {
        let err = HubError::DuplicateService(service_name.clone());
        reject_handshake(ws, &err, service_name).await;
        return None;
    }

    let ok = AuthOk {
        service: service_name.clone(),
        session_token: Some(Uuid::new_v4().to_string()),
    };
    let reply = Envelope::hub_originated(
        service_name.clone(),
        topics::AUTH_OK,
        envelope.trace_id.clone(),
        Some(envelope.id.clone()),
        Envelope::payload_of(&ok),
    );
    if send_direct(ws, &reply).await.is_err() {
        registry.drop_if_current(&service_name, &handle).await;
        return None;
    }

    Some((service_name, handle, rx))
}

async fn handle_authenticated_frame(
    ws: &mut WebSocketStream<TcpStream>,
    router: &Router,
    service_name: &str,
    raw_text: &str,
) {
    match parse_and_validate(raw_text) {
        Ok(envelope) => match router.route(service_name, raw_text, &envelope).await {
            RouteOutcome::Delivered => {}
            RouteOutcome::Reply(text) => {
                let _ = ws.send(Message::Text(text.into())).await;
            }
        },
        Err(e) => {
            warn!(service = %service_name, error = %e, "rejecting invalid envelope");
            let reply = Envelope::hub_originated(
                service_name,
                topics::IPC_ERROR,
                Uuid::new_v4().to_string(),
                None,
                Envelope::payload_of(&ErrorPayload::from(&e)),
            );
            let _ = send_direct(ws, &reply).await;
        }
    }
}

/// Send an `ipc.error` envelope describing `err`, then close the transport
/// with `1008` and a reason derived from the error code.
async fn reject_handshake(ws: &mut WebSocketStream<TcpStream>, err: &HubError, from: String) {
    let reply = Envelope::hub_originated(
        from,
        topics::IPC_ERROR,
        Uuid::new_v4().to_string(),
        None,
        Envelope::payload_of(&ErrorPayload::from(err)),
    );
    let _ = send_direct(ws, &reply).await;
    let reason = err.code().to_lowercase();
    let _ = send_close(ws, 1008, reason).await;
}

async fn send_direct(
    ws: &mut WebSocketStream<TcpStream>,
    envelope: &Envelope,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let text = serde_json::to_string(envelope).expect("Envelope serialization is infallible");
    ws.send(Message::Text(text.into())).await
}

async fn send_close(
    ws: &mut WebSocketStream<TcpStream>,
    code: u16,
    reason: String,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    ws.send(Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: reason.into(),
    })))
    .await
}
