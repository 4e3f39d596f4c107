//! Transport adapter: loopback-only WebSocket accept loop.
//!
//! Binds a `TcpListener`, `tokio::spawn`s one task per accepted connection,
//! and completes the WS handshake with raw `tokio-tungstenite` rather than
//! through an HTTP router — the hub needs to close mismatched paths at the
//! WebSocket protocol level (code `1008`, reason `invalid_path`), not
//! return an HTTP 404 before the upgrade completes.

use std::sync::{Arc, Mutex};

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};

use crate::connection;
use crate::registry::Registry;
use crate::router::Router;

/// Accept connections on `listener` until `shutdown` fires. Each connection
/// that completes the WS handshake on the configured `path` is handed to
/// [`connection::handle`]; any other path is closed immediately with
/// `1008`/`invalid_path`.
pub async fn accept_loop(
    listener: TcpListener,
    path: String,
    token: String,
    registry: Registry,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let path = path.clone();
                        let token = token.clone();
                        let registry = registry.clone();
                        tokio::spawn(async move {
                            if let Err(e) = accept_one(stream, &path, token, registry).await {
                                warn!(%peer, error = %e, "connection setup failed");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "accept() failed");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("accept loop stopping");
                    return;
                }
            }
        }
    }
}

async fn accept_one(
    stream: TcpStream,
    expected_path: &str,
    token: String,
    registry: Registry,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let observed_path: Arc<Mutex<String>> = Arc::new(Mutex::new(String::new()));
    let capture = observed_path.clone();

    let callback = move |req: &Request, response: Response| {
        *capture.lock().expect("observed_path mutex poisoned") = req.uri().path().to_owned();
        Ok(response)
    };

    let ws = tokio_tungstenite::accept_hdr_async(stream, callback).await?;
    let path = observed_path.lock().expect("observed_path mutex poisoned").clone();

    if path != expected_path {
        close_invalid_path(ws).await;
        return Ok(());
    }

    let router = Router::new(registry.clone());
    connection::handle(ws, registry, router, token).await;
    Ok(())
}

async fn close_invalid_path(mut ws: WebSocketStream<TcpStream>) {
    use futures_util::SinkExt;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::frame::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::Message;

    let _ = ws
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::from(1008),
            reason: "invalid_path".into(),
        })))
        .await;
}
