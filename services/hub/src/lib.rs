//! The inter-process message hub: an authenticated, routed WebSocket
//! relay between cooperating localhost services.
//!
//! Wires together the envelope validator (`ipc-protocol`), the session
//! registry, the per-connection state machine, the router, and the
//! liveness monitor.

pub mod auth;
pub mod config;
pub mod connection;
pub mod liveness;
pub mod registry;
pub mod router;
pub mod session;
pub mod transport;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use config::HubConfig;
use registry::Registry;

/// A hub instance that has bound its listener and started its background
/// tasks (the accept loop and the liveness monitor). Dropping this without
/// calling [`RunningHub::shutdown`] leaves the tasks running detached,
/// matching `tokio::spawn`'s usual fire-and-forget semantics — callers that
/// need a clean shutdown (tests, `main.rs`) should call it explicitly.
pub struct RunningHub {
    pub addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
}

impl RunningHub {
    /// Signal the accept loop and liveness monitor to stop. Does not wait
    /// for in-flight connections to close — no in-flight message is
    /// guaranteed to be delivered.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Bind the configured address and start the hub's background tasks.
/// Returns as soon as the listener is bound; connections are accepted on a
/// spawned background task.
pub async fn spawn(config: HubConfig) -> std::io::Result<RunningHub> {
    let listener = TcpListener::bind(config.addr()).await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let registry = Registry::new();

    info!(%addr, path = %config.path, "hub listening");

    tokio::spawn(liveness::run(registry.clone(), shutdown_rx.clone()));
    tokio::spawn(transport::accept_loop(
        listener,
        config.path.clone(),
        config.token.clone(),
        registry,
        shutdown_rx,
    ));

    Ok(RunningHub { addr, shutdown_tx })
}
