//! Liveness monitor: periodic sweep that evicts sessions idle past the
//! heartbeat timeout.
//!
//! Runs as its own `tokio::spawn`'d background task. The sweep never writes
//! to a transport directly — it only asks the owning connection task to
//! close via [`crate::session::SessionHandle::request_close`], preserving
//! "a session owns exclusive write access to its transport" and the
//! cancellation-vs-close race guard in [`crate::registry::Registry::drop_if_current`].

use std::time::Duration;

use tracing::{info, warn};

use crate::registry::Registry;

pub const SWEEP_PERIOD: Duration = Duration::from_secs(5);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(20);

/// Run the sweep loop until `shutdown` resolves. Intended to be
/// `tokio::spawn`'d once per hub instance.
pub async fn run(registry: Registry, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(SWEEP_PERIOD);
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => sweep_once(&registry).await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("liveness monitor stopping");
                    return;
                }
            }
        }
    }
}

async fn sweep_once(registry: &Registry) {
    for session in registry.snapshot().await {
        if session.idle_for() > HEARTBEAT_TIMEOUT {
            warn!(
                service = %session.service_name(),
                timeout_secs = HEARTBEAT_TIMEOUT.as_secs(),
                "evicting session: heartbeat timeout"
            );
            registry
                .drop_if_current(session.service_name(), &session)
                .await;
            session.request_close(1001, "heartbeat_timeout");
        }
    }
}
