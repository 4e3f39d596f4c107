use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hub::config::{CliOverrides, HubConfig};

#[tokio::main]
async fn main() {
    let overrides = CliOverrides::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&overrides.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = HubConfig::from_env()
        .and_then(|cfg| cfg.with_overrides(&overrides))
        .unwrap_or_else(|e| {
            eprintln!("FATAL: invalid configuration: {e}");
            std::process::exit(1);
        });

    info!(addr = %config.addr(), path = %config.path, "ipc-hub starting");

    let running = hub::spawn(config)
        .await
        .unwrap_or_else(|e| {
            eprintln!("FATAL: failed to bind listener: {e}");
            std::process::exit(1);
        });

    shutdown_signal().await;
    running.shutdown();
    info!("ipc-hub shut down");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful
/// shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
