//! Hub configuration: environment defaults overridable by CLI flags.
//!
//! A typed config struct with documented defaults, resolved from four
//! environment variables and then layered with optional CLI overrides.

use std::net::IpAddr;

use clap::Parser;

/// Shared secret clients present in `auth.hello.payload.token`.
pub const DEFAULT_TOKEN: &str = "dev-token";
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 17171;
pub const DEFAULT_PATH: &str = "/ws";

/// Resolved hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub path: String,
    pub token: String,
}

/// Error returned when the resolved configuration is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("bind address {0} is not loopback-only; non-loopback binds are a configuration error")]
    NonLoopbackBind(IpAddr),
    #[error("invalid bind address {0}: {1}")]
    InvalidBind(String, std::net::AddrParseError),
    #[error("invalid port {0}: {1}")]
    InvalidPort(String, std::num::ParseIntError),
}

impl HubConfig {
    /// Read `TASKSPRITE_IPC_TOKEN`, `TASKSPRITE_IPC_BIND`,
    /// `TASKSPRITE_IPC_PORT`, and `TASKSPRITE_IPC_PATH` from the
    /// environment, falling back to the defaults above.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = std::env::var("TASKSPRITE_IPC_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_owned());
        let port = std::env::var("TASKSPRITE_IPC_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let path = std::env::var("TASKSPRITE_IPC_PATH").unwrap_or_else(|_| DEFAULT_PATH.to_owned());
        let token =
            std::env::var("TASKSPRITE_IPC_TOKEN").unwrap_or_else(|_| DEFAULT_TOKEN.to_owned());

        Self::build(&bind, &port, path, token)
    }

    /// Apply CLI overrides on top of an already-resolved config.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        if let Some(bind) = &overrides.bind {
            self.bind = bind
                .parse()
                .map_err(|e| ConfigError::InvalidBind(bind.clone(), e))?;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(path) = &overrides.path {
            self.path = path.clone();
        }
        if let Some(token) = &overrides.token {
            self.token = token.clone();
        }
        check_loopback(self.bind)?;
        Ok(self)
    }

    fn build(bind: &str, port: &str, path: String, token: String) -> Result<Self, ConfigError> {
        let bind: IpAddr = bind
            .parse()
            .map_err(|e| ConfigError::InvalidBind(bind.to_owned(), e))?;
        let port: u16 = port
            .parse()
            .map_err(|e| ConfigError::InvalidPort(port.to_owned(), e))?;
        check_loopback(bind)?;
        Ok(Self {
            bind,
            port,
            path,
            token,
        })
    }

    #[must_use]
    pub fn addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::new(self.bind, self.port)
    }
}

fn check_loopback(bind: IpAddr) -> Result<(), ConfigError> {
    if bind.is_loopback() {
        Ok(())
    } else {
        Err(ConfigError::NonLoopbackBind(bind))
    }
}

/// CLI surface for the `ipc-hub` binary.
#[derive(Debug, Parser)]
#[command(name = "ipc-hub", about = "Localhost inter-process message hub")]
pub struct CliOverrides {
    /// Override the loopback bind address.
    #[arg(long)]
    pub bind: Option<String>,
    /// Override the listen port.
    #[arg(long)]
    pub port: Option<u16>,
    /// Override the WebSocket upgrade path.
    #[arg(long)]
    pub path: Option<String>,
    /// Override the shared auth token.
    #[arg(long)]
    pub token: Option<String>,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `hub=debug`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
