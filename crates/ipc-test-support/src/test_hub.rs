//! Spin up a real hub instance bound to a random loopback port, for
//! integration tests.
//!
//! Grounded on `examples/iwismer-rusty-timer/crates/rt-test-utils/src/mock_ws_server.rs`'s
//! `MockWsServer::start` (bind port 0, expose the resolved address) —
//! except this wraps the actual `hub` crate rather than a hand-rolled fake,
//! since the thing under test here is the hub itself.

use hub::config::HubConfig;
use hub::RunningHub;

pub struct TestHub {
    running: RunningHub,
    pub token: String,
    pub path: String,
}

impl TestHub {
    /// Start a hub on `127.0.0.1:0` with the given token (defaulting to
    /// `"dev-token"` via [`TestHub::start`]).
    pub async fn start_with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        let config = HubConfig {
            bind: "127.0.0.1".parse().unwrap(),
            port: 0,
            path: "/ws".to_owned(),
            token: token.clone(),
        };
        let running = hub::spawn(config).await.expect("failed to bind test hub");
        Self {
            running,
            token,
            path: "/ws".to_owned(),
        }
    }

    pub async fn start() -> Self {
        Self::start_with_token("dev-token").await
    }

    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.running.addr, self.path)
    }

    pub fn shutdown(&self) {
        self.running.shutdown();
    }
}
