//! Exercises `services/peer`'s `PeerConnection`/`run` against a real hub,
//! the other side of the scenarios already covered from the raw-socket
//! angle in `auth_handshake.rs` and `routing.rs`.

use ipc_test_support::TestHub;
use peer::{run, PeerConfig, PeerConnection, PeerError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn connect_performs_the_full_handshake_and_yields_a_usable_connection() {
    let hub = TestHub::start().await;
    let cfg = PeerConfig::new(hub.ws_url(), "planner", "dev-token");

    let mut conn = tokio::time::timeout(TIMEOUT, PeerConnection::connect(&cfg))
        .await
        .unwrap()
        .unwrap();

    conn.send_heartbeat().await.unwrap();
    let pong = tokio::time::timeout(TIMEOUT, conn.recv()).await.unwrap().unwrap();
    assert_eq!(pong.topic, "hb.pong");

    hub.shutdown();
}

#[tokio::test]
async fn connect_surfaces_a_bad_token_as_auth_rejected() {
    let hub = TestHub::start().await;
    let cfg = PeerConfig::new(hub.ws_url(), "planner", "wrong-token");

    let err = tokio::time::timeout(TIMEOUT, PeerConnection::connect(&cfg))
        .await
        .unwrap()
        .unwrap_err();

    match err {
        PeerError::AuthRejected(payload) => assert_eq!(payload.code, "ERR_AUTH_INVALID"),
        other => panic!("expected AuthRejected, got {other:?}"),
    }

    hub.shutdown();
}

#[tokio::test]
async fn two_peers_exchange_a_unicast_message_through_the_hub() {
    let hub = TestHub::start().await;
    let cfg_a = PeerConfig::new(hub.ws_url(), "planner", "dev-token");
    let cfg_b = PeerConfig::new(hub.ws_url(), "executor", "dev-token");

    let mut a = PeerConnection::connect(&cfg_a).await.unwrap();
    let mut b = PeerConnection::connect(&cfg_b).await.unwrap();

    a.send(
        "executor",
        "automation.run_step",
        "t1",
        None,
        serde_json::Map::from_iter([("step".to_owned(), json!("click"))]),
    )
    .await
    .unwrap();

    let received = tokio::time::timeout(TIMEOUT, b.recv()).await.unwrap().unwrap();
    assert_eq!(received.from, "planner");
    assert_eq!(received.topic, "automation.run_step");
    assert_eq!(received.payload["step"], json!("click"));

    hub.shutdown();
}

#[tokio::test]
async fn run_dispatches_inbound_envelopes_to_the_handler_and_answers_heartbeats() {
    let hub = TestHub::start().await;

    let mut cfg = PeerConfig::new(hub.ws_url(), "skin-service", "dev-token");
    cfg.heartbeat_period = Duration::from_millis(100);

    let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let received_in_handler = Arc::clone(&received);
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let runner = tokio::spawn(run(
        cfg,
        move |env: ipc_protocol::Envelope| {
            received_in_handler.lock().unwrap().push(env.topic);
        },
        shutdown_rx,
    ));

    // Give the peer a moment to connect and authenticate, then push it a
    // message directly from a second raw client via the hub's broadcast.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let mut sender = ipc_test_support::MockClient::connect(&hub.ws_url()).await.unwrap();
    sender
        .send_envelope(
            "controller",
            "ipc-hub",
            "auth.hello",
            "tc",
            None,
            json!({"service": "controller", "token": "dev-token"}),
        )
        .await
        .unwrap();
    sender.recv_value_timeout(TIMEOUT).await.unwrap();
    sender
        .send_envelope(
            "controller",
            "skin-service",
            "skin.set_theme",
            "ts1",
            None,
            json!({"theme": "dark"}),
        )
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*received.lock().unwrap(), vec!["skin.set_theme".to_owned()]);

    let _ = shutdown_tx.send(());
    tokio::time::timeout(TIMEOUT, runner).await.unwrap().unwrap();

    hub.shutdown();
}
