//! Scenario 6 / P5: liveness eviction after the heartbeat timeout.
//!
//! Uses `tokio::time::pause` + `advance` to fast-forward the liveness
//! sweep's 20 s timeout without a real 20 s sleep; the hub's idle tracking
//! is built on `tokio::time::Instant`, which advances with the paused
//! clock for exactly this reason.

use ipc_test_support::{MockClient, MockClientError, TestHub};
use serde_json::json;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test(start_paused = true)]
async fn an_idle_session_is_evicted_within_one_sweep_period_past_the_timeout() {
    let hub = TestHub::start().await;
    let mut a = MockClient::connect(&hub.ws_url()).await.unwrap();

    a.send_envelope(
        "A",
        "ipc-hub",
        "auth.hello",
        "t1",
        None,
        json!({"service": "A", "token": "dev-token"}),
    )
    .await
    .unwrap();
    let reply = tokio::time::timeout(TIMEOUT, a.recv_value()).await.unwrap().unwrap();
    assert_eq!(reply["topic"], "auth.ok");

    // Past the 20s heartbeat timeout, plus one more sweep period (5s) so
    // the background sweep task has had a tick to observe it.
    tokio::time::advance(Duration::from_secs(26)).await;

    let close = tokio::time::timeout(TIMEOUT, a.recv_value()).await.unwrap();
    assert!(matches!(close, Err(MockClientError::ClosedByServer)));

    hub.shutdown();
}

#[tokio::test(start_paused = true)]
async fn heartbeats_before_the_timeout_keep_the_session_alive() {
    let hub = TestHub::start().await;
    let mut a = MockClient::connect(&hub.ws_url()).await.unwrap();

    a.send_envelope(
        "A",
        "ipc-hub",
        "auth.hello",
        "t1",
        None,
        json!({"service": "A", "token": "dev-token"}),
    )
    .await
    .unwrap();
    tokio::time::timeout(TIMEOUT, a.recv_value()).await.unwrap().unwrap();

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(15)).await;
        a.send_envelope("A", "ipc-hub", "hb.ping", "hb", None, json!({}))
            .await
            .unwrap();
        let pong = tokio::time::timeout(TIMEOUT, a.recv_value()).await.unwrap().unwrap();
        assert_eq!(pong["topic"], "hb.pong");
    }

    hub.shutdown();
}
