//! P1: at most one live session per service name, even under concurrent
//! `auth.hello` attempts racing for the same name.

use ipc_test_support::{MockClient, TestHub};
use serde_json::json;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn concurrent_hellos_for_the_same_name_leave_exactly_one_session_authenticated() {
    let hub = TestHub::start().await;

    let mut clients = Vec::new();
    for _ in 0..5 {
        clients.push(MockClient::connect(&hub.ws_url()).await.unwrap());
    }

    let mut replies = Vec::new();
    for (i, client) in clients.iter_mut().enumerate() {
        client
            .send_envelope(
                "contender",
                "ipc-hub",
                "auth.hello",
                &format!("race-{i}"),
                None,
                json!({"service": "contender", "token": "dev-token"}),
            )
            .await
            .unwrap();
    }
    for client in clients.iter_mut() {
        replies.push(client.recv_value_timeout(TIMEOUT).await.unwrap());
    }

    let ok_count = replies.iter().filter(|r| r["topic"] == "auth.ok").count();
    let rejected_count = replies
        .iter()
        .filter(|r| r["payload"]["code"] == "ERR_DUPLICATE_SERVICE")
        .count();

    assert_eq!(ok_count, 1, "exactly one contender must win the name");
    assert_eq!(rejected_count, 4);

    hub.shutdown();
}

#[tokio::test]
async fn a_name_freed_by_disconnect_can_be_reclaimed() {
    let hub = TestHub::start().await;

    let mut first = MockClient::connect(&hub.ws_url()).await.unwrap();
    first
        .send_envelope(
            "desktop-ui",
            "ipc-hub",
            "auth.hello",
            "t1",
            None,
            json!({"service": "desktop-ui", "token": "dev-token"}),
        )
        .await
        .unwrap();
    assert_eq!(
        first.recv_value_timeout(TIMEOUT).await.unwrap()["topic"],
        "auth.ok"
    );

    first.close().await.unwrap();
    drop(first);

    // Give the hub's accept/cleanup task a moment to observe the close and
    // drop the registry entry before the next contender arrives.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut second = MockClient::connect(&hub.ws_url()).await.unwrap();
    second
        .send_envelope(
            "desktop-ui",
            "ipc-hub",
            "auth.hello",
            "t2",
            None,
            json!({"service": "desktop-ui", "token": "dev-token"}),
        )
        .await
        .unwrap();
    assert_eq!(
        second.recv_value_timeout(TIMEOUT).await.unwrap()["topic"],
        "auth.ok"
    );

    hub.shutdown();
}
