//! Broadcast fan-out: a message addressed to `broadcast` reaches every
//! other authenticated peer, never the sender.

use ipc_test_support::{MockClient, TestHub};
use serde_json::json;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

async fn authenticate(client: &mut MockClient, service: &str) {
    client
        .send_envelope(
            service,
            "ipc-hub",
            "auth.hello",
            "t",
            None,
            json!({"service": service, "token": "dev-token"}),
        )
        .await
        .unwrap();
    let reply = client.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(reply["topic"], "auth.ok");
}

#[tokio::test]
async fn broadcast_reaches_every_other_peer_but_not_the_sender() {
    let hub = TestHub::start().await;
    let mut a = MockClient::connect(&hub.ws_url()).await.unwrap();
    let mut b = MockClient::connect(&hub.ws_url()).await.unwrap();
    let mut c = MockClient::connect(&hub.ws_url()).await.unwrap();
    authenticate(&mut a, "A").await;
    authenticate(&mut b, "B").await;
    authenticate(&mut c, "C").await;

    a.send_envelope(
        "A",
        "broadcast",
        "chat.user_message",
        "tb1",
        None,
        json!({"text": "hello everyone"}),
    )
    .await
    .unwrap();

    let at_b = b.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(at_b["topic"], "chat.user_message");
    assert_eq!(at_b["payload"]["text"], "hello everyone");

    let at_c = c.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(at_c["payload"]["text"], "hello everyone");

    let at_a = a.recv_value_timeout(Duration::from_millis(200)).await;
    assert!(at_a.is_err(), "the sender must not receive its own broadcast");

    hub.shutdown();
}

#[tokio::test]
async fn broadcast_with_no_other_peers_is_a_silent_no_op() {
    let hub = TestHub::start().await;
    let mut a = MockClient::connect(&hub.ws_url()).await.unwrap();
    authenticate(&mut a, "A").await;

    a.send_envelope(
        "A",
        "broadcast",
        "chat.user_message",
        "tb2",
        None,
        json!({"text": "anyone there?"}),
    )
    .await
    .unwrap();

    let nothing = a.recv_value_timeout(Duration::from_millis(200)).await;
    assert!(nothing.is_err());

    hub.shutdown();
}
