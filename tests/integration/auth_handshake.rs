//! Scenarios 1-2 and P1/P3: the authentication handshake.

use ipc_test_support::{MockClient, TestHub};
use serde_json::json;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn happy_path_auth_replies_with_auth_ok_correlated_by_reply_to() {
    let hub = TestHub::start().await;
    let mut client = MockClient::connect(&hub.ws_url()).await.unwrap();

    client
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

    let reply = client.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(reply["topic"], "auth.ok");
    assert_eq!(reply["from"], "ipc-hub");
    assert_eq!(reply["to"], "desktop-ui");
    assert_eq!(reply["trace_id"], "t1");
    // reply_to must echo the auth.hello id we just sent; we didn't pin an
    // id, but it must be present and match nothing-null.
    assert!(reply["reply_to"].is_string());

    hub.shutdown();
}

#[tokio::test]
async fn bad_token_is_rejected_and_connection_closes() {
    let hub = TestHub::start().await;
    let mut client = MockClient::connect(&hub.ws_url()).await.unwrap();

    client
        .send_envelope(
            "desktop-ui",
            "ipc-hub",
            "auth.hello",
            "t2",
            None,
            json!({"service": "desktop-ui", "token": "wrong"}),
        )
        .await
        .unwrap();

    let reply = client.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(reply["topic"], "ipc.error");
    assert_eq!(reply["payload"]["code"], "ERR_AUTH_INVALID");

    let after = client.recv_value_timeout(TIMEOUT).await;
    assert!(matches!(
        after,
        Err(ipc_test_support::MockClientError::ClosedByServer)
    ));

    hub.shutdown();
}

#[tokio::test]
async fn first_message_must_be_auth_hello() {
    let hub = TestHub::start().await;
    let mut client = MockClient::connect(&hub.ws_url()).await.unwrap();

    client
        .send_envelope(
            "desktop-ui",
            "ipc-hub",
            "chat.user_message",
            "t3",
            None,
            json!({"text": "hi"}),
        )
        .await
        .unwrap();

    let reply = client.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(reply["topic"], "ipc.error");
    assert_eq!(reply["payload"]["code"], "ERR_AUTH_REQUIRED");

    hub.shutdown();
}

#[tokio::test]
async fn a_second_hello_for_a_live_name_is_rejected_and_the_first_session_survives() {
    let hub = TestHub::start().await;

    let mut first = MockClient::connect(&hub.ws_url()).await.unwrap();
    first
        .send_envelope(
            "desktop-ui",
            "ipc-hub",
            "auth.hello",
            "t4",
            None,
            json!({"service": "desktop-ui", "token": "dev-token"}),
        )
        .await
        .unwrap();
    let ok = first.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(ok["topic"], "auth.ok");

    let mut second = MockClient::connect(&hub.ws_url()).await.unwrap();
    second
        .send_envelope(
            "desktop-ui",
            "ipc-hub",
            "auth.hello",
            "t5",
            None,
            json!({"service": "desktop-ui", "token": "dev-token"}),
        )
        .await
        .unwrap();
    let rejection = second.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(rejection["topic"], "ipc.error");
    assert_eq!(rejection["payload"]["code"], "ERR_DUPLICATE_SERVICE");

    // First session is untouched: a heartbeat still gets answered.
    first
        .send_envelope("desktop-ui", "ipc-hub", "hb.ping", "t6", None, json!({}))
        .await
        .unwrap();
    let pong = first.recv_value_timeout(TIMEOUT).await.unwrap();
    assert_eq!(pong["topic"], "hb.pong");

    hub.shutdown();
}

#[tokio::test]
async fn connecting_on_the_wrong_path_closes_with_invalid_path() {
    let hub = TestHub::start().await;
    let bad_url = hub.ws_url().replace("/ws", "/not-ws");
    let mut client = MockClient::connect(&bad_url).await.unwrap();

    let result = client.recv_value_timeout(TIMEOUT).await;
    assert!(matches!(
        result,
        Err(ipc_test_support::MockClientError::ClosedByServer)
    ));

    hub.shutdown();
}
