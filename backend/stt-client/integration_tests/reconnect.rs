use crate::helpers::{FakeDaemon, wait_until};

use stt_client::protocol::message::MessageType;
use stt_client::{ConnectionState, SttClient};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

// ============================================================================
// Connection loss and automatic reconnection
// ============================================================================

/// **VALUE**: Verifies the client reconnects after the daemon drops it and restores the
/// transcription subscription before anything else.
///
/// **WHY THIS MATTERS**: The daemon restarts (model reloads, crashes). A streaming
/// consumer must resume receiving text without user intervention.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - No reconnect is attempted after EOF
/// - The subscription is not restored on the new session
/// - The connection callback misses either transition
#[tokio::test]
async fn given_subscribed_client_when_daemon_drops_connection_then_reconnects_and_resubscribes() {
    // GIVEN: A subscribed client tracking connection transitions
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    let transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    client.on_connection(move |connected| sink.lock().unwrap().push(connected));
    client.on_transcription(|_| {}).await.expect("register callback");
    client.connect().await.expect("connect");

    let mut first = daemon.accept().await;
    assert_eq!(first.recv().await.kind, MessageType::Subscribe);

    // WHEN: The daemon side of the connection goes away
    drop(first);

    // THEN: A new connection arrives and its first frame is Subscribe
    let mut second = daemon.accept().await;
    assert_eq!(second.recv().await.kind, MessageType::Subscribe);
    wait_until("client connected again", || client.is_connected()).await;
    assert!(client.is_subscribed());
    assert_eq!(*transitions.lock().unwrap(), vec![true, false, true]);

    // Commands work on the new session
    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.pause().await }
    });
    let command = second.recv_command("pause").await;
    second.ack_success(&command.id, json!({})).await;
    caller.await.expect("task").expect("pause");

    client.disconnect().await;
}

/// **VALUE**: Verifies commands in flight when the daemon dies fail fast.
///
/// **BUG THIS CATCHES**: Callers waiting out the full command timeout for a reply that can
/// never arrive on a dead session.
#[tokio::test]
async fn given_pending_command_when_daemon_drops_connection_then_command_fails_with_connection_lost() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config().with_command_timeout(Duration::from_secs(30)));
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.get_status().await }
    });
    conn.recv_command("get_status").await;
    drop(conn);

    let error = tokio::time::timeout(Duration::from_secs(5), caller)
        .await
        .expect("caller should be released promptly")
        .expect("task")
        .expect_err("should fail");
    assert!(error.is_connection_lost());
    client.disconnect().await;
}

#[tokio::test]
async fn given_auto_reconnect_disabled_when_daemon_drops_connection_then_stays_disconnected() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config().with_auto_reconnect(false));
    client.connect().await.expect("connect");
    let conn = daemon.accept().await;

    drop(conn);

    wait_until("client noticed the loss", || {
        client.connection_state() == ConnectionState::Disconnected
    })
    .await;
    assert!(daemon.try_accept(Duration::from_millis(200)).await.is_none());
}

/// **VALUE**: Verifies reconnect keeps retrying while the daemon is down and succeeds once
/// it is back.
#[tokio::test]
async fn given_daemon_down_for_a_while_when_it_returns_then_client_reconnects() {
    // GIVEN: Connected, then the daemon stops listening entirely
    let mut daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let conn = daemon.accept().await;
    daemon.stop();
    drop(conn);

    wait_until("client reconnecting", || {
        client.connection_state() != ConnectionState::Connected
    })
    .await;

    // WHEN: Several retry intervals pass, then the daemon comes back
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!client.is_connected());
    daemon.restart();

    // THEN
    let _conn = daemon.accept().await;
    wait_until("client connected again", || client.is_connected()).await;
    client.disconnect().await;
}

/// **VALUE**: Verifies `disconnect()` stops a reconnect run in progress.
///
/// **BUG THIS CATCHES**: A background reconnect resurrecting a connection the user
/// explicitly closed.
#[tokio::test]
async fn given_client_reconnecting_when_disconnect_then_no_further_attempts() {
    // GIVEN: The daemon is gone and the client is retrying
    let mut daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let conn = daemon.accept().await;
    daemon.stop();
    drop(conn);
    wait_until("client reconnecting", || {
        client.connection_state() == ConnectionState::Reconnecting
    })
    .await;

    // WHEN
    client.disconnect().await;
    daemon.restart();

    // THEN: Nobody connects and the state stays put
    assert!(daemon.try_accept(Duration::from_millis(300)).await.is_none());
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}
