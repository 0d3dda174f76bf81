use crate::helpers::{FakeDaemon, STEP_TIMEOUT, wait_until};

use stt_client::protocol::message::MessageType;
use stt_client::{ClientConfig, ClientError, ConnectionState, SttClient, VadUpdate};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;

// ============================================================================
// Public API tests for SttClient against a scripted fake daemon
// ============================================================================

// ----------------------------------------------------------------------------
// connect()
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies connecting to a missing socket fails cleanly.
///
/// **WHY THIS MATTERS**: The CLI reports "is the daemon running?" from this error; a
/// panic or a silent retry would hide the real problem.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A failed initial connect schedules background reconnects
/// - The state is left at `Connecting`
#[tokio::test]
async fn given_no_daemon_when_connect_then_connection_failure_and_disconnected() {
    // GIVEN: A socket path nobody listens on
    let dir = tempfile::TempDir::new().expect("tempdir");
    let client = SttClient::new(ClientConfig::with_socket_path(dir.path().join("missing.sock")));

    // WHEN
    let result = client.connect().await;

    // THEN
    assert!(matches!(result, Err(ClientError::ConnectionFailure { .. })));
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn given_not_connected_when_issue_then_not_connected_error() {
    let client = SttClient::new(ClientConfig::default());

    let result = client.pause().await;

    assert!(matches!(result, Err(ClientError::NotConnected { .. })));
}

#[tokio::test]
async fn given_connected_client_when_connect_again_then_no_second_connection() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let _conn = daemon.accept().await;

    client.connect().await.expect("second connect");

    assert!(daemon.try_accept(Duration::from_millis(100)).await.is_none());
    client.disconnect().await;
}

// ----------------------------------------------------------------------------
// Commands
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the basic command round trip with typed status decoding.
///
/// **WHY THIS MATTERS**: `get_status` is the first thing every CLI command does after
/// connecting. If correlation or decoding is broken, nothing works.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - The command envelope is wrong (action/params/type)
/// - The acknowledgment is not matched to its request id
/// - `result` is not unwrapped from the acknowledgment
#[tokio::test]
async fn given_daemon_when_get_status_then_returns_decoded_snapshot() {
    // GIVEN: A connected client
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    // WHEN: get_status is issued and the daemon answers it
    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.get_status().await }
    });
    let command = conn.recv_command("get_status").await;
    assert_eq!(command.data["params"], json!({}));
    conn.ack_success(
        &command.id,
        json!({ "listening": true, "model": "base.en", "language": "en", "clients": 1, "uptime": 90 }),
    )
    .await;

    // THEN
    let status = caller.await.expect("task").expect("get_status");
    assert!(status.listening);
    assert_eq!(status.model, "base.en");
    assert_eq!(status.uptime, 90);
    assert_eq!(client.pending_requests(), 0);
    client.disconnect().await;
}

/// **VALUE**: Verifies concurrent commands are answered by id even when replies come back
/// in reverse order.
///
/// **WHY THIS MATTERS**: Several tasks share one client. The daemon is free to reorder
/// replies, so matching must never depend on arrival order.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Replies are matched FIFO
/// - Concurrent writes interleave and corrupt frames
#[tokio::test]
async fn given_concurrent_commands_when_acks_arrive_reversed_then_each_caller_gets_its_reply() {
    // GIVEN
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    // WHEN: Five commands in flight at once
    let callers: Vec<_> = (0..5)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move { (n, client.issue("echo", Some(json!({ "n": n }))).await) })
        })
        .collect();

    let mut received = Vec::new();
    for _ in 0..5 {
        received.push(conn.recv_command("echo").await);
    }
    for command in received.iter().rev() {
        let n = command.data["params"]["n"].clone();
        conn.ack_success(&command.id, json!({ "n": n })).await;
    }

    // THEN: Every caller sees its own n
    for caller in callers {
        let (n, result) = caller.await.expect("task");
        assert_eq!(result.expect("echo")["n"], json!(n));
    }
    client.disconnect().await;
}

/// **VALUE**: Verifies one command timing out does not disturb others or the session.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - A timeout tears down the connection
/// - The late reply for the timed-out id is delivered to someone else
#[tokio::test]
async fn given_one_slow_command_when_it_times_out_then_other_commands_unaffected() {
    // GIVEN
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    // WHEN: The slow command is never answered in time
    let slow = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .issue_with_timeout("slow", None, Duration::from_millis(100))
                .await
        }
    });
    let slow_command = conn.recv_command("slow").await;
    let slow_result = slow.await.expect("task");
    assert!(slow_result.expect_err("should time out").is_timeout());

    // Late reply for the retired id, then a normal command
    conn.ack_success(&slow_command.id, json!("late")).await;
    let fast = tokio::spawn({
        let client = client.clone();
        async move { client.pause().await }
    });
    let fast_command = conn.recv_command("pause").await;
    conn.ack_success(&fast_command.id, json!("paused")).await;

    // THEN
    assert_eq!(fast.await.expect("task").expect("pause"), json!("paused"));
    assert!(client.is_connected());
    assert_eq!(client.pending_requests(), 0);
    client.disconnect().await;
}

/// **VALUE**: Verifies a negative acknowledgment becomes `CommandFailure` with the full
/// daemon payload.
#[tokio::test]
async fn given_failed_ack_when_set_model_then_command_failure_carries_payload() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.set_model("huge").await }
    });
    let command = conn.recv_command("set_model").await;
    assert_eq!(command.data["params"], json!({ "model": "huge" }));
    conn.ack(&command.id, json!({ "success": false, "error": "Unknown model: huge" }))
        .await;

    let error = caller.await.expect("task").expect_err("should fail");
    assert_eq!(
        error.failure_payload(),
        Some(&json!({ "success": false, "error": "Unknown model: huge" }))
    );
    client.disconnect().await;
}

/// **VALUE**: Verifies a daemon `Error` echoing a command id fails that command right away
/// and reaches the error callback.
///
/// **BUG THIS CATCHES**: The caller hanging for the full command timeout after the daemon
/// already rejected its request.
#[tokio::test]
async fn given_error_reply_with_command_id_when_issue_then_failure_and_error_callback() {
    // GIVEN
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    client.on_error(move |message| sink.lock().unwrap().push(message));
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    // WHEN
    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.set_language("xx").await }
    });
    let command = conn.recv_command("set_language").await;
    conn.send(&crate::helpers::message(
        MessageType::Error,
        &command.id,
        json!({ "message": "Unsupported language" }),
    ))
    .await;

    // THEN
    let error = caller.await.expect("task").expect_err("should fail");
    assert!(matches!(error, ClientError::CommandFailure { .. }));
    assert_eq!(
        error.failure_payload().and_then(|p| p.get("error")),
        Some(&json!("Unsupported language"))
    );
    wait_until("error callback", || !errors.lock().unwrap().is_empty()).await;
    assert_eq!(*errors.lock().unwrap(), vec!["Unsupported language".to_string()]);
    client.disconnect().await;
}

/// **VALUE**: Verifies a malformed frame is skipped and the session keeps working.
#[tokio::test]
async fn given_malformed_frame_when_received_then_following_reply_still_delivered() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.resume().await }
    });
    let command = conn.recv_command("resume").await;
    conn.send_raw(b"{this is not json").await;
    conn.ack_success(&command.id, json!({})).await;

    assert_eq!(caller.await.expect("task").expect("resume"), json!({}));
    assert!(client.is_connected());
    client.disconnect().await;
}

/// **VALUE**: Verifies VAD updates are sent as a saved `set_config` merge.
///
/// **WHY THIS MATTERS**: The daemon has no dedicated VAD command; the settings must land
/// under `stt.vad` or they are silently ignored.
#[tokio::test]
async fn given_vad_update_when_set_vad_config_then_sends_nested_set_config() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    let update = VadUpdate {
        energy_threshold: Some(0.05),
        speech_end_ms: Some(900),
        ..VadUpdate::default()
    };
    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.set_vad_config(&update).await }
    });
    let command = conn.recv_command("set_config").await;
    assert_eq!(
        command.data["params"],
        json!({
            "config": { "stt": { "vad": { "energy_threshold": 0.05, "speech_end_ms": 900 } } },
            "save": true
        })
    );
    conn.ack_success(&command.id, json!({})).await;

    caller.await.expect("task").expect("set_vad_config");
    client.disconnect().await;
}

#[tokio::test]
async fn given_empty_vad_update_when_set_vad_config_then_invalid_argument_without_sending() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let _conn = daemon.accept().await;

    let result = client.set_vad_config(&VadUpdate::default()).await;

    assert!(matches!(result, Err(ClientError::InvalidArgument { .. })));
    assert_eq!(client.pending_requests(), 0);
    client.disconnect().await;
}

// ----------------------------------------------------------------------------
// Streaming
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies registering a transcription callback subscribes and delivers events.
///
/// **WHY THIS MATTERS**: This is the whole point of the client: streamed text reaching
/// user code.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - No `Subscribe` is sent on connect when a callback exists
/// - Transcription events are not routed to the callback
#[tokio::test]
async fn given_transcription_callback_when_daemon_streams_then_callback_receives_results() {
    // GIVEN: A callback registered before connecting
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    client
        .on_transcription(move |result| {
            let _ = tx.send(result);
        })
        .await
        .expect("register callback");

    // WHEN: Connected; the daemon sees a subscribe and streams one utterance
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;
    assert_eq!(conn.recv().await.kind, MessageType::Subscribe);
    conn.event(
        MessageType::Transcription,
        json!({ "text": "hello world", "confidence": 0.87, "timestamp": 1_700_000_000_000_i64 }),
    )
    .await;

    // THEN
    let result = tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    assert_eq!(result.text, "hello world");
    assert!((result.confidence - 0.87).abs() < 1e-9);
    assert!(client.is_subscribed());
    client.disconnect().await;
}

#[tokio::test]
async fn given_connected_client_when_callback_registered_later_then_subscribes_immediately() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    client.on_transcription(|_| {}).await.expect("register callback");

    assert_eq!(conn.recv().await.kind, MessageType::Subscribe);
    assert!(client.is_subscribed());

    client.unsubscribe().await.expect("unsubscribe");
    assert_eq!(conn.recv().await.kind, MessageType::Unsubscribe);
    assert!(!client.is_subscribed());
    client.disconnect().await;
}

#[tokio::test]
async fn given_status_callback_when_status_event_then_callback_fires() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    let (tx, mut rx) = mpsc::unbounded_channel();
    client.on_status(move |status| {
        let _ = tx.send(status);
    });
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    conn.event(MessageType::Status, json!({ "listening": false, "model": "tiny" }))
        .await;

    let status = tokio::time::timeout(STEP_TIMEOUT, rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    assert!(!status.listening);
    assert_eq!(status.model, "tiny");
    client.disconnect().await;
}

// ----------------------------------------------------------------------------
// disconnect()
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies an explicit disconnect releases every waiting caller.
///
/// **WHY THIS MATTERS**: Shutdown (e.g. Ctrl+C in the CLI) must not hang on commands the
/// daemon will never answer.
///
/// **BUG THIS CATCHES**: Would catch if:
/// - Pending commands are left to run into their timeout
/// - The connection callback is not told about the disconnect
#[tokio::test]
async fn given_three_pending_commands_when_disconnect_then_all_fail_with_connection_lost() {
    // GIVEN: Three commands the daemon has received but not answered
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config().with_command_timeout(Duration::from_secs(30)));
    let disconnects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&disconnects);
    client.on_connection(move |connected| {
        if !connected {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    client.connect().await.expect("connect");
    let mut conn = daemon.accept().await;

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move { client.get_metrics().await })
        })
        .collect();
    for _ in 0..3 {
        conn.recv_command("get_metrics").await;
    }

    // WHEN
    client.disconnect().await;

    // THEN
    for caller in callers {
        let error = tokio::time::timeout(STEP_TIMEOUT, caller)
            .await
            .expect("caller should be released promptly")
            .expect("task")
            .expect_err("should fail");
        assert!(error.is_connection_lost(), "Expected ConnectionLost, got {error}");
    }
    assert_eq!(client.connection_state(), ConnectionState::Disconnected);
    assert_eq!(client.pending_requests(), 0);
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn given_disconnected_client_when_reconnecting_explicitly_then_commands_work_again() {
    let daemon = FakeDaemon::start();
    let client = SttClient::new(daemon.config());
    client.connect().await.expect("connect");
    let _first = daemon.accept().await;
    client.disconnect().await;

    client.connect().await.expect("reconnect");
    let mut second = daemon.accept().await;
    let caller = tokio::spawn({
        let client = client.clone();
        async move { client.get_config().await }
    });
    let command = second.recv_command("get_config").await;
    second.ack_success(&command.id, json!({ "stt": {} })).await;

    assert_eq!(caller.await.expect("task").expect("get_config"), json!({ "stt": {} }));
    client.disconnect().await;
}
