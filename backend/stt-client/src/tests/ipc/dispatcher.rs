// Unit tests for inbound message routing

use crate::ipc::{CallbackRegistry, SharedState, handle_frame, route};
use crate::protocol::events::{StatusSnapshot, TranscriptionResult};
use crate::protocol::message::{Message, MessageType};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value, json};

fn message(kind: MessageType, id: &str, data: Value) -> Message {
    Message {
        kind,
        id: id.to_string(),
        data: match data {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

#[test]
fn given_transcription_event_when_routed_then_callback_receives_text() {
    // GIVEN
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let texts = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&texts);
    callbacks.set_transcription(Arc::new(move |r: TranscriptionResult| sink.lock().unwrap().push(r.text)));

    // WHEN
    route(
        message(MessageType::Transcription, "", json!({ "text": "hello", "confidence": 0.9 })),
        &state,
        &callbacks,
    );

    // THEN
    assert_eq!(*texts.lock().unwrap(), vec!["hello".to_string()]);
}

#[test]
fn given_status_event_when_routed_then_status_callback_fires() {
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let listening = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&listening);
    callbacks.set_status(Arc::new(move |s: StatusSnapshot| *sink.lock().unwrap() = Some(s.listening)));

    route(
        message(MessageType::Status, "", json!({ "listening": true })),
        &state,
        &callbacks,
    );

    assert_eq!(*listening.lock().unwrap(), Some(true));
}

/// **VALUE**: Verifies an acknowledgment settles the matching pending command.
#[tokio::test]
async fn given_pending_command_when_ack_routed_then_waiter_resolved() {
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let waiter = state
        .lock()
        .pending
        .register("cmd-1", "pause", Duration::from_secs(1))
        .expect("register");

    route(
        message(MessageType::Acknowledgment, "cmd-1", json!({ "success": true })),
        &state,
        &callbacks,
    );

    let reply = waiter
        .wait(Duration::from_secs(1), "pause", |_| false)
        .await
        .expect("reply");
    assert_eq!(reply["success"], json!(true));
    assert_eq!(state.lock().pending.len(), 0);
}

/// **VALUE**: Verifies a daemon `Error` echoing a pending id fails that command and still
/// reaches the error callback.
///
/// **BUG THIS CATCHES**: The caller waiting out its full timeout even though the daemon
/// already said why the command failed.
#[tokio::test]
async fn given_pending_command_when_error_with_same_id_routed_then_failure_and_callback() {
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    callbacks.set_error(Arc::new(move |m: String| sink.lock().unwrap().push(m)));
    let waiter = state
        .lock()
        .pending
        .register("cmd-2", "set_model", Duration::from_secs(1))
        .expect("register");

    route(
        message(MessageType::Error, "cmd-2", json!({ "message": "model not found" })),
        &state,
        &callbacks,
    );

    let reply = waiter
        .wait(Duration::from_secs(1), "set_model", |_| false)
        .await
        .expect("reply");
    assert_eq!(reply["success"], json!(false));
    assert_eq!(reply["error"], json!("model not found"));
    assert_eq!(*errors.lock().unwrap(), vec!["model not found".to_string()]);
}

#[test]
fn given_error_without_message_when_routed_then_unknown_error_reported() {
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let errors = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    callbacks.set_error(Arc::new(move |m: String| sink.lock().unwrap().push(m)));

    route(message(MessageType::Error, "", json!({})), &state, &callbacks);

    assert_eq!(*errors.lock().unwrap(), vec!["Unknown error".to_string()]);
}

#[test]
fn given_ack_for_unknown_id_when_routed_then_discarded_without_side_effects() {
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let _waiter = state
        .lock()
        .pending
        .register("known", "pause", Duration::from_secs(1))
        .expect("register");

    route(
        message(MessageType::Acknowledgment, "stranger", json!({ "success": true })),
        &state,
        &callbacks,
    );

    assert_eq!(state.lock().pending.len(), 1);
}

/// **VALUE**: Verifies undecodable payloads are skipped rather than fatal.
///
/// **WHY THIS MATTERS**: Framing is still intact after a bad JSON payload, so the session
/// can keep going; only the single frame is lost.
#[test]
fn given_malformed_payload_when_handled_then_nothing_routed() {
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let errors = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&errors);
    callbacks.set_error(Arc::new(move |m: String| sink.lock().unwrap().push(m)));

    handle_frame(b"{oops", &state, &callbacks);
    handle_frame(b"", &state, &callbacks);

    assert!(errors.lock().unwrap().is_empty());
}

/// **VALUE**: Verifies the outbound-only kinds are ignored when the daemon echoes them.
///
/// **BUG THIS CATCHES**: A `Command` echoing a pending id being treated as its reply, or
/// a stray `Subscribe` reaching an event callback.
#[test]
fn given_client_only_messages_from_daemon_when_routed_then_ignored() {
    // GIVEN: One pending command and every callback registered
    let state = SharedState::default();
    let callbacks = CallbackRegistry::default();
    let fired = Arc::new(Mutex::new(0usize));
    let (t, s, e) = (fired.clone(), fired.clone(), fired.clone());
    callbacks.set_transcription(Arc::new(move |_: TranscriptionResult| *t.lock().unwrap() += 1));
    callbacks.set_status(Arc::new(move |_: StatusSnapshot| *s.lock().unwrap() += 1));
    callbacks.set_error(Arc::new(move |_: String| *e.lock().unwrap() += 1));
    let _waiter = state
        .lock()
        .pending
        .register("cmd", "pause", Duration::from_secs(1))
        .expect("register");

    // WHEN: The daemon sends each client-only kind carrying the pending id
    for kind in [MessageType::Command, MessageType::Subscribe, MessageType::Unsubscribe] {
        route(message(kind, "cmd", json!({})), &state, &callbacks);
    }

    // THEN: The command is still pending and nothing fired
    assert_eq!(state.lock().pending.len(), 1);
    assert_eq!(*fired.lock().unwrap(), 0);
}
