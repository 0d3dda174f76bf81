// Unit tests for acknowledgment interpretation

use crate::error::ClientError;
use crate::ipc::interpret_reply;

use serde_json::{Map, Value, json};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn given_successful_ack_with_result_when_interpreted_then_result_returned() {
    let reply = object(json!({ "success": true, "result": { "listening": true } }));

    let result = interpret_reply("get_status", reply).expect("success");

    assert_eq!(result, json!({ "listening": true }));
}

#[test]
fn given_successful_ack_without_result_when_interpreted_then_empty_object() {
    let result = interpret_reply("pause", object(json!({ "success": true }))).expect("success");

    assert_eq!(result, json!({}));
}

/// **VALUE**: Verifies a negative acknowledgment surfaces the daemon's full payload.
///
/// **WHY THIS MATTERS**: The daemon explains failures in free-form fields; callers need
/// them to tell the user why `set_model` was refused.
///
/// **BUG THIS CATCHES**: Treating `success: false` as success, or dropping the diagnostics.
#[test]
fn given_failed_ack_when_interpreted_then_command_failure_with_payload() {
    let reply = object(json!({ "success": false, "error": "Unknown model" }));

    let error = interpret_reply("set_model", reply).expect_err("should fail");

    assert!(matches!(error, ClientError::CommandFailure { ref action, .. } if action == "set_model"));
    assert_eq!(
        error.failure_payload(),
        Some(&json!({ "success": false, "error": "Unknown model" }))
    );
}

#[test]
fn given_ack_missing_success_when_interpreted_then_treated_as_failure() {
    let error = interpret_reply("pause", object(json!({ "result": 1 }))).expect_err("should fail");

    assert!(matches!(error, ClientError::CommandFailure { .. }));
}
