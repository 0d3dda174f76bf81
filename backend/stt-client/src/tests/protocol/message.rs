// Unit tests for the message envelope
// Type tags, command shape and lenient decoding of daemon payloads

use crate::error::ClientError;
use crate::protocol::message::{Message, MessageType};

use serde_json::{Value, json};

// ============================================
// TYPE TAGS
// ============================================

/// **VALUE**: Verifies every message type maps to its fixed integer tag.
///
/// **WHY THIS MATTERS**: The daemon switches on these integers. A reordered enum silently
/// turns commands into subscriptions.
#[test]
fn given_each_message_type_when_serialized_then_uses_fixed_tag() {
    let expected = [
        (MessageType::Command, 0),
        (MessageType::Subscribe, 1),
        (MessageType::Unsubscribe, 2),
        (MessageType::Transcription, 3),
        (MessageType::Status, 4),
        (MessageType::Error, 5),
        (MessageType::Acknowledgment, 6),
    ];

    for (kind, tag) in expected {
        assert_eq!(serde_json::to_value(kind).expect("serialize"), json!(tag));
        assert_eq!(MessageType::try_from(tag).expect("known tag"), kind);
    }
}

#[test]
fn given_unknown_tag_when_converting_then_fails() {
    assert!(MessageType::try_from(7).is_err());
    assert!(MessageType::try_from(-1).is_err());
}

// ============================================
// CONSTRUCTION
// ============================================

/// **VALUE**: Verifies the command envelope carries action and params under `data`.
///
/// **BUG THIS CATCHES**: Omitting `params` when none are given; the daemon expects an
/// object there.
#[test]
fn given_command_without_params_when_built_then_params_is_empty_object() {
    // WHEN
    let message = Message::command("pause", None);

    // THEN
    let wire: Value = serde_json::from_slice(&message.to_bytes().expect("to_bytes")).expect("json");
    assert_eq!(wire["type"], json!(0));
    assert_eq!(wire["data"]["action"], json!("pause"));
    assert_eq!(wire["data"]["params"], json!({}));
    assert_eq!(wire["id"], json!(message.id));
}

#[test]
fn given_command_with_params_when_built_then_params_are_kept() {
    let message = Message::command("set_language", Some(json!({ "language": "fr" })));

    assert_eq!(message.kind, MessageType::Command);
    assert_eq!(message.data["params"], json!({ "language": "fr" }));
}

/// **VALUE**: Verifies ids are unique per message.
///
/// **WHY THIS MATTERS**: Correlation keys on the id; a repeated id would hand one
/// command's reply to another caller.
#[test]
fn given_many_messages_when_created_then_ids_are_unique() {
    let ids: std::collections::HashSet<String> =
        (0..1000).map(|_| Message::subscribe().id).collect();

    assert_eq!(ids.len(), 1000);
}

// ============================================
// DECODING
// ============================================

#[test]
fn given_acknowledgment_json_when_from_slice_then_fields_decoded() {
    let payload = br#"{"type":6,"id":"abc","data":{"success":true,"result":{"x":1}}}"#;

    let message = Message::from_slice(payload).expect("decode");

    assert_eq!(message.kind, MessageType::Acknowledgment);
    assert_eq!(message.id, "abc");
    assert_eq!(message.data["result"], json!({ "x": 1 }));
}

/// **VALUE**: Verifies missing or null `id`/`data` decode to empty values.
///
/// **WHY THIS MATTERS**: Events from the daemon do not always carry both fields; rejecting
/// them would drop real transcriptions.
#[test]
fn given_event_without_id_and_null_data_when_from_slice_then_defaults_used() {
    let message = Message::from_slice(br#"{"type":3,"data":null}"#).expect("decode");

    assert_eq!(message.kind, MessageType::Transcription);
    assert!(message.id.is_empty());
    assert!(message.data.is_empty());
}

#[test]
fn given_empty_payload_when_from_slice_then_malformed() {
    let result = Message::from_slice(b"");

    assert!(matches!(result, Err(ClientError::MalformedFrame { .. })));
}

#[test]
fn given_invalid_json_when_from_slice_then_malformed() {
    assert!(matches!(
        Message::from_slice(b"{not json"),
        Err(ClientError::MalformedFrame { .. })
    ));
    assert!(matches!(
        Message::from_slice(br#"{"type":42,"id":"x","data":{}}"#),
        Err(ClientError::MalformedFrame { .. })
    ));
}
